//! Candidate files: a path plus the stat metadata captured at discovery.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use folderlapse_common::clock::{local_datetime, system_time_to_ns, TimestampNs};

/// A file that may become a frame.
///
/// Metadata is captured once and never refreshed, so ordering and filtering
/// decisions stay consistent even if the file is touched mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Path on disk (after any extension repair).
    pub path: PathBuf,

    /// Modification time as reported by the filesystem.
    pub modified: SystemTime,

    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_ns: TimestampNs,

    /// File size in bytes.
    pub size: u64,
}

impl CandidateFile {
    /// Stat a path and capture its metadata.
    pub fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        let modified = metadata.modified()?;
        Ok(Self::with_metadata(path, modified, metadata.len()))
    }

    /// Build a candidate from already-known metadata.
    pub fn with_metadata(path: PathBuf, modified: SystemTime, size: u64) -> Self {
        Self {
            path,
            modified,
            mtime_ns: system_time_to_ns(modified),
            size,
        }
    }

    /// Final path component, used as the ordering tie-break.
    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_else(|| self.path.as_os_str())
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    /// Local wall-clock modification time.
    pub fn local_time(&self) -> DateTime<Local> {
        local_datetime(self.modified)
    }

    /// Frame ordering: modification time, then file name.
    pub fn frame_order(&self, other: &Self) -> Ordering {
        self.mtime_ns
            .cmp(&other.mtime_ns)
            .then_with(|| self.file_name().cmp(other.file_name()))
    }
}

/// Lowercased extension of a path without the dot, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Sort candidates into frame order in place.
pub fn sort_frames(candidates: &mut [CandidateFile]) {
    candidates.sort_by(CandidateFile::frame_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn candidate(name: &str, secs: u64, nanos: u32) -> CandidateFile {
        CandidateFile::with_metadata(
            PathBuf::from("/frames").join(name),
            UNIX_EPOCH + Duration::new(secs, nanos),
            0,
        )
    }

    #[test]
    fn test_nanoseconds_break_same_second_ties() {
        let mut frames = vec![
            candidate("a.jpg", 100, 900),
            candidate("b.jpg", 100, 100),
        ];
        sort_frames(&mut frames);
        assert_eq!(frames[0].file_name(), "b.jpg");
        assert_eq!(frames[1].file_name(), "a.jpg");
    }

    #[test]
    fn test_file_name_breaks_exact_ties() {
        let mut frames = vec![
            candidate("img_10.jpg", 100, 5),
            candidate("img_01.jpg", 100, 5),
            candidate("img_02.jpg", 100, 5),
        ];
        sort_frames(&mut frames);
        let names: Vec<_> = frames.iter().map(|f| f.file_name().to_owned()).collect();
        assert_eq!(names, vec!["img_01.jpg", "img_02.jpg", "img_10.jpg"]);
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(candidate("X.JPG", 0, 0).extension().as_deref(), Some("jpg"));
        assert_eq!(candidate("noext", 0, 0).extension(), None);
    }

    #[test]
    fn test_from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();

        let c = CandidateFile::from_path(&path).unwrap();
        assert_eq!(c.size, 4);
        assert_eq!(c.mtime_ns, system_time_to_ns(c.modified));
    }

    proptest! {
        #[test]
        fn prop_sorted_order_is_monotonic(
            entries in proptest::collection::vec((0u64..50, 0u32..3, "[a-e]{1,3}"), 0..40)
        ) {
            let mut frames: Vec<_> = entries
                .iter()
                .map(|(secs, nanos, name)| candidate(&format!("{name}.jpg"), *secs, *nanos))
                .collect();
            sort_frames(&mut frames);

            for pair in frames.windows(2) {
                let a = (pair[0].mtime_ns, pair[0].file_name().to_owned());
                let b = (pair[1].mtime_ns, pair[1].file_name().to_owned());
                prop_assert!(a <= b);
            }
        }
    }
}
