//! Frame selection for a single folder.
//!
//! Pipeline per folder:
//! 1. List direct entries (no recursion), skipping directories
//! 2. Repair extension-less JPEGs
//! 3. Keep allowed extensions (case-insensitive)
//! 4. Sort by `(mtime_ns, file name)`
//! 5. Apply the time-of-day / weekday filter, preserving order

use std::path::Path;

use folderlapse_common::error::LapseResult;
use folderlapse_frame_model::candidate::{extension_of, sort_frames, CandidateFile};
use folderlapse_frame_model::filter::FrameFilter;

use crate::classify::{classify_and_repair, has_extension};

/// Frames chosen for one folder, plus counters for logging.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Frames in playback order.
    pub frames: Vec<CandidateFile>,

    /// Regular files seen in the folder.
    pub listed: usize,

    /// Files that gained a `.jpg` extension during this scan.
    pub repaired: usize,

    /// Files with an allowed extension dropped by the time/weekday filter.
    pub filtered_out: usize,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

/// Select the frames of `folder` in playback order.
///
/// Only listing the folder itself can fail; unreadable entries are skipped.
pub fn select_frames(
    folder: &Path,
    extensions: &[String],
    filter: &FrameFilter,
) -> LapseResult<Selection> {
    let mut selection = Selection::default();
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(folder)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(folder = %folder.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let mut path = entry.path();
        if path.is_dir() {
            continue;
        }
        selection.listed += 1;

        if !has_extension(&path) {
            let repair = classify_and_repair(&path);
            if repair.moved() {
                selection.repaired += 1;
            }
            path = repair.path;
        }

        let allowed = extension_of(&path)
            .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)));
        if !allowed {
            continue;
        }

        match CandidateFile::from_path(&path) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot stat file, skipping");
            }
        }
    }

    sort_frames(&mut candidates);

    if filter.is_noop() {
        selection.frames = candidates;
    } else {
        let before = candidates.len();
        selection.frames = candidates
            .into_iter()
            .filter(|c| filter.accepts(c.local_time().naive_local()))
            .collect();
        selection.filtered_out = before - selection.frames.len();
    }

    tracing::debug!(
        folder = %folder.display(),
        listed = selection.listed,
        repaired = selection.repaired,
        filtered_out = selection.filtered_out,
        selected = selection.frames.len(),
        "Frame selection complete"
    );

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folderlapse_frame_model::job::normalize_extensions;

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let exts = normalize_extensions(["jpg"]);
        assert!(select_frames(&dir.path().join("nope"), &exts, &FrameFilter::NONE).is_err());
    }

    #[test]
    fn test_empty_folder_selects_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exts = normalize_extensions(["jpg"]);
        let selection = select_frames(dir.path(), &exts, &FrameFilter::NONE).unwrap();
        assert!(selection.is_empty());
        assert_eq!(selection.listed, 0);
    }

    #[test]
    fn test_subdirectories_are_not_frames() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested.jpg")).unwrap();
        std::fs::write(dir.path().join("nested.jpg").join("inner.jpg"), b"x").unwrap();
        let exts = normalize_extensions(["jpg"]);

        let selection = select_frames(dir.path(), &exts, &FrameFilter::NONE).unwrap();
        assert!(selection.is_empty());
    }
}
