//! Extension repair for files that lost their suffix.
//!
//! Some cameras upload frames without an extension. If such a file starts
//! with the JPEG start-of-image marker it is renamed to `.jpg` so extension
//! filtering can pick it up. Repair never overwrites an existing file and
//! never fails the caller: the worst case is the original path unchanged.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// JPEG start-of-image marker followed by the first marker prefix.
pub const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// What repair did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairAction {
    /// The file already has an extension; nothing was inspected.
    Untouched,
    /// No extension, but the header is not JPEG (or unreadable).
    NotJpeg,
    /// Renamed in place to add `.jpg`.
    Renamed,
    /// Rename was refused; copied to `.jpg` and the original removed.
    Copied,
    /// A `.jpg` sibling already exists, original left alone.
    TargetExists,
    /// Both rename and copy failed, original left alone.
    Failed,
}

/// Result of [`classify_and_repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    /// Path to use from now on.
    pub path: PathBuf,
    pub action: RepairAction,
}

impl Repair {
    fn keep(path: &Path, action: RepairAction) -> Self {
        Self {
            path: path.to_path_buf(),
            action,
        }
    }

    /// Whether the file now lives at a new path.
    pub fn moved(&self) -> bool {
        matches!(self.action, RepairAction::Renamed | RepairAction::Copied)
    }
}

/// Whether the path has a non-empty extension.
pub fn has_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| !ext.is_empty())
}

/// Check the first three bytes for the JPEG marker.
///
/// Any read error counts as "not JPEG".
pub fn is_jpeg_by_header(path: &Path) -> bool {
    let mut header = [0u8; 3];
    match File::open(path).and_then(|mut f| f.read_exact(&mut header)) {
        Ok(()) => header == JPEG_MAGIC,
        Err(_) => false,
    }
}

/// Add a `.jpg` suffix to extension-less JPEG files.
///
/// Idempotent: the returned path always has an extension or is the input,
/// so repairing it again is a no-op.
pub fn classify_and_repair(path: &Path) -> Repair {
    if has_extension(path) {
        return Repair::keep(path, RepairAction::Untouched);
    }
    if !is_jpeg_by_header(path) {
        return Repair::keep(path, RepairAction::NotJpeg);
    }
    repair_with(path, |from, to| std::fs::rename(from, to), copy_preserving_mtime)
}

/// Move `path` to its `.jpg` sibling using `rename`, falling back to `copy`
/// plus removal of the original.
fn repair_with<R, C>(path: &Path, rename: R, copy: C) -> Repair
where
    R: FnOnce(&Path, &Path) -> std::io::Result<()>,
    C: FnOnce(&Path, &Path) -> std::io::Result<()>,
{
    let target = path.with_extension("jpg");
    if target.exists() {
        tracing::debug!(
            path = %path.display(),
            target = %target.display(),
            "Repair target exists, leaving file as-is"
        );
        return Repair::keep(path, RepairAction::TargetExists);
    }

    match rename(path, &target) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Added .jpg extension");
            Repair {
                path: target,
                action: RepairAction::Renamed,
            }
        }
        Err(rename_err) => match copy(path, &target) {
            Ok(()) => {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Copied to .jpg but could not remove the original"
                    );
                }
                Repair {
                    path: target,
                    action: RepairAction::Copied,
                }
            }
            Err(copy_err) => {
                // Only our own partial copy can be here; the target was absent.
                let _ = std::fs::remove_file(&target);
                tracing::debug!(
                    path = %path.display(),
                    rename_error = %rename_err,
                    copy_error = %copy_err,
                    "Could not add .jpg extension"
                );
                Repair::keep(path, RepairAction::Failed)
            }
        },
    }
}

/// Copy a file and carry its modification time over, since frame order
/// depends on it.
fn copy_preserving_mtime(from: &Path, to: &Path) -> std::io::Result<()> {
    let modified = std::fs::metadata(from)?.modified()?;
    std::fs::copy(from, to)?;
    File::options().write(true).open(to)?.set_modified(modified)
}
