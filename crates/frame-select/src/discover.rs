//! Job discovery.
//!
//! The source root either holds one subfolder per job (typically one per
//! date) or holds the images directly, in which case the root itself is the
//! only job.

use std::path::{Path, PathBuf};

use folderlapse_common::error::{LapseError, LapseResult};
use folderlapse_frame_model::candidate::extension_of;
use folderlapse_frame_model::job::{JobConfig, VideoJob};

use crate::classify::is_jpeg_by_header;

/// Discover jobs under the configured source root, in folder-name order.
///
/// Fails with [`LapseError::SourceRootMissing`] when the root is absent and
/// [`LapseError::NoJobs`] when it holds neither subfolders nor images.
pub fn discover_jobs(config: &JobConfig) -> LapseResult<Vec<VideoJob>> {
    let root = &config.source_root;
    if !root.is_dir() {
        return Err(LapseError::SourceRootMissing { path: root.clone() });
    }

    let output_root = std::fs::canonicalize(&config.output_root).ok();
    let mut folders: Vec<PathBuf> = Vec::new();
    let mut has_images = false;

    for entry in std::fs::read_dir(root)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if path.is_dir() {
            if is_output_root(&path, output_root.as_deref()) {
                tracing::debug!(path = %path.display(), "Skipping output directory");
                continue;
            }
            folders.push(path);
        } else if looks_like_frame(&path, config) {
            has_images = true;
        }
    }

    folders.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let jobs: Vec<VideoJob> = if !folders.is_empty() {
        folders
            .into_iter()
            .map(|folder| VideoJob::for_folder(folder, config))
            .collect()
    } else if has_images {
        vec![VideoJob::for_folder(root.clone(), config)]
    } else {
        return Err(LapseError::NoJobs { path: root.clone() });
    };

    tracing::info!(root = %root.display(), jobs = jobs.len(), "Discovered jobs");
    Ok(jobs)
}

/// Allowed extension, or no extension but a JPEG header (repairable).
fn looks_like_frame(path: &Path, config: &JobConfig) -> bool {
    match extension_of(path) {
        Some(ext) => config.allows_extension(&ext),
        None => is_jpeg_by_header(path),
    }
}

fn is_output_root(dir: &Path, output_root: Option<&Path>) -> bool {
    match (output_root, std::fs::canonicalize(dir)) {
        (Some(out), Ok(dir)) => dir == out,
        _ => false,
    }
}
