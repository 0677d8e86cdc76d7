//! A decoded frame ready for normalization.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::RgbImage;

use crate::decode::{decode, DecodeError};

/// Pixels of one source image plus where and when it came from.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Upright 8-bit RGB pixels.
    pub image: RgbImage,

    /// Capture time, taken from the file's modification time.
    pub timestamp: SystemTime,

    /// Source file.
    pub source: PathBuf,
}

impl Frame {
    /// Decode `path` and tag it with `timestamp`.
    pub fn load(path: &Path, timestamp: SystemTime) -> Result<Self, DecodeError> {
        Ok(Self {
            image: decode(path)?,
            timestamp,
            source: path.to_path_buf(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
