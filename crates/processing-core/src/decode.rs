//! Image decoding with EXIF orientation applied.
//!
//! The format is sniffed from the file contents, not the extension, so a
//! PNG saved as `.jpg` still decodes. Any orientation tag in the file is
//! applied before the pixels are handed on, which means portrait shots
//! from phones come out upright.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};

/// Why a frame could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl DecodeError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Image { path, .. } => path,
        }
    }
}

/// Decode an image file into upright 8-bit RGB.
///
/// Alpha is dropped and 16-bit samples are narrowed.
pub fn decode(path: &Path) -> Result<RgbImage, DecodeError> {
    let image_err = |source| DecodeError::Image {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let mut decoder = reader.into_decoder().map_err(image_err)?;
    let orientation = decoder.orientation().map_err(image_err)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(image_err)?;
    image.apply_orientation(orientation);

    tracing::trace!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        ?orientation,
        "Decoded frame"
    );

    Ok(image.into_rgb8())
}
