//! Text overlays burned into frames.
//!
//! Labels are white text on an opaque black box, anchored from the
//! bottom-left corner of the canvas: `anchor.x` is the distance from the
//! left edge to the first glyph and `anchor.y` lifts the text baseline off
//! the bottom edge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

/// DejaVu Sans, shipped so overlays work without system fonts.
static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Pixel height of the em square at font scale `1.0`.
pub const BASE_FONT_PX: f32 = 30.0;

/// Box padding left, right, and above the text.
pub const BOX_PADDING: i32 = 6;

/// Box extent below the baseline.
pub const BOX_DESCENT: i32 = 3;

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("cannot read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid font data in {0}")]
    Invalid(String),
}

/// Bottom-left offset of a label's baseline origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Placement and weight of one overlay line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub anchor: Anchor,
    pub font_scale: f32,
    /// Horizontal stroke weight in pixels.
    pub thickness: u32,
}

impl LabelStyle {
    /// Capture-time line.
    pub const TIMESTAMP: Self = Self {
        anchor: Anchor::new(20, 20),
        font_scale: 0.7,
        thickness: 2,
    };

    /// Free-text source label, stacked above the timestamp.
    pub const SOURCE_LABEL: Self = Self {
        anchor: Anchor::new(20, 50),
        font_scale: 0.6,
        thickness: 2,
    };
}

/// Draws overlay text with one loaded font.
#[derive(Clone)]
pub struct OverlayRenderer {
    font: FontArc,
    font_name: Arc<str>,
}

impl std::fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRenderer")
            .field("font", &self.font_name)
            .finish()
    }
}

impl OverlayRenderer {
    /// Renderer using the bundled DejaVu Sans.
    pub fn bundled() -> Result<Self, FontError> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|_| FontError::Invalid("bundled DejaVu Sans".to_string()))?;
        Ok(Self {
            font,
            font_name: Arc::from("DejaVu Sans (bundled)"),
        })
    }

    /// Renderer using a TrueType/OpenType font file.
    pub fn from_file(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|_| FontError::Invalid(path.display().to_string()))?;
        Ok(Self {
            font,
            font_name: Arc::from(path.display().to_string()),
        })
    }

    /// `from_file` when a path is given, the bundled font otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, FontError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    /// Draw `text` on `canvas` in place.
    ///
    /// Parts that fall outside the canvas are clipped. Empty text draws
    /// nothing.
    pub fn draw_label_mut(&self, canvas: &mut RgbImage, text: &str, style: LabelStyle) {
        if text.is_empty() {
            return;
        }

        let scale = PxScale::from(BASE_FONT_PX * style.font_scale.max(0.05));
        let thickness = style.thickness.max(1);
        let (text_w, text_h) = text_size(scale, &self.font, text);
        let text_w = text_w + thickness - 1;

        let x = style.anchor.x;
        let baseline = canvas.height() as i32 - style.anchor.y;

        let box_rect = Rect::at(x - BOX_PADDING, baseline - text_h as i32 - BOX_PADDING)
            .of_size(
                text_w + 2 * BOX_PADDING as u32,
                text_h + (BOX_PADDING + BOX_DESCENT) as u32,
            );
        draw_filled_rect_mut(canvas, box_rect, BOX_COLOR);

        let ascent = self.font.as_scaled(scale).ascent().round() as i32;
        let top = baseline - ascent;
        for dx in 0..thickness as i32 {
            draw_text_mut(canvas, TEXT_COLOR, x + dx, top, scale, &self.font, text);
        }
    }

    /// Draw `text` and hand the canvas back.
    pub fn draw_label(&self, mut canvas: RgbImage, text: &str, style: LabelStyle) -> RgbImage {
        self.draw_label_mut(&mut canvas, text, style);
        canvas
    }

    /// Burn the optional timestamp and source label into a frame.
    pub fn annotate(&self, canvas: &mut RgbImage, timestamp: Option<&str>, label: Option<&str>) {
        if let Some(timestamp) = timestamp {
            self.draw_label_mut(canvas, timestamp, LabelStyle::TIMESTAMP);
        }
        if let Some(label) = label {
            self.draw_label_mut(canvas, label, LabelStyle::SOURCE_LABEL);
        }
    }
}
