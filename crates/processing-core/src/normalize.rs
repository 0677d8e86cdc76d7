//! Frame normalization onto a fixed canvas.
//!
//! Video encoders need every frame to share one size, and most of them
//! need even dimensions. The canvas is derived from the first decoded frame
//! of a job and then locked; every later frame is scaled to fit inside it
//! with its aspect ratio preserved and the rest padded black.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Output frame size for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn matches(&self, image: &RgbImage) -> bool {
        image.dimensions() == (self.width, self.height)
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Canvas for a job whose first frame is `source_width` x `source_height`.
///
/// `target_width == 0` keeps the source size as-is. Otherwise the width is
/// `target_width`, the height follows the source aspect ratio, and both are
/// rounded up to the next even number.
pub fn canvas_size(source_width: u32, source_height: u32, target_width: u32) -> CanvasSize {
    if target_width == 0 || source_width == 0 {
        return CanvasSize::new(source_width.max(1), source_height.max(1));
    }

    let height = (f64::from(source_height) * f64::from(target_width) / f64::from(source_width))
        .round()
        .max(1.0) as u32;

    CanvasSize::new(round_up_even(target_width), round_up_even(height))
}

fn round_up_even(value: u32) -> u32 {
    value + (value & 1)
}

/// Scale `image` to fit inside `canvas` and center it on black.
///
/// When the aspect ratios differ, the leftover pixels split between both
/// sides and any odd pixel goes to the right or bottom edge. An image that
/// already has the canvas size is returned unchanged.
pub fn letterbox(image: RgbImage, canvas: CanvasSize) -> RgbImage {
    if canvas.matches(&image) {
        return image;
    }

    let (src_w, src_h) = image.dimensions();
    let scale = f64::min(
        f64::from(canvas.width) / f64::from(src_w.max(1)),
        f64::from(canvas.height) / f64::from(src_h.max(1)),
    );
    let fit_w = ((f64::from(src_w) * scale).round() as u32).clamp(1, canvas.width);
    let fit_h = ((f64::from(src_h) * scale).round() as u32).clamp(1, canvas.height);

    let fitted = resize_area(&image, fit_w, fit_h);
    if fit_w == canvas.width && fit_h == canvas.height {
        return fitted;
    }

    let left = (canvas.width - fit_w) / 2;
    let top = (canvas.height - fit_h) / 2;

    let mut out = RgbImage::new(canvas.width, canvas.height);
    imageops::replace(&mut out, &fitted, i64::from(left), i64::from(top));
    out
}

/// Resize with area averaging when shrinking.
///
/// Each destination pixel is the coverage-weighted mean of the source
/// pixels under it, which avoids the moiré a point or bilinear sampler
/// produces on large downscales. Enlarging falls back to bilinear.
pub fn resize_area(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    if (src_w, src_h) == (width, height) {
        return image.clone();
    }
    if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
        return RgbImage::new(width, height);
    }
    if width > src_w || height > src_h {
        return imageops::resize(image, width, height, FilterType::Triangle);
    }

    let x_taps = area_taps(src_w, width);
    let y_taps = area_taps(src_h, height);
    let src = image.as_raw();
    let src_stride = src_w as usize * 3;

    // Horizontal pass into a (width x src_h) float buffer.
    let row_len = width as usize * 3;
    let mut horizontal = vec![0f32; row_len * src_h as usize];
    for y in 0..src_h as usize {
        let src_row = &src[y * src_stride..(y + 1) * src_stride];
        let dst_row = &mut horizontal[y * row_len..(y + 1) * row_len];
        for (dx, taps) in x_taps.iter().enumerate() {
            let mut acc = [0f32; 3];
            for &(sx, weight) in taps {
                let px = &src_row[sx * 3..sx * 3 + 3];
                for c in 0..3 {
                    acc[c] += f32::from(px[c]) * weight;
                }
            }
            dst_row[dx * 3..dx * 3 + 3].copy_from_slice(&acc);
        }
    }

    let mut out = RgbImage::new(width, height);
    let dst = &mut *out;
    for (dy, taps) in y_taps.iter().enumerate() {
        let dst_row = &mut dst[dy * row_len..(dy + 1) * row_len];
        for (i, value) in dst_row.iter_mut().enumerate() {
            let mut acc = 0f32;
            for &(sy, weight) in taps {
                acc += horizontal[sy * row_len + i] * weight;
            }
            *value = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// For each destination index, the source indices it covers and their
/// normalized coverage weights.
fn area_taps(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = f64::from(src_len) / f64::from(dst_len);
    (0..dst_len)
        .map(|d| {
            let start = f64::from(d) * scale;
            let end = (start + scale).min(f64::from(src_len));
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len);

            (first..last)
                .filter_map(|s| {
                    let lo = start.max(f64::from(s));
                    let hi = end.min(f64::from(s) + 1.0);
                    let cover = hi - lo;
                    (cover > 1e-9).then(|| (s as usize, (cover / scale) as f32))
                })
                .collect()
        })
        .collect()
}

/// Normalizes every frame of one job onto the same canvas.
///
/// The canvas is fixed by the first frame passed to [`normalize`](Self::normalize).
#[derive(Debug, Clone)]
pub struct FrameNormalizer {
    target_width: u32,
    canvas: Option<CanvasSize>,
}

impl FrameNormalizer {
    pub fn new(target_width: u32) -> Self {
        Self {
            target_width,
            canvas: None,
        }
    }

    /// Locked canvas, once the first frame has been seen.
    pub fn canvas(&self) -> Option<CanvasSize> {
        self.canvas
    }

    /// Canvas for `image`: the locked one, or the one it would lock.
    pub fn canvas_for(&self, image: &RgbImage) -> CanvasSize {
        self.canvas
            .unwrap_or_else(|| canvas_size(image.width(), image.height(), self.target_width))
    }

    /// Fit `image` onto the job canvas, locking it on first use.
    pub fn normalize(&mut self, image: RgbImage) -> RgbImage {
        let canvas = self.canvas_for(&image);
        if self.canvas.is_none() {
            tracing::debug!(
                source = %CanvasSize::new(image.width(), image.height()),
                canvas = %canvas,
                "Locked output canvas"
            );
            self.canvas = Some(canvas);
        }
        letterbox(image, canvas)
    }
}
