//! Folderlapse Processing Core
//!
//! Turns image files into uniform video frames:
//! - **Decode:** Load any supported image with EXIF orientation applied
//! - **Normalize:** Fit every frame into one fixed, even-sized canvas
//! - **Overlay:** Burn timestamp and source-label text into the frame
//!
//! Apart from reading the image file in [`decode`], this crate is pure
//! pixel computation. Nothing here knows about folders, jobs, or encoders.

pub mod decode;
pub mod frame;
pub mod normalize;
pub mod overlay;

pub use decode::{decode, DecodeError};
pub use frame::Frame;
pub use normalize::{canvas_size, letterbox, resize_area, CanvasSize, FrameNormalizer};
pub use overlay::{Anchor, FontError, LabelStyle, OverlayRenderer};
