//! Folderlapse Render Engine
//!
//! Drives each folder through selection, decoding, normalization, and
//! overlays, and streams the resulting frames into a video sink.
//!
//! # Pipeline Architecture
//!
//! ```text
//! folder/ ──── classify + select ──┐
//!                                  ├── decode (EXIF-upright)
//!                                  │        │
//!                                  │        ├── letterbox onto canvas
//!                                  │        │        │
//!                                  │        │        ├── timestamp / label
//!                                  │        │        ▼
//!                                  │        │    FrameSink (ffmpeg rawvideo)
//!                                  ▼        ▼        │
//!                              JobReport ◄───────────┘
//! ```

pub mod ffmpeg;
pub mod pipeline;
pub mod sink;

pub use ffmpeg::{encoder_for_fourcc, FfmpegSinkFactory};
pub use pipeline::{run, JobProgress, JobRunner, ProgressCallback};
pub use sink::{FrameSink, SinkError, SinkFactory, SinkSpec};
