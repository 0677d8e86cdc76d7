//! Frame sinks: where normalized frames go.

use std::path::PathBuf;

use image::RgbImage;

/// Geometry and encoding parameters for one output video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// FourCC code (or encoder name) requested by the user.
    pub codec: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("encoder unavailable for codec '{codec}': {reason}")]
    EncoderUnavailable { codec: String, reason: String },

    #[error("failed to start encoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to write frame {frame}: {source}")]
    Write {
        frame: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("encoder failed to finalize: {0}")]
    Finalize(String),

    #[error("frame is {actual_width}x{actual_height}, sink expects {width}x{height}")]
    GeometryMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

impl SinkError {
    /// Whether the sink never opened.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::EncoderUnavailable { .. } | Self::Spawn(_))
    }
}

/// An open video being written frame by frame.
///
/// Frames must all match the geometry the sink was opened with. Dropping a
/// sink without calling [`finish`](FrameSink::finish) abandons the output.
pub trait FrameSink {
    /// Append one frame.
    fn push(&mut self, frame: &RgbImage) -> Result<(), SinkError>;

    /// Flush and close the video, returning the number of frames written.
    fn finish(self: Box<Self>) -> Result<u64, SinkError>;

    /// Frames accepted so far.
    fn frames_written(&self) -> u64;
}

/// Opens sinks for a codec (ffmpeg, in-memory, ...).
pub trait SinkFactory {
    /// Open a sink, or fail if the codec or geometry is unsupported.
    fn open(&self, spec: &SinkSpec) -> Result<Box<dyn FrameSink>, SinkError>;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Reject frames whose size differs from the sink's.
pub fn check_geometry(spec: &SinkSpec, frame: &RgbImage) -> Result<(), SinkError> {
    let (actual_width, actual_height) = frame.dimensions();
    if (actual_width, actual_height) != (spec.width, spec.height) {
        return Err(SinkError::GeometryMismatch {
            width: spec.width,
            height: spec.height,
            actual_width,
            actual_height,
        });
    }
    Ok(())
}
