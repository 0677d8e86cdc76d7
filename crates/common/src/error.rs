//! Error types shared across folderlapse crates.

use std::path::PathBuf;

/// Top-level error type for folderlapse operations.
#[derive(Debug, thiserror::Error)]
pub enum LapseError {
    #[error("Source root does not exist: {path}")]
    SourceRootMissing { path: PathBuf },

    #[error("No subfolders or images found under {path}")]
    NoJobs { path: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LapseError.
pub type LapseResult<T> = Result<T, LapseError>;

impl LapseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// The two fatal discovery conditions get distinct codes; everything
    /// else that reaches the process boundary is a generic failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::SourceRootMissing { .. } => 2,
            Self::NoJobs { .. } => 3,
            _ => 1,
        }
    }
}
