//! Folderlapse Common Utilities
//!
//! Shared infrastructure for all folderlapse crates:
//! - Error types and result aliases
//! - File-clock helpers (mtime to nanoseconds and local wall-clock time)
//! - Tracing/logging initialization
//! - User defaults loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
