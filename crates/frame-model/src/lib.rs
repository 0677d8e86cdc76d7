//! Folderlapse Frame Model
//!
//! Defines the core data contracts for turning photo folders into videos:
//! - **Candidates:** Files discovered in a folder with cached stat metadata
//! - **Filters:** Time-of-day windows and weekday sets, with their parsers
//! - **Jobs:** One source folder bound to one output file, and its outcome
//!
//! Everything here is plain data plus pure functions; the only I/O is the
//! single `stat` performed when a candidate is captured.

pub mod candidate;
pub mod filter;
pub mod job;

pub use candidate::*;
pub use filter::*;
pub use job::*;
