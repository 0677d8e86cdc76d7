//! Folderlapse Frame Selection
//!
//! Everything that touches the source tree before decoding starts:
//! - **Discovery:** Turn the source root into an ordered list of jobs
//! - **Classification:** Recover extension-less JPEGs by sniffing headers
//! - **Selection:** List, repair, sort, and time-filter a folder's frames

pub mod classify;
pub mod discover;
pub mod select;

pub use classify::{classify_and_repair, is_jpeg_by_header, Repair, RepairAction};
pub use discover::discover_jobs;
pub use select::{select_frames, Selection};
