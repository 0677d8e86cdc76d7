//! File clock utilities.
//!
//! Frames carry no reliable embedded capture time, so the filesystem
//! modification time is the only clock. This module provides utilities for:
//! - Converting an mtime to signed nanoseconds since the Unix epoch
//! - Converting an mtime to local wall-clock time
//! - Formatting the overlay timestamp

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};

/// Signed nanoseconds since the Unix epoch.
///
/// Signed because some cameras ship with clocks set before 1970.
pub type TimestampNs = i128;

/// Format used for burned-in frame timestamps.
pub const OVERLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a file time to nanoseconds since the Unix epoch.
pub fn system_time_to_ns(time: SystemTime) -> TimestampNs {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as TimestampNs,
        Err(before) => -(before.duration().as_nanos() as TimestampNs),
    }
}

/// Local wall-clock time for a file time.
pub fn local_datetime(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

/// Overlay text for a frame timestamp (`YYYY-MM-DD HH:MM:SS`, local time).
pub fn format_overlay_timestamp(time: SystemTime) -> String {
    local_datetime(time)
        .format(OVERLAY_TIMESTAMP_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_ns_keeps_sub_second_precision() {
        let time = UNIX_EPOCH + Duration::new(1_690_351_200, 123_456_789);
        let ns = system_time_to_ns(time);
        assert_eq!(ns, 1_690_351_200_123_456_789);
    }

    #[test]
    fn test_pre_epoch_times_are_negative() {
        let time = UNIX_EPOCH - Duration::from_secs(5);
        assert_eq!(system_time_to_ns(time), -5_000_000_000);
    }

    #[test]
    fn test_overlay_timestamp_format() {
        let local = Local
            .with_ymd_and_hms(2023, 7, 26, 14, 5, 9)
            .single()
            .unwrap();
        let text = format_overlay_timestamp(SystemTime::from(local));
        assert_eq!(text, "2023-07-26 14:05:09");
    }
}
