// src/utils/time.rs
//! Wall-clock timestamp helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, saturating to zero on clock skew.
pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp_millis() -> u64 {
    current_timestamp_nanos() / 1_000_000
}
