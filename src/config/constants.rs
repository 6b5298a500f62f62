// src/config/constants.rs
//! System-wide constants
//!
//! Every magic number in the crate lives here so the device envelope and
//! supervision defaults are defined in exactly one place.

/// Stimulation device parameter envelope
pub mod device {
    /// Maximum number of channels a single configuration may carry
    pub const MAX_CHANNEL_COUNT: usize = 8;

    /// Lowest addressable channel index (channels are 1-based)
    pub const CHANNEL_INDEX_MIN: u8 = 1;

    /// Highest addressable channel index
    pub const CHANNEL_INDEX_MAX: u8 = 8;

    /// Maximum pulse amplitude in milliamperes
    pub const AMPLITUDE_MAX_MA: f32 = 130.0;

    /// Maximum pulse width in microseconds
    pub const PULSE_WIDTH_MAX_US: u16 = 4095;

    /// Minimum stimulation frequency in hertz
    pub const FREQUENCY_MIN_HZ: f32 = 1.0;

    /// Maximum stimulation frequency in hertz
    pub const FREQUENCY_MAX_HZ: f32 = 200.0;

    /// Maximum ramp length in pulses
    pub const RAMP_MAX_PULSES: u8 = 16;

    /// Longest accepted timed stimulation; open-ended runs use the
    /// explicit until-stopped sentinel instead
    pub const STIMULATION_MAX_SECS: u64 = 86_400;
}

/// Supervision timing defaults
pub mod supervisor {
    /// How long a cancelled operation may take to acknowledge termination
    pub const DEFAULT_CANCELLATION_GRACE_MS: u64 = 2_000;

    /// Upper bound accepted for a configured grace period
    pub const MAX_CANCELLATION_GRACE_MS: u64 = 60_000;

    /// How often a running operation polls the device for command status
    pub const DEFAULT_STATUS_POLL_INTERVAL_MS: u64 = 50;
}

/// Configuration file discovery
pub mod paths {
    /// Candidate configuration files, checked in order
    pub const CONFIG_FILE_CANDIDATES: &[&str] = &[
        "stim-core.toml",
        "config/stim-core.toml",
        "/etc/stim-core/config.toml",
    ];
}
