// src/device/types.rs
//! Core types for the stimulation device abstraction

use crate::utils::time::current_timestamp_nanos;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Waveform shape applied per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulationMode {
    /// One pulse per stimulation period
    Single,
    /// Two pulses per stimulation period
    Doublet,
    /// Three pulses per stimulation period
    Triplet,
}

/// Parameters of one addressable stimulation channel
///
/// A `ChannelConfig` is freely mutable between operations; the supervisor
/// snapshots it (via [`StimulationRequest::new`]) the moment a request is
/// built, so later mutation is only visible to the next issued operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// 1-based channel index on the device
    pub index: u8,
    /// Optional human-readable label ("Biceps", "Calf", ...)
    pub name: Option<String>,
    /// Waveform mode
    pub mode: StimulationMode,
    /// Stimulation frequency in hertz
    pub frequency_hz: f32,
    /// Pulse amplitude in milliamperes
    pub amplitude_ma: f32,
    /// Pulse width in microseconds
    pub pulse_width_us: u16,
    /// Optional ramp length in pulses
    pub ramp_pulses: Option<u8>,
}

impl ChannelConfig {
    /// Create a channel with safe defaults (zero amplitude, single pulses).
    pub fn new(index: u8) -> Self {
        Self {
            index,
            name: None,
            mode: StimulationMode::Single,
            frequency_hz: 50.0,
            amplitude_ma: 0.0,
            pulse_width_us: 0,
            ramp_pulses: None,
        }
    }

    /// Attach a human-readable name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// Requested stimulation duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulationDuration {
    /// Stimulate for the given wall-clock duration
    For(Duration),
    /// Stimulate until `end()` or a superseding `update()` is issued
    UntilStopped,
}

impl StimulationDuration {
    /// Timed duration from fractional seconds. Negative or non-finite input
    /// collapses to zero, which request validation then rejects.
    pub fn seconds(secs: f64) -> Self {
        Self::For(Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO))
    }
}

/// An immutable snapshot of everything one stimulation operation needs
///
/// Channel parameters are deep-copied at construction time. Mutating the
/// original [`ChannelConfig`] values afterwards has no effect on a request
/// that has already been built, which is what keeps in-flight operations
/// free of torn reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulationRequest {
    channels: Vec<ChannelConfig>,
    duration: StimulationDuration,
    safety: bool,
}

impl StimulationRequest {
    /// Snapshot the given channels into a new request.
    pub fn new(channels: &[ChannelConfig], duration: StimulationDuration, safety: bool) -> Self {
        Self {
            channels: channels.to_vec(),
            duration,
            safety,
        }
    }

    /// Channel snapshots carried by this request.
    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    /// Requested duration.
    pub fn duration(&self) -> StimulationDuration {
        self.duration
    }

    /// Whether device-side limit checks are requested.
    pub fn safety(&self) -> bool {
        self.safety
    }
}

/// Identifies one stimulation command issued to the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandToken {
    id: u64,
    issued_at_nanos: u64,
}

impl CommandToken {
    /// Create a token for a freshly issued command.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            issued_at_nanos: current_timestamp_nanos(),
        }
    }

    /// Device-assigned command id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wall-clock issue timestamp in nanoseconds since the Unix epoch.
    pub fn issued_at_nanos(&self) -> u64 {
        self.issued_at_nanos
    }
}

/// Observed state of an issued stimulation command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandStatus {
    /// The device is still executing the command
    Running,
    /// The device finished the command on its own
    Completed,
    /// The device aborted the command
    Failed(String),
}

/// Errors reported by a device session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    /// Transport-level failure (port missing, link dropped, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The device refused the command
    #[error("device rejected command: {0}")]
    Rejected(String),

    /// A channel parameter violated the device's own safety limits
    #[error("channel {channel} violates device limits: {reason}")]
    ChannelLimit {
        /// Offending channel index
        channel: u8,
        /// Limit that was violated
        reason: String,
    },

    /// A command was issued before the session was configured
    #[error("device session not configured")]
    NotConfigured,

    /// The session was already closed
    #[error("device session is closed")]
    SessionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_defaults_are_safe() {
        let ch = ChannelConfig::new(3).with_name("Biceps");
        assert_eq!(ch.index, 3);
        assert_eq!(ch.amplitude_ma, 0.0);
        assert_eq!(ch.mode, StimulationMode::Single);
        assert_eq!(ch.name.as_deref(), Some("Biceps"));
    }

    #[test]
    fn test_request_snapshots_channels() {
        let mut ch = ChannelConfig::new(2);
        ch.amplitude_ma = 25.0;

        let request = StimulationRequest::new(
            std::slice::from_ref(&ch),
            StimulationDuration::seconds(5.0),
            true,
        );

        // Caller-side mutation after the snapshot must not leak into the request.
        ch.amplitude_ma = 15.0;
        ch.mode = StimulationMode::Triplet;

        assert_eq!(request.channels()[0].amplitude_ma, 25.0);
        assert_eq!(request.channels()[0].mode, StimulationMode::Single);
    }

    #[test]
    fn test_duration_seconds_clamps_invalid_input() {
        assert_eq!(
            StimulationDuration::seconds(-1.0),
            StimulationDuration::For(Duration::ZERO)
        );
        assert_eq!(
            StimulationDuration::seconds(2.5),
            StimulationDuration::For(Duration::from_millis(2500))
        );
    }

    #[test]
    fn test_command_token_carries_issue_time() {
        let token = CommandToken::new(7);
        assert_eq!(token.id(), 7);
        assert!(token.issued_at_nanos() > 0);
    }
}
