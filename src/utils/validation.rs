// src/utils/validation.rs
//! Validation utilities for stimulation parameters
//!
//! All range checks pull their limits from the constants module so the
//! device envelope is defined in exactly one place.

use crate::config::constants::device;
use crate::device::types::{ChannelConfig, StimulationDuration, StimulationRequest};
use std::time::Duration;
use thiserror::Error;

/// Validation result type
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types for channel and request parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value outside the permitted range
    #[error("field '{field}' value '{value}' is out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field
        field: String,
        /// Offending value, rendered as text
        value: String,
        /// Lower bound, rendered as text
        min: String,
        /// Upper bound, rendered as text
        max: String,
    },

    /// A request or configuration carried no channels at all
    #[error("channel set is empty")]
    EmptyChannelSet,

    /// The same channel index appeared more than once
    #[error("duplicate channel index {0}")]
    DuplicateChannel(u8),

    /// A request referenced a channel the device was never configured with
    #[error("channel {0} is not part of the initialized configuration")]
    UnknownChannel(u8),

    /// A timed stimulation was requested with a zero or non-positive duration
    #[error("stimulation duration must be positive")]
    NonPositiveDuration,

    /// Free-form constraint violation
    #[error("{0}")]
    Custom(String),
}

fn out_of_range<T: std::fmt::Display>(field: &str, value: T, min: T, max: T) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

/// Validate a single channel configuration against the device envelope.
pub fn validate_channel_config(channel: &ChannelConfig) -> ValidationResult<()> {
    if !(device::CHANNEL_INDEX_MIN..=device::CHANNEL_INDEX_MAX).contains(&channel.index) {
        return Err(out_of_range(
            "channel_index",
            channel.index,
            device::CHANNEL_INDEX_MIN,
            device::CHANNEL_INDEX_MAX,
        ));
    }

    if !channel.amplitude_ma.is_finite()
        || channel.amplitude_ma < 0.0
        || channel.amplitude_ma > device::AMPLITUDE_MAX_MA
    {
        return Err(out_of_range(
            "amplitude_ma",
            channel.amplitude_ma,
            0.0,
            device::AMPLITUDE_MAX_MA,
        ));
    }

    if channel.pulse_width_us > device::PULSE_WIDTH_MAX_US {
        return Err(out_of_range(
            "pulse_width_us",
            channel.pulse_width_us,
            0,
            device::PULSE_WIDTH_MAX_US,
        ));
    }

    if !channel.frequency_hz.is_finite()
        || channel.frequency_hz < device::FREQUENCY_MIN_HZ
        || channel.frequency_hz > device::FREQUENCY_MAX_HZ
    {
        return Err(out_of_range(
            "frequency_hz",
            channel.frequency_hz,
            device::FREQUENCY_MIN_HZ,
            device::FREQUENCY_MAX_HZ,
        ));
    }

    if let Some(ramp) = channel.ramp_pulses {
        if ramp > device::RAMP_MAX_PULSES {
            return Err(out_of_range("ramp_pulses", ramp, 0, device::RAMP_MAX_PULSES));
        }
    }

    Ok(())
}

/// Validate an ordered channel set: non-empty, within the device channel
/// budget, unique indices, and every member inside the parameter envelope.
pub fn validate_channel_set(channels: &[ChannelConfig]) -> ValidationResult<()> {
    if channels.is_empty() {
        return Err(ValidationError::EmptyChannelSet);
    }

    if channels.len() > device::MAX_CHANNEL_COUNT {
        return Err(out_of_range(
            "channel_count",
            channels.len(),
            1,
            device::MAX_CHANNEL_COUNT,
        ));
    }

    let mut seen = [false; (device::CHANNEL_INDEX_MAX as usize) + 1];
    for channel in channels {
        validate_channel_config(channel)?;
        let slot = channel.index as usize;
        if seen[slot] {
            return Err(ValidationError::DuplicateChannel(channel.index));
        }
        seen[slot] = true;
    }

    Ok(())
}

/// Validate a stimulation request before it is allowed near the device.
///
/// `configured` is the set of channel indices sent to the device at
/// initialization time; requests may only reference those.
pub fn validate_request(request: &StimulationRequest, configured: &[u8]) -> ValidationResult<()> {
    validate_channel_set(request.channels())?;

    for channel in request.channels() {
        if !configured.contains(&channel.index) {
            return Err(ValidationError::UnknownChannel(channel.index));
        }
    }

    match request.duration() {
        StimulationDuration::For(d) if d.is_zero() => Err(ValidationError::NonPositiveDuration),
        StimulationDuration::For(d) if d > Duration::from_secs(device::STIMULATION_MAX_SECS) => {
            Err(out_of_range(
                "duration_secs",
                d.as_secs(),
                1,
                device::STIMULATION_MAX_SECS,
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::StimulationMode;
    use proptest::prelude::*;

    fn channel(index: u8) -> ChannelConfig {
        let mut ch = ChannelConfig::new(index);
        ch.amplitude_ma = 25.0;
        ch.pulse_width_us = 100;
        ch.frequency_hz = 50.0;
        ch
    }

    #[test]
    fn test_valid_channel_passes() {
        assert!(validate_channel_config(&channel(1)).is_ok());
        assert!(validate_channel_config(&channel(8)).is_ok());
    }

    #[test]
    fn test_channel_index_bounds() {
        let mut ch = channel(1);
        ch.index = 0;
        assert!(matches!(
            validate_channel_config(&ch),
            Err(ValidationError::OutOfRange { .. })
        ));
        ch.index = 9;
        assert!(validate_channel_config(&ch).is_err());
    }

    #[test]
    fn test_ramp_bounds() {
        let mut ch = channel(3);
        ch.ramp_pulses = Some(16);
        assert!(validate_channel_config(&ch).is_ok());
        ch.ramp_pulses = Some(17);
        assert!(validate_channel_config(&ch).is_err());
    }

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(
            validate_channel_set(&[]),
            Err(ValidationError::EmptyChannelSet)
        );
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let set = vec![channel(2), channel(2)];
        assert_eq!(
            validate_channel_set(&set),
            Err(ValidationError::DuplicateChannel(2))
        );
    }

    #[test]
    fn test_request_against_configured_channels() {
        let request = StimulationRequest::new(
            &[channel(2)],
            StimulationDuration::seconds(5.0),
            true,
        );
        assert!(validate_request(&request, &[2, 3]).is_ok());
        assert_eq!(
            validate_request(&request, &[3]),
            Err(ValidationError::UnknownChannel(2))
        );
    }

    #[test]
    fn test_zero_duration_rejected() {
        let request =
            StimulationRequest::new(&[channel(1)], StimulationDuration::seconds(0.0), true);
        assert_eq!(
            validate_request(&request, &[1]),
            Err(ValidationError::NonPositiveDuration)
        );
    }

    #[test]
    fn test_overlong_duration_rejected() {
        let request =
            StimulationRequest::new(&[channel(1)], StimulationDuration::seconds(1e18), true);
        assert!(matches!(
            validate_request(&request, &[1]),
            Err(ValidationError::OutOfRange { .. })
        ));

        // A full day is still inside the envelope.
        let request = StimulationRequest::new(
            &[channel(1)],
            StimulationDuration::seconds(86_400.0),
            true,
        );
        assert!(validate_request(&request, &[1]).is_ok());
    }

    #[test]
    fn test_until_stopped_is_legal() {
        let request =
            StimulationRequest::new(&[channel(1)], StimulationDuration::UntilStopped, true);
        assert!(validate_request(&request, &[1]).is_ok());
    }

    proptest! {
        #[test]
        fn prop_amplitude_envelope(amplitude in -50.0f32..300.0) {
            let mut ch = channel(4);
            ch.mode = StimulationMode::Doublet;
            ch.amplitude_ma = amplitude;
            let ok = validate_channel_config(&ch).is_ok();
            prop_assert_eq!(ok, (0.0..=130.0).contains(&amplitude));
        }
    }
}
