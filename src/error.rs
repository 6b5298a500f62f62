// src/error.rs
//! Error taxonomy for stimulation session supervision
//!
//! Errors from configuration and precondition checks are returned before any
//! state is mutated; an operation that was intentionally superseded reports
//! [`crate::supervisor::OperationOutcome::Cancelled`] rather than an error,
//! so callers can tell a deliberate supersede apart from a device failure.

use crate::device::DeviceError;
use crate::utils::validation::ValidationError;
use thiserror::Error;

/// Errors surfaced by [`crate::supervisor::StimulationSupervisor`]
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Bad channel set or request parameters; rejected before touching
    /// the device, no state change
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    /// Operation attempted from the wrong supervisor state; the active
    /// operation (if any) is left untouched
    #[error("{operation} is not allowed while the supervisor is {state}")]
    InvalidState {
        /// The attempted operation
        operation: &'static str,
        /// The state the supervisor was in
        state: &'static str,
    },

    /// The prior operation did not acknowledge cancellation within the
    /// grace period; supervisor state is left exactly as it was
    #[error("previous operation did not acknowledge cancellation within {grace_ms} ms")]
    CancellationTimeout {
        /// The configured grace period
        grace_ms: u64,
    },

    /// The underlying device session reported a failure
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The supervisor was already closed
    #[error("supervisor is closed")]
    Closed,
}

/// Result type alias for supervisor operations
pub type SupervisorResult<T> = Result<T, SupervisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SupervisorError::InvalidState {
            operation: "start",
            state: "running",
        };
        assert_eq!(
            err.to_string(),
            "start is not allowed while the supervisor is running"
        );

        let err = SupervisorError::CancellationTimeout { grace_ms: 2000 };
        assert!(err.to_string().contains("2000 ms"));
    }

    #[test]
    fn test_device_errors_pass_through() {
        let err: SupervisorError = DeviceError::SessionClosed.into();
        assert_eq!(err.to_string(), DeviceError::SessionClosed.to_string());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SupervisorError>();
    }
}
