// src/device/traits.rs
//! Device session trait consumed by the supervisor

use crate::device::types::{
    ChannelConfig, CommandStatus, CommandToken, DeviceError, StimulationRequest,
};
use async_trait::async_trait;

/// One open connection to a stimulation device.
///
/// Opening the underlying transport is a constructor concern of each
/// implementation; the supervisor only drives an already-open session.
/// A session must be owned by exactly one supervisor.
#[async_trait]
pub trait DeviceSession: Send + 'static {
    /// Send the channel configuration to the device.
    async fn configure(&mut self, channels: &[ChannelConfig]) -> Result<(), DeviceError>;

    /// Issue a stimulation command. Non-blocking with respect to the
    /// stimulation itself; completion is observed via [`Self::poll_status`].
    async fn send_stimulation_command(
        &mut self,
        request: &StimulationRequest,
    ) -> Result<CommandToken, DeviceError>;

    /// Poll the state of a previously issued command.
    async fn poll_status(&mut self, token: &CommandToken) -> Result<CommandStatus, DeviceError>;

    /// Stop any running stimulation. Idempotent: stopping an already
    /// stopped device is not an error.
    async fn stop(&mut self) -> Result<(), DeviceError>;

    /// Release the session. Further calls fail with
    /// [`DeviceError::SessionClosed`].
    async fn close(&mut self) -> Result<(), DeviceError>;
}
