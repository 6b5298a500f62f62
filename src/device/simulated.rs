// src/device/simulated.rs
//! In-process stimulation device session
//!
//! Stands in for real hardware during development and testing. The session
//! enforces the same contract a physical device would (configure before use,
//! one outstanding stimulation command, safety-gated parameter limits,
//! idempotent stop) and records every command it receives in an inspectable
//! log. Fault injection flags cover the failure modes the supervisor has to
//! survive: command rejection and status polls that never return.

use crate::device::traits::DeviceSession;
use crate::device::types::{
    ChannelConfig, CommandStatus, CommandToken, DeviceError, StimulationDuration,
    StimulationRequest,
};
use crate::utils::validation::validate_channel_config;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Simulated session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedSessionConfig {
    /// Cosmetic port name, mirrors opening a real transport
    pub port_name: String,
    /// Artificial delay before a stimulation command is accepted
    pub command_latency_ms: u64,
    /// Fault injection: refuse every stimulation command
    pub reject_commands: bool,
    /// Fault injection: status polls never return, as if the device hung
    pub hang_status_polls: bool,
}

impl Default for SimulatedSessionConfig {
    fn default() -> Self {
        Self {
            port_name: "SIM0".to_string(),
            command_latency_ms: 0,
            reject_commands: false,
            hang_status_polls: false,
        }
    }
}

/// One command observed by the simulated device, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Channel configuration was written
    Configure {
        /// Configured channel indices
        channels: Vec<u8>,
    },
    /// A stimulation command was accepted
    StimulationStart {
        /// Device-assigned command id
        command_id: u64,
        /// Channel snapshots exactly as received
        channels: Vec<ChannelConfig>,
    },
    /// A stop command was received
    Stop,
    /// The session was closed
    Close,
}

/// Shared, inspectable log of commands the device has seen
pub type CommandLog = Arc<Mutex<Vec<SessionCommand>>>;

struct ActiveCommand {
    id: u64,
    deadline: Option<Instant>,
}

/// Simulated [`DeviceSession`] implementation
pub struct SimulatedSession {
    config: SimulatedSessionConfig,
    configured: Option<Vec<u8>>,
    active: Option<ActiveCommand>,
    next_command_id: u64,
    closed: bool,
    log: CommandLog,
}

impl SimulatedSession {
    /// Open a simulated session.
    pub fn open(config: SimulatedSessionConfig) -> Result<Self, DeviceError> {
        if config.port_name.is_empty() {
            return Err(DeviceError::Transport("port name cannot be empty".to_string()));
        }

        debug!(port = %config.port_name, "simulated session opened");
        Ok(Self {
            config,
            configured: None,
            active: None,
            next_command_id: 1,
            closed: false,
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Handle to the command log, valid after the session moves into a
    /// supervisor.
    pub fn command_log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }

    fn ensure_open(&self) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::SessionClosed);
        }
        Ok(())
    }

    fn check_safety_limits(request: &StimulationRequest) -> Result<(), DeviceError> {
        for channel in request.channels() {
            validate_channel_config(channel).map_err(|err| DeviceError::ChannelLimit {
                channel: channel.index,
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceSession for SimulatedSession {
    async fn configure(&mut self, channels: &[ChannelConfig]) -> Result<(), DeviceError> {
        self.ensure_open()?;

        let indices: Vec<u8> = channels.iter().map(|c| c.index).collect();
        if indices.is_empty() {
            return Err(DeviceError::Rejected("empty channel configuration".to_string()));
        }

        self.log.lock().push(SessionCommand::Configure {
            channels: indices.clone(),
        });
        self.configured = Some(indices);
        Ok(())
    }

    async fn send_stimulation_command(
        &mut self,
        request: &StimulationRequest,
    ) -> Result<CommandToken, DeviceError> {
        self.ensure_open()?;
        let configured = self.configured.as_ref().ok_or(DeviceError::NotConfigured)?;

        for channel in request.channels() {
            if !configured.contains(&channel.index) {
                return Err(DeviceError::Rejected(format!(
                    "channel {} was not configured",
                    channel.index
                )));
            }
        }

        if self.config.command_latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.command_latency_ms)).await;
        }

        if self.config.reject_commands {
            return Err(DeviceError::Rejected("injected command rejection".to_string()));
        }

        // A real stimulator cannot run two pulse trains at once; a second
        // start without an intervening stop is a caller bug.
        if self.active.is_some() {
            return Err(DeviceError::Rejected(
                "stimulation command issued while another is outstanding".to_string(),
            ));
        }

        if request.safety() {
            Self::check_safety_limits(request)?;
        }

        let id = self.next_command_id;
        self.next_command_id += 1;

        let deadline = match request.duration() {
            StimulationDuration::For(d) => Some(Instant::now() + d),
            StimulationDuration::UntilStopped => None,
        };
        self.active = Some(ActiveCommand { id, deadline });

        self.log.lock().push(SessionCommand::StimulationStart {
            command_id: id,
            channels: request.channels().to_vec(),
        });
        debug!(command = id, "stimulation command accepted");

        Ok(CommandToken::new(id))
    }

    async fn poll_status(&mut self, token: &CommandToken) -> Result<CommandStatus, DeviceError> {
        self.ensure_open()?;

        if self.config.hang_status_polls {
            // Device went silent: the poll never completes.
            std::future::pending::<()>().await;
        }

        if token.id() >= self.next_command_id {
            return Err(DeviceError::Rejected(format!(
                "unknown command {}",
                token.id()
            )));
        }

        match &self.active {
            Some(active) if active.id == token.id() => match active.deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    // The pulse train ran out on its own.
                    self.active = None;
                    Ok(CommandStatus::Completed)
                }
                _ => Ok(CommandStatus::Running),
            },
            // Superseded or stopped earlier; from the device's point of
            // view the command is over.
            _ => Ok(CommandStatus::Completed),
        }
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        self.ensure_open()?;
        self.active = None;
        self.log.lock().push(SessionCommand::Stop);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.ensure_open()?;
        self.closed = true;
        self.active = None;
        self.log.lock().push(SessionCommand::Close);
        debug!(port = %self.config.port_name, "simulated session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(index: u8, amplitude_ma: f32) -> ChannelConfig {
        let mut ch = ChannelConfig::new(index);
        ch.amplitude_ma = amplitude_ma;
        ch.pulse_width_us = 100;
        ch
    }

    fn request(amplitude_ma: f32, safety: bool) -> StimulationRequest {
        StimulationRequest::new(
            &[channel(1, amplitude_ma)],
            StimulationDuration::seconds(5.0),
            safety,
        )
    }

    async fn configured_session() -> SimulatedSession {
        let mut session =
            SimulatedSession::open(SimulatedSessionConfig::default()).expect("open failed");
        session
            .configure(&[channel(1, 0.0)])
            .await
            .expect("configure failed");
        session
    }

    #[tokio::test]
    async fn test_command_requires_configuration() {
        let mut session =
            SimulatedSession::open(SimulatedSessionConfig::default()).expect("open failed");
        let err = session
            .send_stimulation_command(&request(25.0, true))
            .await
            .unwrap_err();
        assert_eq!(err, DeviceError::NotConfigured);
    }

    #[tokio::test]
    async fn test_overlapping_commands_rejected() {
        let mut session = configured_session().await;
        session
            .send_stimulation_command(&request(25.0, true))
            .await
            .expect("first command");

        let err = session
            .send_stimulation_command(&request(25.0, true))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Rejected(_)));

        // After a stop the device accepts commands again.
        session.stop().await.expect("stop failed");
        session
            .send_stimulation_command(&request(25.0, true))
            .await
            .expect("command after stop");
    }

    #[tokio::test]
    async fn test_safety_flag_gates_limit_checks() {
        let mut session = configured_session().await;

        let err = session
            .send_stimulation_command(&request(200.0, true))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::ChannelLimit { channel: 1, .. }));

        // With safety off the device takes the command as-is.
        session
            .send_stimulation_command(&request(200.0, false))
            .await
            .expect("unsafe command accepted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_command_completes_after_duration() {
        let mut session = configured_session().await;
        let token = session
            .send_stimulation_command(&request(25.0, true))
            .await
            .expect("command");

        assert_eq!(
            session.poll_status(&token).await.expect("poll"),
            CommandStatus::Running
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(
            session.poll_status(&token).await.expect("poll"),
            CommandStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut session = configured_session().await;
        session.stop().await.expect("first stop");
        session.stop().await.expect("second stop");

        let log = session.command_log();
        let stops = log
            .lock()
            .iter()
            .filter(|c| matches!(c, SessionCommand::Stop))
            .count();
        assert_eq!(stops, 2);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_everything() {
        let mut session = configured_session().await;
        session.close().await.expect("close");

        assert_eq!(session.stop().await.unwrap_err(), DeviceError::SessionClosed);
        assert_eq!(
            session.close().await.unwrap_err(),
            DeviceError::SessionClosed
        );
        assert_eq!(
            session
                .send_stimulation_command(&request(25.0, true))
                .await
                .unwrap_err(),
            DeviceError::SessionClosed
        );
    }

    #[tokio::test]
    async fn test_log_records_channel_snapshots() {
        let mut session = configured_session().await;
        session
            .send_stimulation_command(&request(25.0, true))
            .await
            .expect("command");

        let log = session.command_log();
        let log = log.lock();
        match &log[1] {
            SessionCommand::StimulationStart { channels, .. } => {
                assert_eq!(channels[0].amplitude_ma, 25.0);
            }
            other => panic!("unexpected log entry: {other:?}"),
        }
    }
}
