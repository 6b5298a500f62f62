//! stim-core: stimulation session supervision for electrical muscle
//! stimulation devices
//!
//! This library manages the lifecycle of stimulation operations against a
//! stateful device session. It features:
//!
//! - A supervisor enforcing at-most-one active stimulation operation
//! - Cancel-and-replace (`update`) semantics with a bounded grace period
//! - Immutable request snapshots, safe against caller-side mutation
//! - A device session trait with a fully instrumented simulated session
//! - Configuration management with TOML loading and validation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stim_core::device::simulated::{SimulatedSession, SimulatedSessionConfig};
//! use stim_core::{
//!     ChannelConfig, StimulationDuration, StimulationRequest, StimulationSupervisor,
//! };
//! use stim_core::config::SupervisorSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SimulatedSession::open(SimulatedSessionConfig::default())?;
//!     let supervisor = StimulationSupervisor::new(session, SupervisorSettings::default())?;
//!
//!     let mut channel = ChannelConfig::new(2).with_name("Biceps");
//!     channel.amplitude_ma = 25.0;
//!     channel.pulse_width_us = 100;
//!
//!     supervisor.initialize(std::slice::from_ref(&channel)).await?;
//!
//!     let request = StimulationRequest::new(
//!         std::slice::from_ref(&channel),
//!         StimulationDuration::seconds(5.0),
//!         true,
//!     );
//!     let mut handle = supervisor.start(request).await?;
//!     println!("outcome: {:?}", handle.wait().await);
//!
//!     supervisor.end().await?;
//!     supervisor.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod device;
pub mod error;
pub mod supervisor;
pub mod utils;

// Re-export commonly used types for convenience
pub use device::{
    ChannelConfig, CommandStatus, CommandToken, DeviceError, DeviceSession, StimulationDuration,
    StimulationMode, StimulationRequest,
};
pub use error::{SupervisorError, SupervisorResult};
pub use supervisor::{OperationHandle, OperationOutcome, OperationStatus, StimulationSupervisor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
