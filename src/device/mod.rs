// src/device/mod.rs
//! Device session abstraction for stimulation hardware

pub mod simulated;
pub mod traits;
pub mod types;

pub use traits::*;
pub use types::*;
