// src/utils/mod.rs
//! Shared utilities for stim-core

pub mod time;
pub mod validation;

pub use time::current_timestamp_nanos;
pub use validation::{ValidationError, ValidationResult};
