//! Error types for FAU201 operations.

use thiserror::Error;

use crate::protocol::{VOLTAGE_MAX, VOLTAGE_MIN};

/// Result type for FAU201 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving an FAU201.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested output voltage outside the DAC range.
    #[error("Voltage must be between {} and {}", VOLTAGE_MIN, VOLTAGE_MAX)]
    VoltageOutOfRange(f32),
}
