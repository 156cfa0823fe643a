//! Error types for CP2130 bridge operations.

use thiserror::Error;

/// Result type for CP2130 bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of opening a bridge, kept as a closed set of status codes.
///
/// Opening never fails through `Err`; callers inspect the returned status
/// and leave the handle unused when it is anything other than `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OpenStatus {
    /// Device found and claimed.
    Success = 0,
    /// The USB context could not be initialized.
    InitFailed = 1,
    /// No matching device was found.
    NotFound = 2,
    /// The device exists but its interface is claimed elsewhere.
    Busy = 3,
}

impl OpenStatus {
    /// Numeric status code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Get a human-readable name for the status.
    pub fn name(self) -> &'static str {
        match self {
            OpenStatus::Success => "SUCCESS",
            OpenStatus::InitFailed => "ERROR_INIT",
            OpenStatus::NotFound => "ERROR_NOT_FOUND",
            OpenStatus::Busy => "ERROR_BUSY",
        }
    }

    pub fn is_success(self) -> bool {
        self == OpenStatus::Success
    }
}

/// Errors that can occur during CP2130 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// USB operation failed.
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// No device handle is held.
    #[error("Device is not open")]
    NotOpen,

    /// The device went away while the handle was held.
    #[error("Device disconnected")]
    Disconnected,

    /// SPI channel outside 0..=10.
    #[error("Invalid channel: {0}")]
    InvalidChannel(u8),

    /// Control transfer failed.
    #[error("Control transfer failed: {0}")]
    ControlTransferFailed(String),

    /// Fewer bytes moved than requested.
    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// Invalid response from device.
    #[error("Invalid device response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_status_codes() {
        assert_eq!(OpenStatus::Success.code(), 0);
        assert_eq!(OpenStatus::InitFailed.code(), 1);
        assert_eq!(OpenStatus::NotFound.code(), 2);
        assert_eq!(OpenStatus::Busy.code(), 3);
        assert!(OpenStatus::Success.is_success());
        assert!(!OpenStatus::Busy.is_success());
    }

    #[test]
    fn test_usb_error_conversion() {
        let err: Error = rusb::Error::NoDevice.into();
        assert!(matches!(err, Error::Usb(rusb::Error::NoDevice)));
        assert!(err.to_string().starts_with("USB error"));
    }

    #[test]
    fn test_error_display() {
        let err = Error::ShortTransfer {
            expected: 9,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Short transfer: expected 9 bytes, got 4");
        assert_eq!(Error::InvalidChannel(11).to_string(), "Invalid channel: 11");
    }
}
