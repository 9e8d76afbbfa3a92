//! Error handling for NmeaPrint
//!
//! Provides the error types for every layer of the reader:
//! - Serial errors (device open and read failures, with numeric codes)
//! - Configuration errors (unsupported baud rates, invalid timeouts)

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// Numeric classification of a serial device failure.
///
/// The discriminants are stable and are what the error event reports as
/// the "error code" of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u32")]
#[repr(u32)]
pub enum SerialErrorCode {
    /// The device does not exist
    DeviceNotFound = 1,
    /// The device is busy or access was denied
    Permission = 2,
    /// The device is already open or could not be opened
    Open = 3,
    /// Reading from the device failed
    Read = 8,
    /// The device became unavailable, e.g. it was unplugged
    Resource = 9,
    /// The operation is not supported by the device or platform
    UnsupportedOperation = 10,
    /// Unclassified failure
    Unknown = 11,
    /// The operation timed out
    Timeout = 12,
    /// The device is not open
    NotOpen = 13,
}

impl SerialErrorCode {
    /// Numeric value of the code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Classify an I/O error kind
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::DeviceNotFound,
            io::ErrorKind::PermissionDenied => Self::Permission,
            io::ErrorKind::AlreadyExists => Self::Open,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::NotConnected => Self::NotOpen,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => Self::Resource,
            io::ErrorKind::Unsupported => Self::UnsupportedOperation,
            _ => Self::Unknown,
        }
    }
}

impl From<SerialErrorCode> for u32 {
    fn from(code: SerialErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for SerialErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Serial device error
///
/// Carries the numeric code reported upstream along with a human readable
/// description of the underlying failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message} (error code {code})")]
pub struct SerialError {
    /// Classification of the failure.
    pub code: SerialErrorCode,
    /// Description of the underlying failure.
    pub message: String,
}

impl SerialError {
    /// Create a new serial error
    pub fn new(code: SerialErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classify an I/O error raised while reading from an open device.
    ///
    /// Timeouts are never routed here; anything that reaches this point is a
    /// genuine read failure unless the kind says the device went away or
    /// was already closed.
    pub fn from_read(err: &io::Error) -> Self {
        let code = match SerialErrorCode::from_io_kind(err.kind()) {
            code @ (SerialErrorCode::Resource | SerialErrorCode::NotOpen) => code,
            _ => SerialErrorCode::Read,
        };
        Self::new(code, err.to_string())
    }
}

impl From<io::Error> for SerialError {
    fn from(err: io::Error) -> Self {
        Self::new(SerialErrorCode::from_io_kind(err.kind()), err.to_string())
    }
}

/// Configuration error type
///
/// Represents invalid reader configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Baud rate outside the supported set
    #[error("Baud rate {baud} not supported")]
    UnsupportedBaudRate {
        /// The unsupported baud rate.
        baud: u32,
    },

    /// Baud rate text that is not a number
    #[error("Invalid baud rate '{value}'")]
    InvalidBaudRate {
        /// The text that failed to parse.
        value: String,
    },

    /// Read timeout of zero
    #[error("Read timeout must be > 0, got {timeout_ms}ms")]
    InvalidTimeout {
        /// The rejected timeout in milliseconds.
        timeout_ms: u64,
    },
}
