//! Reader configuration
//!
//! The configuration is the only state a controller hands to its reader
//! loop. It is written as a whole, so the loop never sees a device name
//! from one request paired with a baud rate from another.

use crate::baud::BaudRate;
use crate::error::ConfigError;
use std::fmt;
use std::time::Duration;

/// Read timeout used when a start request does not name one
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Silence that ends a burst of bytes
pub const QUIESCENCE_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on a single drained message
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Framing applied to every opened device: data bits, parity, stop bits
pub const FRAMING: &str = "8N1";

/// Device parameters for the reader loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Device to open (e.g. "/dev/ttyUSB0", "COM3"); empty means none
    pub port_name: String,
    /// Line speed
    pub baud_rate: BaudRate,
    /// How long a single read waits for data before reporting a timeout
    pub wait_timeout: Duration,
}

impl ReaderConfig {
    /// Create a configuration, validating the timeout
    pub fn new(
        port_name: impl Into<String>,
        baud_rate: BaudRate,
        wait_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if wait_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout { timeout_ms: 0 });
        }
        Ok(Self {
            port_name: port_name.into(),
            baud_rate,
            wait_timeout,
        })
    }

    /// Whether a device identity is present
    pub fn has_port(&self) -> bool {
        !self.port_name.is_empty()
    }

    /// Whether moving from `self` to `next` needs the device reopened.
    ///
    /// A new device name or a new baud rate does; a new timeout alone does
    /// not, it simply applies to the next wait.
    pub fn requires_reopen(&self, next: &ReaderConfig) -> bool {
        self.port_name != next.port_name || self.baud_rate != next.baud_rate
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: BaudRate::default(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

impl fmt::Display for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = if self.has_port() {
            self.port_name.as_str()
        } else {
            "<none>"
        };
        write!(
            f,
            "{} @ {} {} (timeout {}ms)",
            port,
            self.baud_rate,
            FRAMING,
            self.wait_timeout.as_millis()
        )
    }
}

/// Phases of the reader loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// No device open, nothing to apply
    Idle,
    /// Closing the previous device and opening the configured one
    Applying,
    /// Blocked until data arrives or the read timeout elapses
    Waiting,
    /// Collecting a burst of bytes until the line goes quiet
    Draining,
    /// Handing an event to the sink
    Reporting,
    /// Terminal; the device is closed
    Stopped,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReaderState::Idle => "idle",
            ReaderState::Applying => "applying",
            ReaderState::Waiting => "waiting",
            ReaderState::Draining => "draining",
            ReaderState::Reporting => "reporting",
            ReaderState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(port: &str, baud: BaudRate, timeout_ms: u64) -> ReaderConfig {
        ReaderConfig {
            port_name: port.to_string(),
            baud_rate: baud,
            wait_timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn test_default_has_no_port() {
        let config = ReaderConfig::default();
        assert!(!config.has_port());
        assert_eq!(config.wait_timeout, DEFAULT_WAIT_TIMEOUT);
        assert_eq!(config.to_string(), "<none> @ 9600 8N1 (timeout 3000ms)");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ReaderConfig::new("COM1", BaudRate::Baud4800, Duration::ZERO).unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout { timeout_ms: 0 });
    }

    #[test]
    fn test_reopen_decision() {
        let base = config("COM1", BaudRate::Baud4800, 3000);
        assert!(!base.requires_reopen(&config("COM1", BaudRate::Baud4800, 500)));
        assert!(base.requires_reopen(&config("COM2", BaudRate::Baud4800, 3000)));
        assert!(base.requires_reopen(&config("COM1", BaudRate::Baud9600, 3000)));
    }

    proptest! {
        #[test]
        fn prop_timeout_never_forces_reopen(a in 1u64..100_000, b in 1u64..100_000, idx in 0usize..8) {
            let baud = BaudRate::ALL[idx];
            let before = config("/dev/ttyUSB0", baud, a);
            let after = config("/dev/ttyUSB0", baud, b);
            prop_assert!(!before.requires_reopen(&after));
        }
    }
}
