//! Transport contract
//!
//! The reader loop only talks to devices through these two traits, so any
//! byte stream with a timed "wait for data" can stand in for a serial port.

use nmeaprint_core::{ReaderConfig, SerialError};
use std::io;
use std::time::Duration;

/// An open device
///
/// Owned by exactly one reader loop at a time.
pub trait SerialLink: Send {
    /// Name the device was opened under
    fn port_name(&self) -> &str;

    /// Block until data is ready or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout. Timeouts are never reported as errors.
    fn wait_for_ready_read(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Take every byte currently available without blocking
    fn read_all(&mut self) -> io::Result<Vec<u8>>;

    /// Close the device; later calls on the link fail with `NotConnected`
    fn close(&mut self) -> io::Result<()>;
}

/// Opens devices for the reader loop
///
/// Implementations always apply 8 data bits, no parity, one stop bit and no
/// flow control; only the device name, baud rate and timeout vary.
pub trait PortOpener: Send + Sync {
    /// Open the device named in `config` at its baud rate
    fn open(&self, config: &ReaderConfig) -> Result<Box<dyn SerialLink>, SerialError>;
}
