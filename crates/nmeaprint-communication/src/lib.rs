//! # NmeaPrint Communication
//!
//! Serial transport and the background reader for NmeaPrint.
//! The reader owns the open device on a dedicated thread and can be
//! pointed at another device, baud rate or timeout at any moment.

pub mod communication;

pub use communication::{
    reader::{EventReceiver, EventSender, SerialReader},
    serial::{baud_rates, list_ports, NativeLink, SerialPortInfo, SystemPortOpener},
    transport::{PortOpener, SerialLink},
};
