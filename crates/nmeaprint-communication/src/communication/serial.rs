//! Serial port implementation
//!
//! Provides the `serialport` backed transport used against real hardware.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Opening a device at one of the supported baud rates with 8N1 framing
//! - Timed waits for incoming data

use crate::communication::transport::{PortOpener, SerialLink};
use nmeaprint_core::{BaudRate, ReaderConfig, SerialError, SerialErrorCode};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::io::{self, Read};
use std::time::Duration;

/// A serial port present on the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,
    /// What the platform knows about the device behind it
    pub description: String,
}

/// List available serial ports on the system
///
/// Every port the platform reports is returned; GNSS receivers show up under
/// many names (ttyUSB, ttyACM, rfcomm, COM) so no filtering is applied.
pub fn list_ports() -> Result<Vec<SerialPortInfo>, SerialError> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports.iter().map(to_port_info).collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(to_serial_error(e, SerialErrorCode::Unknown))
        }
    }
}

/// Baud rates offered to the user
pub fn baud_rates() -> &'static [BaudRate] {
    &BaudRate::ALL
}

fn to_port_info(port: &serialport::SerialPortInfo) -> SerialPortInfo {
    SerialPortInfo {
        port_name: port.port_name.clone(),
        description: describe_port(&port.port_type),
    }
}

/// Receivers usually enumerate as USB devices; their vendor and product
/// ids identify the chipset when the strings are missing.
fn describe_port(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            let mut description = format!(
                "USB {} {} [{:04x}:{:04x}]",
                usb.manufacturer.as_deref().unwrap_or("Device"),
                usb.product.as_deref().unwrap_or("Serial Port"),
                usb.vid,
                usb.pid
            );
            if let Some(serial) = &usb.serial_number {
                description.push_str(&format!(" S/N {}", serial));
            }
            description
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        serialport::SerialPortType::Unknown => "Serial Port".to_string(),
    }
}

/// Map a `serialport` failure onto an error code.
///
/// `fallback` is used when the platform gives no better classification.
fn to_serial_error(err: serialport::Error, fallback: SerialErrorCode) -> SerialError {
    let code = match err.kind() {
        serialport::ErrorKind::NoDevice => SerialErrorCode::DeviceNotFound,
        serialport::ErrorKind::InvalidInput => SerialErrorCode::UnsupportedOperation,
        serialport::ErrorKind::Io(kind) => match SerialErrorCode::from_io_kind(kind) {
            SerialErrorCode::Unknown => fallback,
            code => code,
        },
        serialport::ErrorKind::Unknown => fallback,
    };
    SerialError::new(code, err.description)
}

/// Opens real devices through the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(&self, config: &ReaderConfig) -> Result<Box<dyn SerialLink>, SerialError> {
        let port = serialport::new(&config.port_name, config.baud_rate.as_u32())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.wait_timeout)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", config.port_name, e);
                to_serial_error(e, SerialErrorCode::Open)
            })?;

        Ok(Box::new(NativeLink {
            port_name: config.port_name.clone(),
            port: Some(port),
            timeout: config.wait_timeout,
            pending: Vec::new(),
        }))
    }
}

/// An open `serialport` device
///
/// `serialport` has no "wait until readable" call, so a wait is a blocking
/// read bounded by the port timeout. Bytes pulled in by that read are kept
/// in `pending` and handed out by the next `read_all`.
pub struct NativeLink {
    port_name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
    timeout: Duration,
    pending: Vec<u8>,
}

const READ_CHUNK: usize = 1024;

fn port_closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "port is closed")
}

impl NativeLink {
    fn port_mut(&mut self) -> io::Result<&mut Box<dyn serialport::SerialPort>> {
        self.port.as_mut().ok_or_else(port_closed)
    }
}

impl SerialLink for NativeLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn wait_for_ready_read(&mut self, timeout: Duration) -> io::Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }

        let current = self.timeout;
        let port = self.port_mut()?;
        if port.bytes_to_read().map_err(io::Error::from)? > 0 {
            return Ok(true);
        }
        if current != timeout {
            port.set_timeout(timeout).map_err(io::Error::from)?;
        }

        let mut chunk = [0u8; READ_CHUNK];
        let result = port.read(&mut chunk);
        self.timeout = timeout;
        match result {
            Ok(0) => Ok(false),
            Ok(n) => {
                self.pending.extend_from_slice(&chunk[..n]);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let Some(port) = self.port.as_mut() else {
            return Err(port_closed());
        };
        let mut data = std::mem::take(&mut self.pending);
        let available = port.bytes_to_read().map_err(io::Error::from)? as usize;
        if available > 0 {
            let start = data.len();
            data.resize(start + available, 0);
            let n = match port.read(&mut data[start..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
                Err(e) => return Err(e),
            };
            data.truncate(start + n);
        }
        Ok(data)
    }

    fn close(&mut self) -> io::Result<()> {
        self.pending.clear();
        // Dropping the handle releases the device
        self.port.take();
        Ok(())
    }
}
