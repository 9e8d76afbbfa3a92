//! # NmeaPrint
//!
//! Reads NMEA 0183 sentences from a serial device on a background thread
//! and prints them, while the device, baud rate and read timeout can be
//! changed at any moment from the console.
//!
//! ## Architecture
//!
//! NmeaPrint is organized as a workspace with multiple crates:
//!
//! 1. **nmeaprint-core** - Baud rates, reader configuration, events, errors
//! 2. **nmeaprint-communication** - Serial transport, port discovery, reader loop
//! 3. **nmeaprint-settings** - Persisted settings
//! 4. **nmeaprint** - Console front end that integrates all crates

pub mod app;
pub mod console;
pub mod output;

pub use nmeaprint_communication::{EventReceiver, PortOpener, SerialLink, SerialReader};
pub use nmeaprint_core::{BaudRate, ReaderConfig, ReaderEvent, SerialError, SerialErrorCode};
pub use nmeaprint_settings::{OutputFormat, Settings};

/// Initialize logging
///
/// Logs go to stderr so stdout carries nothing but reader output.
/// `RUST_LOG` overrides `default_filter`.
pub fn init_logging(default_filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
