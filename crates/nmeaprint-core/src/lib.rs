//! # NmeaPrint Core
//!
//! Core types shared by the NmeaPrint crates: the supported baud rates,
//! the reader configuration, the events a reader emits and the error
//! taxonomy used across the workspace.

pub mod baud;
pub mod config;
pub mod error;
pub mod event;

pub use baud::BaudRate;
pub use config::{
    ReaderConfig, ReaderState, DEFAULT_WAIT_TIMEOUT, FRAMING, MAX_MESSAGE_BYTES,
    QUIESCENCE_INTERVAL,
};
pub use error::{ConfigError, SerialError, SerialErrorCode};
pub use event::ReaderEvent;
