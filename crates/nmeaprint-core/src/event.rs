//! Reader events
//!
//! Everything the reader loop has to say reaches the outside world as one
//! of these variants. Consumers match on the kind; nothing is raised back
//! into the controller's call stack.

use crate::error::{SerialError, SerialErrorCode};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// Event emitted by the reader loop
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReaderEvent {
    /// A burst of bytes, decoded as text
    MessageReceived {
        /// Decoded text, invalid UTF-8 replaced
        text: String,
    },
    /// No data arrived within the read timeout
    TimeoutOccurred {
        /// Wall-clock time the wait gave up
        at: DateTime<Local>,
    },
    /// The device could not be opened or failed while reading
    ErrorOccurred {
        /// Device the failure refers to
        port_name: String,
        /// The failure
        error: SerialError,
    },
}

impl ReaderEvent {
    /// Build a message event from raw bytes
    pub fn message(bytes: &[u8]) -> Self {
        ReaderEvent::MessageReceived {
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Build a timeout event stamped with the current time
    pub fn timeout_now() -> Self {
        ReaderEvent::TimeoutOccurred { at: Local::now() }
    }

    /// Build an error event
    pub fn error(port_name: impl Into<String>, error: SerialError) -> Self {
        ReaderEvent::ErrorOccurred {
            port_name: port_name.into(),
            error,
        }
    }

    /// Whether this event ends the reader loop
    pub fn is_error(&self) -> bool {
        matches!(self, ReaderEvent::ErrorOccurred { .. })
    }
}

impl fmt::Display for ReaderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderEvent::MessageReceived { text } => f.write_str(text),
            ReaderEvent::TimeoutOccurred { at } => {
                write!(f, "Wait read request timeout {}", at.format("%H:%M:%S"))
            }
            ReaderEvent::ErrorOccurred { port_name, error } => match error.code {
                SerialErrorCode::Read | SerialErrorCode::Resource => {
                    write!(f, "Read failed on {}, error code {}", port_name, error.code)
                }
                _ => write!(f, "Can't open {}, error code {}", port_name, error.code),
            },
        }
    }
}
