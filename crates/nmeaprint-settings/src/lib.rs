//! NmeaPrint Settings Crate
//!
//! Handles the persisted reader settings: the last device, baud rate, read
//! timeout and output preferences.

pub mod config;
pub mod error;

pub use config::{OutputFormat, Settings, SETTINGS_FILE_NAME};
pub use error::{SettingsError, SettingsResult};
