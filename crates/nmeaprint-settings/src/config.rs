//! Reader settings management
//!
//! Settings are stored as TOML in the platform configuration directory
//! (`~/.config/nmeaprint/nmeaprint.toml` on Linux). Missing keys fall back
//! to their defaults, so older files keep loading.

use crate::error::{SettingsError, SettingsResult};
use nmeaprint_core::{BaudRate, ReaderConfig, DEFAULT_WAIT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the settings file
pub const SETTINGS_FILE_NAME: &str = "nmeaprint.toml";

/// How events are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Sentences verbatim, status lines prefixed with `#`
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Persisted reader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Last used device; empty when none was chosen
    pub port_name: String,
    /// Last used baud rate
    pub baud_rate: BaudRate,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Event output format
    pub output: OutputFormat,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: BaudRate::default(),
            timeout_ms: DEFAULT_WAIT_TIMEOUT.as_millis() as u64,
            output: OutputFormat::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Default location of the settings file
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("nmeaprint").join(SETTINGS_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no configuration directory".to_string())
            })
    }

    /// Load settings from a TOML file
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;
        let settings: Self = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Save settings to a TOML file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        tracing::debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> SettingsResult<()> {
        if self.timeout_ms == 0 {
            return Err(SettingsError::InvalidSetting {
                key: "timeout_ms".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.log_level.trim().is_empty() {
            return Err(SettingsError::InvalidSetting {
                key: "log_level".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Read timeout as a duration
    pub fn reader_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reader configuration described by these settings
    pub fn reader_config(&self) -> SettingsResult<ReaderConfig> {
        Ok(ReaderConfig::new(
            self.port_name.clone(),
            self.baud_rate,
            self.reader_timeout(),
        )?)
    }
}
