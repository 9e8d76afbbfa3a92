//! Supported serial baud rates
//!
//! The reader only accepts a fixed set of standard rates; anything else is
//! rejected at the configuration boundary rather than handed to the device.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Baud rate from the supported set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum BaudRate {
    /// 1200 baud
    Baud1200,
    /// 2400 baud
    Baud2400,
    /// 4800 baud, the NMEA 0183 standard rate
    Baud4800,
    /// 9600 baud
    Baud9600,
    /// 19200 baud
    Baud19200,
    /// 38400 baud, NMEA 0183-HS
    Baud38400,
    /// 57600 baud
    Baud57600,
    /// 115200 baud
    Baud115200,
}

impl BaudRate {
    /// Every supported rate, ascending
    pub const ALL: [BaudRate; 8] = [
        BaudRate::Baud1200,
        BaudRate::Baud2400,
        BaudRate::Baud4800,
        BaudRate::Baud9600,
        BaudRate::Baud19200,
        BaudRate::Baud38400,
        BaudRate::Baud57600,
        BaudRate::Baud115200,
    ];

    /// Bits per second
    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::Baud1200 => 1200,
            BaudRate::Baud2400 => 2400,
            BaudRate::Baud4800 => 4800,
            BaudRate::Baud9600 => 9600,
            BaudRate::Baud19200 => 19200,
            BaudRate::Baud38400 => 38400,
            BaudRate::Baud57600 => 57600,
            BaudRate::Baud115200 => 115200,
        }
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate::Baud9600
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ConfigError;

    fn try_from(baud: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|rate| rate.as_u32() == baud)
            .ok_or(ConfigError::UnsupportedBaudRate { baud })
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.as_u32()
    }
}

impl FromStr for BaudRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let baud: u32 = s.trim().parse().map_err(|_| ConfigError::InvalidBaudRate {
            value: s.to_string(),
        })?;
        BaudRate::try_from(baud)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}
