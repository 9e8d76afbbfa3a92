//! Console commands
//!
//! The line-oriented command language used to drive a running reader:
//!
//! ```text
//! start <port> [baud] [timeout_ms]
//! stop
//! ports
//! bauds
//! status
//! help
//! quit
//! ```

use nmeaprint_core::{BaudRate, ConfigError};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Help text printed by the `help` command
pub const HELP: &str = "\
start <port> [baud] [timeout_ms]  read from <port>, keeping unspecified values
stop                              stop reading and close the port
ports                             list serial ports
bauds                             list supported baud rates
status                            show the current configuration
help                              show this help
quit                              stop and exit";

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Point the reader at a device
    Start {
        /// Device to open
        port_name: String,
        /// New baud rate, or keep the current one
        baud_rate: Option<BaudRate>,
        /// New read timeout, or keep the current one
        timeout: Option<Duration>,
    },
    /// Stop reading
    Stop,
    /// List serial ports
    Ports,
    /// List supported baud rates
    Bauds,
    /// Show the current configuration
    Status,
    /// Show help
    Help,
    /// Stop and exit
    Quit,
}

/// Errors from parsing a console line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    #[error("Empty command")]
    Empty,

    /// First word is not a command
    #[error("Unknown command '{0}', try 'help'")]
    Unknown(String),

    /// A required argument is missing
    #[error("'{command}' needs a {argument}")]
    MissingArgument {
        /// The command.
        command: &'static str,
        /// The missing argument.
        argument: &'static str,
    },

    /// More arguments than the command takes
    #[error("Too many arguments for '{0}'")]
    TooManyArguments(&'static str),

    /// Baud rate outside the supported set
    #[error(transparent)]
    BaudRate(#[from] ConfigError),

    /// Timeout that is not a positive number of milliseconds
    #[error("Invalid timeout '{0}', expected milliseconds > 0")]
    InvalidTimeout(String),
}

impl FromStr for ConsoleCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(CommandError::Empty);
        };
        let rest: Vec<&str> = words.collect();

        let no_args = |name: &'static str, cmd: ConsoleCommand| {
            if rest.is_empty() {
                Ok(cmd)
            } else {
                Err(CommandError::TooManyArguments(name))
            }
        };

        match command.to_ascii_lowercase().as_str() {
            "start" => parse_start(&rest),
            "stop" => no_args("stop", ConsoleCommand::Stop),
            "ports" => no_args("ports", ConsoleCommand::Ports),
            "bauds" => no_args("bauds", ConsoleCommand::Bauds),
            "status" => no_args("status", ConsoleCommand::Status),
            "help" | "?" => no_args("help", ConsoleCommand::Help),
            "quit" | "exit" => no_args("quit", ConsoleCommand::Quit),
            _ => Err(CommandError::Unknown(command.to_string())),
        }
    }
}

fn parse_start(args: &[&str]) -> Result<ConsoleCommand, CommandError> {
    let (port_name, baud, timeout) = match args {
        [] => {
            return Err(CommandError::MissingArgument {
                command: "start",
                argument: "port",
            })
        }
        [port] => (port, None, None),
        [port, baud] => (port, Some(baud), None),
        [port, baud, timeout] => (port, Some(baud), Some(timeout)),
        _ => return Err(CommandError::TooManyArguments("start")),
    };

    let baud_rate = baud.map(|b| b.parse::<BaudRate>()).transpose()?;
    let timeout = timeout
        .map(|t| match t.parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
            _ => Err(CommandError::InvalidTimeout(t.to_string())),
        })
        .transpose()?;

    Ok(ConsoleCommand::Start {
        port_name: port_name.to_string(),
        baud_rate,
        timeout,
    })
}
