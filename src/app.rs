//! Console front end
//!
//! Prints reader events as they arrive and executes console commands
//! read from stdin against the running reader.

use crate::console::{ConsoleCommand, HELP};
use crate::output::render_event;
use nmeaprint_communication::{EventReceiver, SerialReader};
use nmeaprint_core::ReaderConfig;
use nmeaprint_settings::OutputFormat;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::thread;
use tokio::sync::mpsc;

/// Console lines as they are read, ending when the input closes
pub type ConsoleInput = mpsc::UnboundedReceiver<io::Result<String>>;

/// Whether the console keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command
    Continue,
    /// Leave the console
    Quit,
}

/// Execute one command against the reader, writing feedback to `out`.
///
/// `start` keeps the current baud rate and timeout for anything it does not
/// name. `stop` blocks until the reader loop has exited.
pub fn execute(
    reader: &SerialReader,
    command: ConsoleCommand,
    out: &mut impl Write,
) -> io::Result<Flow> {
    match command {
        ConsoleCommand::Start {
            port_name,
            baud_rate,
            timeout,
        } => {
            let current = reader.current_config();
            let config = ReaderConfig {
                port_name,
                baud_rate: baud_rate.unwrap_or(current.baud_rate),
                wait_timeout: timeout.unwrap_or(current.wait_timeout),
            };
            reader.start_reading(&config.port_name, config.baud_rate, Some(config.wait_timeout));
            writeln!(out, "# reading {}", config)?;
        }
        ConsoleCommand::Stop => {
            reader.stop_reading();
            writeln!(out, "# stopped")?;
        }
        ConsoleCommand::Ports => match reader.port_names() {
            Ok(names) if names.is_empty() => writeln!(out, "# no serial ports found")?,
            Ok(names) => {
                for name in names {
                    writeln!(out, "# {}", name)?;
                }
            }
            Err(e) => writeln!(out, "# {}", e)?,
        },
        ConsoleCommand::Bauds => {
            let rates: Vec<String> = reader.baud_rates().iter().map(|r| r.to_string()).collect();
            writeln!(out, "# {}", rates.join(" "))?;
        }
        ConsoleCommand::Status => {
            if reader.is_running() {
                writeln!(out, "# running: {}", reader.current_config())?;
            } else {
                writeln!(out, "# stopped")?;
            }
        }
        ConsoleCommand::Help => {
            for line in HELP.lines() {
                writeln!(out, "# {}", line)?;
            }
        }
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Read console lines from `source` on a dedicated thread.
///
/// A blocking read cannot be cancelled, so it stays off the runtime; the
/// thread is left behind when the console exits.
pub fn spawn_console_input<R>(source: R) -> io::Result<ConsoleInput>
where
    R: BufRead + Send + 'static,
{
    let (lines, input) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in source.lines() {
                let failed = line.is_err();
                if lines.send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(input)
}

/// Run the console until `quit`, end of input or `shutdown` resolves.
///
/// Needs a multi-threaded runtime: commands that wait on the reader thread
/// run in place on the current worker.
pub async fn run(
    reader: &SerialReader,
    mut events: EventReceiver,
    mut input: ConsoleInput,
    format: OutputFormat,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                let rendered = render_event(&event, format)?;
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", rendered)?;
                stdout.flush()?;
            }
            line = input.recv() => {
                let Some(line) = line else {
                    tracing::debug!("Console input closed");
                    break;
                };
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(command) => {
                        let flow = tokio::task::block_in_place(|| {
                            execute(reader, command, &mut io::stdout().lock())
                        })?;
                        if flow == Flow::Quit {
                            break;
                        }
                    }
                    Err(e) => writeln!(io::stdout(), "# {}", e)?,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}
