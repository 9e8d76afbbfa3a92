use anyhow::Context;
use clap::Parser;
use nmeaprint::{app, init_logging, BaudRate, OutputFormat, SerialReader, Settings};
use nmeaprint_communication::{baud_rates, list_ports};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Print NMEA 0183 sentences from a serial GNSS receiver.
///
/// While running, type `help` for commands that switch port, baud rate or
/// timeout without restarting.
#[derive(Parser, Debug)]
#[command(name = "nmeaprint", version)]
struct Cli {
    /// Serial device to read (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<BaudRate>,

    /// Read timeout in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Emit one JSON object per event
    #[arg(long)]
    json: bool,

    /// List serial ports and supported baud rates, then exit
    #[arg(short, long)]
    list: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save: bool,
}

impl Cli {
    /// Layer command-line flags over loaded settings
    fn apply(&self, settings: &mut Settings) -> anyhow::Result<()> {
        if let Some(port) = &self.port {
            settings.port_name = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        if self.json {
            settings.output = OutputFormat::Json;
        }
        settings.validate()?;
        Ok(())
    }
}

fn print_ports() -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}\t{}", port.port_name, port.description);
    }
    let rates: Vec<String> = baud_rates().iter().map(|r| r.to_string()).collect();
    println!("Baud rates: {}", rates.join(" "));
    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings_path = match &cli.config {
        Some(path) => path.clone(),
        None => Settings::default_path()?,
    };
    let mut settings = Settings::load_or_default(&settings_path)
        .with_context(|| format!("loading {}", settings_path.display()))?;
    cli.apply(&mut settings)?;

    init_logging(&settings.log_level)?;
    tracing::info!(
        "NmeaPrint {} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_DATE")
    );

    if cli.list {
        return print_ports();
    }
    if cli.save {
        settings.save_to_file(&settings_path)?;
        tracing::info!("Settings saved to {}", settings_path.display());
    }

    let (reader, events) = SerialReader::system();
    let reader = Arc::new(reader);

    if settings.port_name.is_empty() {
        eprintln!("No port selected; type `start <port> [baud]` or `help`");
    } else {
        reader.start_reading(
            &settings.port_name,
            settings.baud_rate,
            Some(settings.reader_timeout()),
        );
    }

    let input = app::spawn_console_input(io::BufReader::new(io::stdin()))?;
    app::run(&reader, events, input, settings.output, interrupted()).await?;

    let stopping = Arc::clone(&reader);
    tokio::task::spawn_blocking(move || stopping.stop_reading()).await?;
    Ok(())
}
