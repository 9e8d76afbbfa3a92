//! Rendering of reader events for stdout

use nmeaprint_core::ReaderEvent;
use nmeaprint_settings::OutputFormat;

/// Render one event as a line of output.
///
/// Plain output prints sentences verbatim (one per line, CR/LF stripped)
/// and status events as `#` comments, so the stream can be piped straight
/// into NMEA tools. JSON output emits one object per event.
pub fn render_event(event: &ReaderEvent, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(event),
        OutputFormat::Plain => Ok(match event {
            ReaderEvent::MessageReceived { text } => text
                .lines()
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            other => format!("# {}", other),
        }),
    }
}
