//! Reconfigurable serial reader
//!
//! [`SerialReader`] is the thread-safe surface callers use to start, stop
//! and re-point the background reader loop. It owns no I/O itself: start
//! writes the requested configuration into shared state and makes sure a
//! loop is running; the loop picks the change up at its next checkpoint.
//!
//! Events flow back on an unbounded channel, so the loop never waits on a
//! slow consumer and the consumer decides which thread handles them.

use crate::communication::serial::{self, SystemPortOpener};
use crate::communication::transport::PortOpener;
use crate::communication::worker::{Shared, Worker};
use nmeaprint_core::{
    BaudRate, ReaderConfig, ReaderEvent, SerialError, SerialErrorCode, DEFAULT_WAIT_TIMEOUT,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

/// Sending half of the reader event channel
pub type EventSender = mpsc::UnboundedSender<ReaderEvent>;

/// Receiving half of the reader event channel
///
/// Use `recv().await` from async code or `blocking_recv()` from a plain
/// thread.
pub type EventReceiver = mpsc::UnboundedReceiver<ReaderEvent>;

/// Controller for one background reader loop
pub struct SerialReader {
    shared: Arc<Shared>,
    opener: Arc<dyn PortOpener>,
    events: EventSender,
    /// Handle of the current (or last) loop thread. Start and stop hold this
    /// lock for their whole duration so they never interleave.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerialReader {
    /// Create a reader that opens devices through `opener`
    pub fn new(opener: Arc<dyn PortOpener>) -> (Self, EventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let reader = Self {
            shared: Arc::new(Shared::default()),
            opener,
            events,
            worker: Mutex::new(None),
        };
        (reader, receiver)
    }

    /// Create a reader for the system's serial ports
    pub fn system() -> (Self, EventReceiver) {
        Self::new(Arc::new(SystemPortOpener))
    }

    /// Point the reader at `port_name` and make sure the loop is running.
    ///
    /// Starting is idempotent: with a loop already alive this only replaces
    /// the configuration, which the loop applies within one cycle. Open
    /// failures are reported through the event channel, never from here.
    /// `None` (or a zero timeout) uses [`DEFAULT_WAIT_TIMEOUT`].
    pub fn start_reading(
        &self,
        port_name: &str,
        baud_rate: BaudRate,
        wait_timeout: Option<Duration>,
    ) {
        let wait_timeout = match wait_timeout {
            Some(timeout) if timeout.is_zero() => {
                tracing::warn!("Ignoring zero read timeout, using the default");
                DEFAULT_WAIT_TIMEOUT
            }
            Some(timeout) => timeout,
            None => DEFAULT_WAIT_TIMEOUT,
        };

        let mut worker = self.worker.lock();
        let spawn = {
            let mut state = self.shared.state.lock();
            state.quit = false;
            state.config = ReaderConfig {
                port_name: port_name.to_string(),
                baud_rate,
                wait_timeout,
            };
            state.generation = state.generation.wrapping_add(1);
            let spawn = !state.running;
            state.running = true;
            spawn
        };
        self.shared.wake.notify_all();

        if !spawn {
            tracing::debug!("Reader running, configuration updated");
            return;
        }

        // A previous loop has already decided to exit; let it finish closing
        // its device before a new one opens.
        if let Some(previous) = worker.take() {
            join_worker(previous);
        }

        let shared = Arc::clone(&self.shared);
        let opener = Arc::clone(&self.opener);
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("nmea-reader".to_string())
            .spawn(move || Worker::new(shared, opener, events).run());

        match spawned {
            Ok(handle) => {
                tracing::debug!("Reader loop spawned for {}", port_name);
                *worker = Some(handle);
            }
            Err(e) => {
                tracing::error!("Failed to spawn reader thread: {}", e);
                self.shared.state.lock().running = false;
                let error = SerialError::new(SerialErrorCode::Resource, e.to_string());
                let _ = self.events.send(ReaderEvent::error(port_name, error));
            }
        }
    }

    /// Ask the loop to quit and wait until it has closed its device.
    ///
    /// Returns immediately when no loop is running. Latency is bounded by
    /// one read cycle: the current timeout plus the drain of a burst.
    pub fn stop_reading(&self) {
        let mut worker = self.worker.lock();
        self.shared.state.lock().quit = true;
        self.shared.wake.notify_all();

        if let Some(handle) = worker.take() {
            join_worker(handle);
        }
    }

    /// Entry point for UI "connect" actions
    pub fn start_slot(&self, device: &str, baud_rate: BaudRate) {
        tracing::debug!("SerialReader::start_slot: {} Baudrate: {}", device, baud_rate);
        self.start_reading(device, baud_rate, None);
    }

    /// Entry point for UI "disconnect" actions
    pub fn stop_slot(&self) {
        tracing::debug!("SerialReader::stop_slot");
        self.stop_reading();
    }

    /// Whether a loop is alive and has not decided to exit
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// The most recently requested configuration
    pub fn current_config(&self) -> ReaderConfig {
        self.shared.state.lock().config.clone()
    }

    /// Names of the serial ports currently present
    pub fn port_names(&self) -> Result<Vec<String>, SerialError> {
        Ok(serial::list_ports()?
            .into_iter()
            .map(|port| port.port_name)
            .collect())
    }

    /// Baud rates the reader accepts
    pub fn baud_rates(&self) -> &'static [BaudRate] {
        serial::baud_rates()
    }
}

impl Drop for SerialReader {
    fn drop(&mut self) {
        self.stop_reading();
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("Reader loop panicked");
    }
}
