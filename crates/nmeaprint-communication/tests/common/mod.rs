//! In-memory serial line for driving the reader without hardware.
//!
//! Bytes are scheduled to "arrive" at an instant; the fake link's timed wait
//! behaves like a real port, so quiescence and timeout behaviour can be
//! exercised with real clocks.

#![allow(dead_code)]

use nmeaprint_communication::{EventReceiver, PortOpener, SerialLink};
use nmeaprint_core::{ReaderConfig, ReaderEvent, SerialError, SerialErrorCode};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct LineState {
    scheduled: VecDeque<(Instant, Vec<u8>)>,
    arrived: Vec<u8>,
    broken: bool,
}

impl LineState {
    fn deliver_due(&mut self, now: Instant) {
        while let Some((at, _)) = self.scheduled.front() {
            if *at > now {
                break;
            }
            if let Some((_, bytes)) = self.scheduled.pop_front() {
                self.arrived.extend_from_slice(&bytes);
            }
        }
    }
}

/// The wire every link opened by a [`FakeOpener`] reads from
#[derive(Default)]
pub struct FakeLine {
    state: Mutex<LineState>,
    changed: Condvar,
}

impl FakeLine {
    /// Bytes arriving now
    pub fn feed(&self, bytes: &[u8]) {
        self.feed_after(Duration::ZERO, bytes);
    }

    /// Bytes arriving `delay` from now
    pub fn feed_after(&self, delay: Duration, bytes: &[u8]) {
        let mut state = self.state.lock();
        let at = Instant::now() + delay;
        let index = state
            .scheduled
            .iter()
            .position(|(when, _)| *when > at)
            .unwrap_or(state.scheduled.len());
        state.scheduled.insert(index, (at, bytes.to_vec()));
        self.changed.notify_all();
    }

    /// Make every further wait or read fail as if the device was unplugged
    pub fn break_line(&self) {
        self.state.lock().broken = true;
        self.changed.notify_all();
    }
}

struct FakeLink {
    port_name: String,
    line: Arc<FakeLine>,
    closes: Arc<Mutex<Vec<String>>>,
    open: bool,
}

impl FakeLink {
    fn check(&self, broken: bool) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        if broken {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        Ok(())
    }
}

impl SerialLink for FakeLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn wait_for_ready_read(&mut self, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.line.state.lock();
        loop {
            self.check(state.broken)?;
            let now = Instant::now();
            state.deliver_due(now);
            if !state.arrived.is_empty() {
                return Ok(true);
            }
            if now >= deadline {
                return Ok(false);
            }
            let wake_at = state
                .scheduled
                .front()
                .map(|(at, _)| (*at).min(deadline))
                .unwrap_or(deadline);
            self.line.changed.wait_until(&mut state, wake_at);
        }
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut state = self.line.state.lock();
        self.check(state.broken)?;
        state.deliver_due(Instant::now());
        Ok(std::mem::take(&mut state.arrived))
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        self.closes.lock().push(self.port_name.clone());
        Ok(())
    }
}

/// Records every open and close; ports listed in `missing` fail to open.
/// An open of the gated port blocks until [`FakeOpener::release`].
#[derive(Default)]
pub struct FakeOpener {
    pub line: Arc<FakeLine>,
    opens: Mutex<Vec<ReaderConfig>>,
    closes: Arc<Mutex<Vec<String>>>,
    missing: Mutex<HashSet<String>>,
    gated: Mutex<Option<String>>,
    gate_open: Condvar,
}

impl FakeOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_missing(ports: &[&str]) -> Arc<Self> {
        let opener = Self::default();
        opener
            .missing
            .lock()
            .extend(ports.iter().map(|p| p.to_string()));
        Arc::new(opener)
    }

    pub fn with_gate(port: &str) -> Arc<Self> {
        let opener = Self::default();
        *opener.gated.lock() = Some(port.to_string());
        Arc::new(opener)
    }

    /// Let a blocked open of the gated port return
    pub fn release(&self) {
        *self.gated.lock() = None;
        self.gate_open.notify_all();
    }

    /// Every configuration an open was attempted with, in order
    pub fn opens(&self) -> Vec<ReaderConfig> {
        self.opens.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    /// Ports closed, in order
    pub fn closes(&self) -> Vec<String> {
        self.closes.lock().clone()
    }
}

impl PortOpener for FakeOpener {
    fn open(&self, config: &ReaderConfig) -> Result<Box<dyn SerialLink>, SerialError> {
        self.opens.lock().push(config.clone());
        let mut gated = self.gated.lock();
        while gated.as_deref() == Some(config.port_name.as_str()) {
            self.gate_open.wait(&mut gated);
        }
        drop(gated);
        if self.missing.lock().contains(&config.port_name) {
            return Err(SerialError::new(
                SerialErrorCode::DeviceNotFound,
                format!("{}: no such device", config.port_name),
            ));
        }
        Ok(Box::new(FakeLink {
            port_name: config.port_name.clone(),
            line: Arc::clone(&self.line),
            closes: Arc::clone(&self.closes),
            open: true,
        }))
    }
}

/// Poll `condition` until it holds or `within` elapses
pub fn eventually(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Next event, or `None` if nothing arrives within `within`
pub async fn next_event(events: &mut EventReceiver, within: Duration) -> Option<ReaderEvent> {
    tokio::time::timeout(within, events.recv())
        .await
        .ok()
        .flatten()
}

/// Wait for the next message event, skipping timeouts
pub async fn next_message(events: &mut EventReceiver, within: Duration) -> Option<String> {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match next_event(events, remaining).await? {
            ReaderEvent::MessageReceived { text } => return Some(text),
            ReaderEvent::TimeoutOccurred { .. } => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }
}
