//! Reader loop
//!
//! The loop owns the open device for its whole life and is the only
//! producer of reader events. The controller and the loop share nothing
//! but [`Shared`]: the configuration, the quit flag and the running flag,
//! all behind one lock that is never held across device I/O.

use crate::communication::reader::EventSender;
use crate::communication::transport::{PortOpener, SerialLink};
use nmeaprint_core::{
    ReaderConfig, ReaderEvent, ReaderState, SerialError, MAX_MESSAGE_BYTES, QUIESCENCE_INTERVAL,
};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::io;
use std::sync::Arc;
use std::time::Instant;

/// State shared between a controller and its reader loop
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    /// Latest requested configuration
    pub(crate) config: ReaderConfig,
    /// Bumped on every start request, so a repeated identical request is
    /// still distinguishable from the one already applied
    pub(crate) generation: u64,
    /// Set by stop, cleared by start
    pub(crate) quit: bool,
    /// A loop thread exists and has not yet decided to exit
    pub(crate) running: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) state: Mutex<SharedState>,
    /// Signalled on every start/stop; only waited on while idle
    pub(crate) wake: Condvar,
}

/// Next phase of the loop, with whatever the phase needs
enum Step {
    Idle,
    Applying,
    Waiting,
    Draining,
    Reporting(ReaderEvent),
    Stopped,
}

impl Step {
    fn state(&self) -> ReaderState {
        match self {
            Step::Idle => ReaderState::Idle,
            Step::Applying => ReaderState::Applying,
            Step::Waiting => ReaderState::Waiting,
            Step::Draining => ReaderState::Draining,
            Step::Reporting(_) => ReaderState::Reporting,
            Step::Stopped => ReaderState::Stopped,
        }
    }
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
    opener: Arc<dyn PortOpener>,
    events: EventSender,
    /// Configuration the loop is acting on; only differs from the shared
    /// one while a change is pending
    applied: ReaderConfig,
    applied_generation: u64,
    link: Option<Box<dyn SerialLink>>,
    buffer: Vec<u8>,
}

impl Worker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        opener: Arc<dyn PortOpener>,
        events: EventSender,
    ) -> Self {
        Self {
            shared,
            opener,
            events,
            applied: ReaderConfig::default(),
            applied_generation: 0,
            link: None,
            buffer: Vec::new(),
        }
    }

    pub(crate) fn run(mut self) {
        let mut step = self.enter();
        loop {
            tracing::trace!(state = %step.state(), port = %self.applied.port_name, "reader loop");
            step = match step {
                Step::Idle => self.idle(),
                Step::Applying => self.apply(),
                Step::Waiting => self.wait(),
                Step::Draining => self.drain(),
                Step::Reporting(event) => self.report(event),
                Step::Stopped => break,
            };
        }
        self.close_link();
        tracing::debug!("Reader loop stopped");
    }

    fn enter(&mut self) -> Step {
        let shared = Arc::clone(&self.shared);
        let state = shared.state.lock();
        if state.quit {
            return Self::stop(state);
        }
        self.adopt(&state);
        drop(state);
        if self.applied.has_port() {
            Step::Applying
        } else {
            Step::Idle
        }
    }

    /// Nothing to open: park until a start or stop arrives, bounded by the
    /// timeout so the quit flag is still polled once per cycle.
    fn idle(&mut self) -> Step {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.state.lock();
        if !state.quit && state.generation == self.applied_generation {
            shared.wake.wait_for(&mut state, self.applied.wait_timeout);
        }
        self.checkpoint_locked(state)
    }

    fn apply(&mut self) -> Step {
        self.close_link();
        {
            let shared = Arc::clone(&self.shared);
            let state = shared.state.lock();
            if state.quit {
                return Self::stop(state);
            }
            if state.generation != self.applied_generation {
                self.adopt(&state);
            }
        }
        if !self.applied.has_port() {
            return Step::Idle;
        }

        match self.opener.open(&self.applied) {
            Ok(link) => {
                tracing::info!("Opened {}", self.applied);
                self.link = Some(link);
                // A request that came in while opening replaces this device
                // before any wait on it.
                self.checkpoint()
            }
            Err(error) => {
                tracing::warn!("Can't open {}: {}", self.applied.port_name, error);
                Step::Reporting(ReaderEvent::error(self.applied.port_name.clone(), error))
            }
        }
    }

    fn wait(&mut self) -> Step {
        let Some(link) = self.link.as_mut() else {
            return Step::Applying;
        };
        match link.wait_for_ready_read(self.applied.wait_timeout) {
            Ok(true) => Step::Draining,
            Ok(false) => Step::Reporting(ReaderEvent::timeout_now()),
            Err(err) => self.read_failed(&err),
        }
    }

    /// Collect a burst: keep reading while more bytes show up within the
    /// quiescence interval. A burst is cut at the message size cap, after
    /// one read timeout, or as soon as a stop is requested.
    fn drain(&mut self) -> Step {
        let Some(link) = self.link.as_mut() else {
            return Step::Applying;
        };
        self.buffer.clear();
        let started = Instant::now();
        loop {
            match link.read_all() {
                Ok(bytes) => self.buffer.extend_from_slice(&bytes),
                Err(err) => return self.read_failed(&err),
            }
            if self.buffer.len() >= MAX_MESSAGE_BYTES {
                tracing::debug!("Message reached {} bytes, flushing", self.buffer.len());
                break;
            }
            if started.elapsed() >= self.applied.wait_timeout {
                tracing::debug!("Burst longer than {:?}, flushing", self.applied.wait_timeout);
                break;
            }
            if self.shared.state.lock().quit {
                break;
            }
            match link.wait_for_ready_read(QUIESCENCE_INTERVAL) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(err) => return self.read_failed(&err),
            }
        }

        if self.buffer.is_empty() {
            return self.checkpoint();
        }
        Step::Reporting(ReaderEvent::message(&self.buffer))
    }

    fn report(&mut self, event: ReaderEvent) -> Step {
        let fatal = event.is_error();
        if self.events.send(event).is_err() {
            tracing::debug!("Event receiver dropped, event discarded");
        }
        if fatal {
            self.after_failure()
        } else {
            self.checkpoint()
        }
    }

    fn read_failed(&mut self, err: &io::Error) -> Step {
        tracing::warn!("Read failed on {}: {}", self.applied.port_name, err);
        Step::Reporting(ReaderEvent::error(
            self.applied.port_name.clone(),
            SerialError::from_read(err),
        ))
    }

    fn checkpoint(&mut self) -> Step {
        let shared = Arc::clone(&self.shared);
        let state = shared.state.lock();
        self.checkpoint_locked(state)
    }

    /// Compare the shared configuration with the applied one and pick the
    /// next phase. Quit wins over everything.
    fn checkpoint_locked(&mut self, state: MutexGuard<'_, SharedState>) -> Step {
        if state.quit {
            return Self::stop(state);
        }
        let reopen = self.link.is_none() || self.applied.requires_reopen(&state.config);
        if state.generation != self.applied_generation {
            if reopen {
                tracing::debug!("Reconfiguration pending: {}", state.config);
            }
            self.adopt(&state);
        }
        drop(state);

        if !self.applied.has_port() {
            self.close_link();
            Step::Idle
        } else if reopen {
            Step::Applying
        } else {
            Step::Waiting
        }
    }

    /// After a reported failure the loop ends, unless a start request came
    /// in after the failing configuration was taken; that request has no
    /// other loop to serve it.
    fn after_failure(&mut self) -> Step {
        self.close_link();
        let shared = Arc::clone(&self.shared);
        let state = shared.state.lock();
        if state.quit || state.generation == self.applied_generation {
            return Self::stop(state);
        }
        self.adopt(&state);
        drop(state);
        if self.applied.has_port() {
            Step::Applying
        } else {
            Step::Idle
        }
    }

    fn adopt(&mut self, state: &SharedState) {
        self.applied = state.config.clone();
        self.applied_generation = state.generation;
    }

    /// Mark the loop as exiting. Done under the lock so a concurrent start
    /// either sees the loop still running (and this loop serves it) or sees
    /// it gone (and spawns a new one).
    fn stop(mut state: MutexGuard<'_, SharedState>) -> Step {
        state.running = false;
        Step::Stopped
    }

    fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            match link.close() {
                Ok(()) => tracing::info!("Closed {}", link.port_name()),
                Err(e) => tracing::warn!("Failed to close {}: {}", link.port_name(), e),
            }
        }
    }
}
