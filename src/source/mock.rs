//! Scripted line source for testing
//!
//! Plays back a fixed list of [`ReadOutcome`]s without any hardware. Each read can advance a
//! [`ManualClock`] (deterministic sessions) or sleep for real (timing checks), standing in
//! for the time a real port spends blocked on its read timeout.
//!
//! # Example
//!
//! ```
//! use rssi_logger::source::{LineSource, MockLineSource, ReadOutcome};
//!
//! let mut source = MockLineSource::new(vec![ReadOutcome::Line("hello".into())]);
//! assert_eq!(source.read_line(), ReadOutcome::Line("hello".into()));
//! assert_eq!(source.read_line(), ReadOutcome::Timeout);
//! ```

use super::{LineSource, ReadOutcome, SourceOpener};
use crate::error::{AppResult, LoggerError};
use crate::session::ManualClock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Line source replaying scripted outcomes, then reporting timeouts forever.
pub struct MockLineSource {
    script: VecDeque<ReadOutcome>,
    cycle: bool,
    manual_step: Option<(ManualClock, Duration)>,
    sleep_per_read: Option<Duration>,
    reads: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MockLineSource {
    /// Replay `outcomes` once
    pub fn new(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        Self {
            script: outcomes.into_iter().collect(),
            cycle: false,
            manual_step: None,
            sleep_per_read: None,
            reads: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replay `outcomes` over and over (continuously available input)
    pub fn repeating(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        let mut source = Self::new(outcomes);
        source.cycle = true;
        source
    }

    /// Advance `clock` by `step` on every read
    pub fn advancing(mut self, clock: &ManualClock, step: Duration) -> Self {
        self.manual_step = Some((clock.clone(), step));
        self
    }

    /// Block for `duration` of real time on every read
    pub fn sleeping(mut self, duration: Duration) -> Self {
        self.sleep_per_read = Some(duration);
        self
    }

    /// Shared counter of reads performed, readable after the source moved into a session
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }

    /// Shared flag set once [`LineSource::close`] ran
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

impl LineSource for MockLineSource {
    fn read_line(&mut self) -> ReadOutcome {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(duration) = self.sleep_per_read {
            std::thread::sleep(duration);
        }
        if let Some((clock, step)) = &self.manual_step {
            clock.advance(*step);
        }

        match self.script.pop_front() {
            Some(outcome) => {
                if self.cycle {
                    self.script.push_back(outcome.clone());
                }
                outcome
            }
            None => ReadOutcome::Timeout,
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        format!("MockLineSource({} scripted outcomes)", self.script.len())
    }
}

/// Hands out a single prepared [`MockLineSource`], or refuses every port.
pub struct MockOpener {
    source: Mutex<Option<MockLineSource>>,
    unavailable: Option<String>,
    opened_ports: Arc<Mutex<Vec<String>>>,
}

impl MockOpener {
    /// Opener returning `source` on the first open
    pub fn new(source: MockLineSource) -> Self {
        Self {
            source: Mutex::new(Some(source)),
            unavailable: None,
            opened_ports: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Opener simulating an absent or busy device
    pub fn unavailable(reason: &str) -> Self {
        Self {
            source: Mutex::new(None),
            unavailable: Some(reason.to_string()),
            opened_ports: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Ports that were successfully opened, in order
    pub fn opened_ports(&self) -> Vec<String> {
        self.opened_ports
            .lock()
            .map(|ports| ports.clone())
            .unwrap_or_default()
    }
}

impl SourceOpener for MockOpener {
    fn open(&self, port: &str) -> AppResult<Box<dyn LineSource>> {
        let unavailable = |reason: &str| LoggerError::PortUnavailable {
            port: port.to_string(),
            reason: reason.to_string(),
        };

        if let Some(reason) = &self.unavailable {
            return Err(unavailable(reason));
        }

        let source = self
            .source
            .lock()
            .map_err(|_| unavailable("mock source lock poisoned"))?
            .take()
            .ok_or_else(|| unavailable("mock source already opened"))?;

        if let Ok(mut ports) = self.opened_ports.lock() {
            ports.push(port.to_string());
        }
        Ok(Box::new(source))
    }
}
