//! Simulated LoRa transceiver.
//!
//! Emits the same text the field firmware prints, once per interval, with RSSI values drawn
//! around a configurable centre. Used by `record --simulate` to rehearse a session without
//! hardware attached.

use super::serial::READ_TIMEOUT;
use super::{LineSource, ReadOutcome, SourceOpener};
use crate::analysis::{RECEIVED_MARKER, SENT_MARKER};
use crate::error::AppResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Line source producing synthetic RSSI reports in real time.
pub struct SimulatedTransceiver {
    rng: StdRng,
    interval: Duration,
    rssi_center: i32,
    rssi_spread: i32,
    sent_every: Option<u32>,
    emitted: u32,
    next_emit: Instant,
}

impl SimulatedTransceiver {
    /// One "received" report per second around -60 dBm.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            interval: Duration::from_secs(1),
            rssi_center: -60,
            rssi_spread: 8,
            sent_every: None,
            emitted: 0,
            next_emit: Instant::now() + Duration::from_secs(1),
        }
    }

    /// Use a fixed seed for reproducible values
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Set the time between reports
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self.next_emit = Instant::now() + interval;
        self
    }

    /// Set the RSSI centre and the half-width of the uniform spread around it
    pub fn with_rssi(mut self, center: i32, spread: i32) -> Self {
        self.rssi_center = center;
        self.rssi_spread = spread.abs();
        self
    }

    /// Report every `n`-th message as sent by the local node instead of received
    pub fn with_sent_every(mut self, n: u32) -> Self {
        self.sent_every = (n > 0).then_some(n);
        self
    }

    fn next_report(&mut self) -> String {
        self.emitted += 1;
        let rssi = self
            .rng
            .gen_range(self.rssi_center - self.rssi_spread..=self.rssi_center + self.rssi_spread);
        let marker = match self.sent_every {
            Some(n) if self.emitted % n == 0 => SENT_MARKER,
            _ => RECEIVED_MARKER,
        };
        format!("{marker}{rssi}")
    }
}

impl Default for SimulatedTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for SimulatedTransceiver {
    fn read_line(&mut self) -> ReadOutcome {
        let now = Instant::now();
        if now < self.next_emit {
            let wait = (self.next_emit - now).min(READ_TIMEOUT);
            std::thread::sleep(wait);
            if Instant::now() < self.next_emit {
                return ReadOutcome::Timeout;
            }
        }

        self.next_emit += self.interval;
        ReadOutcome::Line(self.next_report())
    }

    fn describe(&self) -> String {
        format!(
            "SimulatedTransceiver(every {:?}, {}±{} dBm)",
            self.interval, self.rssi_center, self.rssi_spread
        )
    }
}

/// Opens a fresh [`SimulatedTransceiver`] regardless of the port name.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOpener {
    seed: Option<u64>,
}

impl SimulatedOpener {
    /// Create an opener with default transceiver settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every transceiver this opener creates
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl SourceOpener for SimulatedOpener {
    fn open(&self, _port: &str) -> AppResult<Box<dyn LineSource>> {
        let mut transceiver = SimulatedTransceiver::new().with_sent_every(5);
        if let Some(seed) = self.seed {
            transceiver = transceiver.with_seed(seed);
        }
        Ok(Box::new(transceiver))
    }
}
