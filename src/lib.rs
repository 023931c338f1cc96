//! # LoRa RSSI Logger
//!
//! Records what a LoRa transceiver prints on its serial port for a fixed sampling time, and
//! summarises the RSSI readings found in the resulting logs.
//!
//! ## Crate Structure
//!
//! - **`session`**: timed acquisition. Builds a [`session::SessionConfig`], writes the log
//!   header, captures lines until the deadline and reports progress through events.
//! - **`source`**: line sources the recorder reads from: the serial port, a simulated
//!   transceiver and a scripted mock for tests.
//! - **`analysis`**: RSSI extraction and mean/standard deviation over a completed log.
//! - **`data`**: the cumulative `stats.csv` summary table.
//! - **`config`**: figment-based application configuration (TOML file + environment).
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: the crate-wide [`error::LoggerError`].

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod session;
pub mod source;
