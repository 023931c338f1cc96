//! Custom error types for the logger.
//!
//! This module defines `LoggerError`, the single error type returned by every fallible
//! operation in the library. Using the `thiserror` crate, it keeps the error taxonomy of the
//! acquisition session and the statistics pass in one place.
//!
//! ## Error Hierarchy
//!
//! - **`InvalidConfig`**: the caller supplied an empty file name, an empty port or a zero
//!   sampling duration. Raised before any file is created.
//! - **`PortUnavailable`**: the serial device could not be opened. Raised before any file is
//!   created.
//! - **`LogNotFound`**: statistics were requested for a log that does not exist on disk.
//! - **`SessionBusy`**: another acquisition session currently holds the session slot.
//! - **`SerialFeatureDisabled`**: serial hardware was requested in a build without the
//!   `instrument_serial` feature.
//! - **`Io`**, **`Csv`**, **`Config`**: wrapped errors from the standard library, the `csv`
//!   crate and `figment`.
//!
//! Single bad lines during a session and unparseable samples during extraction are never
//! errors: see [`crate::source::ReadOutcome`] and [`crate::analysis::MalformedSample`].

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type AppResult<T> = std::result::Result<T, LoggerError>;

/// Errors surfaced to the caller at the boundary of a session or a statistics pass.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serial port '{port}' not accessible: {reason}")]
    PortUnavailable { port: String, reason: String },

    #[error("Log file '{}' does not exist", .0.display())]
    LogNotFound(PathBuf),

    #[error("An acquisition session is already running")]
    SessionBusy,

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    #[error("Acquisition task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Summary table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for LoggerError {
    fn from(value: figment::Error) -> Self {
        LoggerError::Config(Box::new(value))
    }
}

impl From<tokio::task::JoinError> for LoggerError {
    fn from(value: tokio::task::JoinError) -> Self {
        LoggerError::Task(value.to_string())
    }
}

impl LoggerError {
    /// Whether the caller can fix the condition and simply try again.
    ///
    /// Configuration mistakes, an unplugged device, a missing log or a busy slot are all
    /// recoverable by a new caller-initiated attempt; I/O and build problems are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidConfig(_)
                | LoggerError::PortUnavailable { .. }
                | LoggerError::LogNotFound(_)
                | LoggerError::SessionBusy
        )
    }
}
