//! Acquisition sessions.
//!
//! - [`config`]: the immutable [`SessionConfig`] built once per session.
//! - [`header`]: the metadata block written at the top of every log, and its parser.
//! - [`recorder`]: the timed capture loop and its state machine.
//! - [`handle`]: running a recorder in the background with single-session ownership.
//! - [`clock`]: monotonic time used for deadlines and progress.

pub mod clock;
pub mod config;
pub mod handle;
pub mod header;
pub mod recorder;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    log_path, Coordinates, SessionConfig, SessionConfigBuilder, StationCoordinates,
    COORDINATE_SENTINEL, LOG_EXTENSION,
};
pub use handle::{spawn_session, SessionHandle, SessionSlot, SessionToken};
pub use header::{write_header, LogHeader, HEADER_MARKER};
pub use recorder::{
    progress_percent, Recorder, SessionEvent, SessionReport, SessionState, StopHandle,
    Termination,
};
