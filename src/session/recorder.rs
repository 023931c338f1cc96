//! Timed acquisition session.
//!
//! The recorder drives one session through
//! `Idle → Opening → Running → Completed`, or `Opening → Failed`:
//!
//! - **Opening** validates the [`SessionConfig`], opens the line source and writes the log
//!   header. Any failure here ends in `Failed` and nothing is left on disk if the port could
//!   not be opened.
//! - **Running** reads lines until the sampling duration has elapsed or a stop is requested.
//!   Each received line is appended to the log and flushed immediately. Timeouts, decode
//!   errors and transient device errors are counted and otherwise ignored.
//! - **Completed** closes the source and the file and reports what was captured.
//!
//! The deadline is checked after every read, so a session lasts at least its configured
//! duration and overruns it by at most one read timeout.

use super::clock::Clock;
use super::config::SessionConfig;
use super::header::write_header;
use crate::error::AppResult;
use crate::source::{LineSource, ReadOutcome, SourceOpener};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Created, not started
    Idle,
    /// Validating, opening the device, writing the header
    Opening,
    /// Capturing lines
    Running,
    /// Finished normally (deadline or stop request)
    Completed,
    /// Could not start
    Failed,
}

/// Why a completed session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The sampling duration elapsed
    DeadlineReached,
    /// A stop was requested before the deadline
    Interrupted,
}

/// Summary of a completed session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    /// Log file written
    pub path: PathBuf,
    /// Local start time recorded in the header
    pub started_at: DateTime<Local>,
    /// Body lines appended to the log
    pub lines_written: usize,
    /// Reads that timed out without a complete line
    pub idle_reads: usize,
    /// Reads dropped because of decode or transient device errors
    pub dropped_reads: usize,
    /// Lines received but not persisted because the write failed
    pub write_failures: usize,
    /// Time spent in the running state
    pub elapsed: Duration,
    /// Why the session stopped
    pub termination: Termination,
}

/// Notifications for the presentation side, in emission order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    /// The recorder entered a new state
    StateChanged(SessionState),
    /// Elapsed share of the sampling duration, in percent `[0, 100]`
    Progress(f64),
    /// A line was received (shown even if writing it to the log failed)
    Line(String),
    /// The session completed; always the last event of a successful session
    Completed(SessionReport),
}

/// Cooperative stop request, honoured once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a handle with no stop requested
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the session to finish after the current iteration
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Elapsed share of `duration`, in percent and capped at 100.
pub fn progress_percent(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 100.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64() * 100.0).min(100.0)
}

#[derive(Debug, Default)]
struct Counters {
    lines_written: usize,
    idle_reads: usize,
    dropped_reads: usize,
    write_failures: usize,
}

/// Runs one acquisition session.
pub struct Recorder<C: Clock> {
    config: SessionConfig,
    clock: C,
    state: SessionState,
    events: Option<UnboundedSender<SessionEvent>>,
    stop: StopHandle,
}

impl<C: Clock> Recorder<C> {
    /// Create an idle recorder for `config`
    pub fn new(config: SessionConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            state: SessionState::Idle,
            events: None,
            stop: StopHandle::new(),
        }
    }

    /// Send progress, line and state events to `events`
    pub fn with_events(mut self, events: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Use an existing stop handle
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle that stops this recorder once it is running
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The session's configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the session to completion on the calling thread.
    ///
    /// Blocks for the whole sampling duration. Only failures while opening are returned as
    /// errors; once running, the session always completes.
    pub fn run(&mut self, opener: &dyn SourceOpener) -> AppResult<SessionReport> {
        self.transition(SessionState::Opening);

        let (mut source, mut file, started_at) = match self.open(opener) {
            Ok(opened) => opened,
            Err(e) => {
                error!(port = %self.config.port(), "Session failed to start: {}", e);
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };
        let start = self.clock.now();

        info!(
            source = %source.describe(),
            path = %self.config.log_path().display(),
            duration_secs = self.config.duration_secs(),
            "Session started"
        );
        self.transition(SessionState::Running);
        self.emit(SessionEvent::Progress(0.0));

        let (counters, elapsed, termination) = self.capture(source.as_mut(), &mut file, start);

        source.close();
        drop(file);

        let report = SessionReport {
            path: self.config.log_path(),
            started_at,
            lines_written: counters.lines_written,
            idle_reads: counters.idle_reads,
            dropped_reads: counters.dropped_reads,
            write_failures: counters.write_failures,
            elapsed,
            termination,
        };

        info!(
            lines = report.lines_written,
            dropped = report.dropped_reads,
            elapsed_ms = report.elapsed.as_millis() as u64,
            termination = ?report.termination,
            "Log completed"
        );
        self.emit(SessionEvent::Progress(0.0));
        self.transition(SessionState::Completed);
        self.emit(SessionEvent::Completed(report.clone()));
        Ok(report)
    }

    fn open(
        &self,
        opener: &dyn SourceOpener,
    ) -> AppResult<(Box<dyn LineSource>, File, DateTime<Local>)> {
        self.config.validate()?;

        // The device is opened first so an unreachable port leaves no file behind.
        let mut source = opener.open(self.config.port())?;

        let prepared = self.prepare_log();
        match prepared {
            Ok((file, started_at)) => Ok((source, file, started_at)),
            Err(e) => {
                source.close();
                Err(e)
            }
        }
    }

    fn prepare_log(&self) -> AppResult<(File, DateTime<Local>)> {
        let dir = self.config.output_dir();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.config.log_path())?;

        let started_at = Local::now();
        write_header(
            &mut file,
            self.config.coordinates(),
            &started_at,
            self.config.duration_secs(),
        )?;
        file.flush()?;
        Ok((file, started_at))
    }

    fn capture<W: Write>(
        &self,
        source: &mut dyn LineSource,
        out: &mut W,
        start: Duration,
    ) -> (Counters, Duration, Termination) {
        let duration = self.config.duration();
        let mut counters = Counters::default();

        loop {
            match source.read_line() {
                ReadOutcome::Line(line) => {
                    match append_line(out, &line) {
                        Ok(()) => counters.lines_written += 1,
                        Err(e) => {
                            counters.write_failures += 1;
                            warn!("Failed to persist captured line: {}", e);
                        }
                    }
                    // Shown live whether or not it reached the disk.
                    self.emit(SessionEvent::Line(line));
                }
                ReadOutcome::Timeout => counters.idle_reads += 1,
                ReadOutcome::DecodeError(bytes) => {
                    counters.dropped_reads += 1;
                    debug!(len = bytes.len(), "Dropped line that is not valid UTF-8");
                }
                ReadOutcome::Transient(reason) => {
                    counters.dropped_reads += 1;
                    debug!("Transient read error: {}", reason);
                }
            }

            let elapsed = self.clock.now().saturating_sub(start);
            self.emit(SessionEvent::Progress(progress_percent(elapsed, duration)));

            if elapsed >= duration {
                return (counters, elapsed, Termination::DeadlineReached);
            }
            if self.stop.is_requested() {
                info!("Stop requested, ending session early");
                return (counters, elapsed, Termination::Interrupted);
            }
        }
    }

    fn transition(&mut self, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "Session state change");
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // A closed receiver only means nobody is watching; capture continues.
            let _ = events.send(event);
        }
    }
}

fn append_line<W: Write>(out: &mut W, line: &str) -> std::io::Result<()> {
    writeln!(out, "{}", line)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoggerError;
    use crate::session::clock::{Clock, ManualClock};
    use crate::source::{MockLineSource, MockOpener};
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn config_in(dir: &std::path::Path, secs: u32) -> SessionConfig {
        SessionConfig::builder("COM3", "unit")
            .duration_secs(secs)
            .output_dir(dir)
            .build()
    }

    #[test]
    fn progress_is_capped() {
        let duration = Duration::from_secs(10);
        assert_eq!(progress_percent(Duration::ZERO, duration), 0.0);
        assert_eq!(progress_percent(Duration::from_secs(5), duration), 50.0);
        assert_eq!(progress_percent(Duration::from_millis(10_100), duration), 100.0);
    }

    #[test]
    fn deadline_reached_with_manual_clock() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new();
        let source = MockLineSource::repeating(vec![ReadOutcome::Line("ping".into())])
            .advancing(&clock, Duration::from_millis(100));
        let closed = source.closed_flag();

        let mut recorder = Recorder::new(config_in(dir.path(), 2), clock.clone());
        let report = recorder.run(&MockOpener::new(source)).unwrap();

        assert_eq!(recorder.state(), SessionState::Completed);
        assert_eq!(report.termination, Termination::DeadlineReached);
        assert_eq!(report.lines_written, 20);
        assert_eq!(report.elapsed, Duration::from_secs(2));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn bad_reads_never_end_the_session() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new();
        let source = MockLineSource::repeating(vec![
            ReadOutcome::DecodeError(vec![0xc3, 0x28]),
            ReadOutcome::Transient("framing error".into()),
            ReadOutcome::Timeout,
            ReadOutcome::Line("ok".into()),
        ])
        .advancing(&clock, Duration::from_millis(250));

        let mut recorder = Recorder::new(config_in(dir.path(), 1), clock);
        let report = recorder.run(&MockOpener::new(source)).unwrap();

        assert_eq!(report.lines_written, 1);
        assert_eq!(report.dropped_reads, 2);
        assert_eq!(report.idle_reads, 1);
        assert_eq!(report.termination, Termination::DeadlineReached);
    }

    #[test]
    fn invalid_config_touches_nothing() {
        let dir = tempdir().unwrap();
        let config = SessionConfig::builder("COM3", "")
            .output_dir(dir.path())
            .build();
        let opener = MockOpener::new(MockLineSource::new(vec![]));

        let mut recorder = Recorder::new(config, ManualClock::new());
        let result = recorder.run(&opener);

        assert!(matches!(result, Err(LoggerError::InvalidConfig(_))));
        assert_eq!(recorder.state(), SessionState::Failed);
        assert!(opener.opened_ports().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn stop_request_is_a_normal_completion() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new();
        let source = MockLineSource::repeating(vec![ReadOutcome::Line("x".into())])
            .advancing(&clock, Duration::from_millis(100));

        let mut recorder = Recorder::new(config_in(dir.path(), 30), clock);
        recorder.stop_handle().request_stop();
        let report = recorder.run(&MockOpener::new(source)).unwrap();

        assert_eq!(recorder.state(), SessionState::Completed);
        assert_eq!(report.termination, Termination::Interrupted);
        assert_eq!(report.lines_written, 1);
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unwritable_line_is_still_shown() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new();
        let mut source = MockLineSource::new(vec![ReadOutcome::Line("lost".into())])
            .advancing(&clock, Duration::from_secs(1));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let recorder = Recorder::new(config_in(dir.path(), 1), clock.clone()).with_events(tx);
        let (counters, _, termination) = recorder.capture(&mut source, &mut FullDisk, clock.now());

        assert_eq!(termination, Termination::DeadlineReached);
        assert_eq!(counters.write_failures, 1);
        assert_eq!(counters.lines_written, 0);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Line("lost".into()));
    }

    #[test]
    fn events_follow_the_state_machine() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new();
        let source = MockLineSource::new(vec![
            ReadOutcome::Line("first".into()),
            ReadOutcome::Timeout,
        ])
        .advancing(&clock, Duration::from_millis(500));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut recorder = Recorder::new(config_in(dir.path(), 1), clock).with_events(tx);
        recorder.run(&MockOpener::new(source)).unwrap();
        drop(recorder);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(
            &events[..3],
            &[
                SessionEvent::StateChanged(SessionState::Opening),
                SessionEvent::StateChanged(SessionState::Running),
                SessionEvent::Progress(0.0),
            ]
        );
        assert_eq!(events[3], SessionEvent::Line("first".into()));
        assert_eq!(events[4], SessionEvent::Progress(50.0));
        assert_eq!(events[5], SessionEvent::Progress(100.0));
        assert_eq!(events[6], SessionEvent::Progress(0.0));
        assert_eq!(events[7], SessionEvent::StateChanged(SessionState::Completed));
        assert!(matches!(events[8], SessionEvent::Completed(_)));
        assert_eq!(events.len(), 9);
    }
}
