//! Background acquisition with a single active session.
//!
//! [`spawn_session`] moves a [`Recorder`] onto Tokio's blocking pool and hands back a
//! [`SessionHandle`]. The presentation task drains [`SessionEvent`]s from the handle while the
//! recorder blocks on the device, so neither side has to yield manually.
//!
//! A [`SessionSlot`] grants at most one [`SessionToken`] at a time. The token travels with
//! the recorder and frees the slot when the session ends, however it ends.

use super::clock::Clock;
use super::config::SessionConfig;
use super::recorder::{Recorder, SessionEvent, SessionReport, StopHandle};
use crate::error::{AppResult, LoggerError};
use crate::source::SourceOpener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// Grants exclusive ownership of the acquisition pipeline.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    active: Arc<AtomicBool>,
}

impl SessionSlot {
    /// Create a free slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot, or fail with [`LoggerError::SessionBusy`] if a session holds it.
    pub fn try_acquire(&self) -> AppResult<SessionToken> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LoggerError::SessionBusy)?;
        Ok(SessionToken {
            active: self.active.clone(),
        })
    }

    /// Whether a session currently holds the slot
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Proof of slot ownership; releases the slot on drop.
#[derive(Debug)]
pub struct SessionToken {
    active: Arc<AtomicBool>,
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Running session as seen from the presentation task.
pub struct SessionHandle {
    events: UnboundedReceiver<SessionEvent>,
    stop: StopHandle,
    task: JoinHandle<AppResult<SessionReport>>,
}

impl SessionHandle {
    /// Next event, or `None` once the recorder has finished and every event was received.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Ask the session to finish early; it completes normally at the next iteration.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Clone of the stop handle, e.g. for a Ctrl+C handler
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the recorder to finish and return its outcome.
    pub async fn wait(self) -> AppResult<SessionReport> {
        self.task.await?
    }
}

/// Start `config` on a blocking task.
///
/// Fails with [`LoggerError::SessionBusy`] without touching the device when `slot` is taken.
/// Must be called from within a Tokio runtime.
pub fn spawn_session<C, O>(
    slot: &SessionSlot,
    config: SessionConfig,
    opener: O,
    clock: C,
) -> AppResult<SessionHandle>
where
    C: Clock + 'static,
    O: SourceOpener + 'static,
{
    let token = slot.try_acquire()?;
    let (tx, rx) = mpsc::unbounded_channel();
    let stop = StopHandle::new();
    let mut recorder = Recorder::new(config, clock)
        .with_events(tx)
        .with_stop_handle(stop.clone());

    let task = tokio::task::spawn_blocking(move || {
        let _token = token;
        recorder.run(&opener)
    });

    Ok(SessionHandle {
        events: rx,
        stop,
        task,
    })
}
