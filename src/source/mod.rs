//! Line sources feeding an acquisition session.
//!
//! A [`LineSource`] turns a byte stream into decoded text lines, one bounded-time read at a
//! time. Every read produces a [`ReadOutcome`]; only [`ReadOutcome::Line`] carries data, the
//! other variants all mean "no line this time" and never end a session.
//!
//! Sources are created through a [`SourceOpener`] so the recorder does not care whether it is
//! talking to a real transceiver ([`serial`]), the built-in simulator ([`simulated`]) or a
//! scripted test double ([`mock`]).

use crate::error::AppResult;

pub mod mock;
pub mod serial;
pub mod simulated;

pub use mock::{MockLineSource, MockOpener};
pub use serial::{list_ports, PortEntry, SerialLineSource, SerialOpener};
pub use simulated::{SimulatedOpener, SimulatedTransceiver};

/// Longest run of bytes kept while waiting for a line terminator.
///
/// A device that never sends `\n` would otherwise grow the buffer without bound; once the
/// limit is hit the pending bytes are released as one line.
pub const MAX_LINE_BYTES: usize = 4096;

/// Result of a single bounded-time read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete, decoded line without its terminator.
    Line(String),
    /// No complete line arrived within the read timeout.
    Timeout,
    /// A complete line arrived but was not valid UTF-8.
    DecodeError(Vec<u8>),
    /// The device reported a read error that does not close the port.
    Transient(String),
}

impl ReadOutcome {
    /// The decoded line, if this outcome carries one.
    pub fn line(&self) -> Option<&str> {
        match self {
            ReadOutcome::Line(line) => Some(line),
            _ => None,
        }
    }
}

/// A stream of text lines with a short per-read timeout.
pub trait LineSource: Send {
    /// Block for at most one read timeout and report what arrived.
    fn read_line(&mut self) -> ReadOutcome;

    /// Release the underlying device. Called exactly once when a session ends.
    fn close(&mut self) {}

    /// Human-readable description used in traces.
    fn describe(&self) -> String;
}

/// Opens line sources by port identifier.
pub trait SourceOpener: Send + Sync {
    /// Open `port`, failing with [`crate::error::LoggerError::PortUnavailable`] when the
    /// device cannot be reached.
    fn open(&self, port: &str) -> AppResult<Box<dyn LineSource>>;
}

/// Reassembles lines from arbitrarily split chunks of bytes.
///
/// Bytes without a terminating `\n` stay pending until a later chunk completes them. A
/// trailing `\r` is stripped and blank lines are skipped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Number of bytes waiting for a terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any partial line.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Take the next complete line, if one is buffered.
    ///
    /// Returns `ReadOutcome::Line` or `ReadOutcome::DecodeError`; `None` means more bytes
    /// are needed.
    pub fn next_line(&mut self) -> Option<ReadOutcome> {
        loop {
            let end = match self.pending.iter().position(|&b| b == b'\n') {
                Some(pos) => pos + 1,
                None if self.pending.len() >= MAX_LINE_BYTES => self.pending.len(),
                None => return None,
            };

            let mut raw: Vec<u8> = self.pending.drain(..end).collect();
            while matches!(raw.last(), Some(b'\n' | b'\r')) {
                raw.pop();
            }
            if raw.is_empty() {
                continue;
            }

            return Some(match String::from_utf8(raw) {
                Ok(line) => ReadOutcome::Line(line),
                Err(e) => ReadOutcome::DecodeError(e.into_bytes()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_split_line() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"Mensagem recebida: Hello im ");
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.pending_len(), 28);

        buffer.push(b"random sender. RSSI: -42\r\nMens");
        assert_eq!(
            buffer.next_line(),
            Some(ReadOutcome::Line(
                "Mensagem recebida: Hello im random sender. RSSI: -42".to_string()
            ))
        );
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.pending_len(), 4);
    }

    #[test]
    fn yields_every_buffered_line_in_order() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"first\nsecond\r\n\r\nthird\n");
        assert_eq!(buffer.next_line().as_ref().and_then(|o| o.line()), Some("first"));
        assert_eq!(buffer.next_line().as_ref().and_then(|o| o.line()), Some("second"));
        assert_eq!(buffer.next_line().as_ref().and_then(|o| o.line()), Some("third"));
        assert_eq!(buffer.next_line(), None);
    }

    #[test]
    fn invalid_utf8_is_a_decode_error_not_a_failure() {
        let mut buffer = LineBuffer::new();
        buffer.push(&[0xff, 0xfe, b'\n', b'o', b'k', b'\n']);
        assert_eq!(buffer.next_line(), Some(ReadOutcome::DecodeError(vec![0xff, 0xfe])));
        assert_eq!(buffer.next_line(), Some(ReadOutcome::Line("ok".to_string())));
    }

    #[test]
    fn overlong_run_is_released() {
        let mut buffer = LineBuffer::new();
        buffer.push(&vec![b'x'; MAX_LINE_BYTES]);
        match buffer.next_line() {
            Some(ReadOutcome::Line(line)) => assert_eq!(line.len(), MAX_LINE_BYTES),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(buffer.pending_len(), 0);
    }
}
