//! Line transport over stdin with bounded buffering and readiness pacing
//!
//! A reader thread feeds raw chunks over a channel so the main loop can
//! interleave input handling with idle readiness announcements. The line
//! buffer is bounded: input that fills it without a newline is discarded
//! whole, along with the rest of that oversized line.

use std::io::Read;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use ember_core::LINE_BUFFER_LEN;

/// Minimum spacing between `<READY` announcements.
pub const READY_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one transport poll.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    /// Nothing arrived within the timeout
    Idle,
    /// Bytes arrived but no complete line yet
    Pending,
    /// One complete command line (newline stripped)
    Line(String),
    /// The buffer overflowed and was purged
    Overflow,
    /// Input closed
    Eof,
}

/// Buffered line reader over a chunk channel.
pub struct LineReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    newlines: usize,
    purging: bool,
}

impl LineReader {
    /// Reader over an explicit channel (tests, alternate transports)
    pub fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            buf: Vec::new(),
            newlines: 0,
            purging: false,
        }
    }

    /// Spawn a thread reading stdin and return a reader over it.
    pub fn stdin() -> Self {
        let (tx, rx): (SyncSender<Vec<u8>>, _) = mpsc::sync_channel(16);
        thread::spawn(move || {
            let mut stdin = std::io::stdin().lock();
            let mut chunk = [0u8; 256];
            loop {
                match stdin.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self::new(rx)
    }

    /// Wait up to `timeout` for transport activity.
    pub fn poll(&mut self, timeout: Duration) -> Poll {
        if let Some(line) = self.take_line() {
            return Poll::Line(line);
        }

        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => {
                if self.ingest(&chunk) {
                    debug!("line buffer overflowed, purged");
                    return Poll::Overflow;
                }
                match self.take_line() {
                    Some(line) => Poll::Line(line),
                    None => Poll::Pending,
                }
            }
            Err(RecvTimeoutError::Timeout) => Poll::Idle,
            Err(RecvTimeoutError::Disconnected) => {
                if self.buf.is_empty() {
                    Poll::Eof
                } else {
                    // Flush a trailing unterminated line before EOF
                    self.buf.push(b'\n');
                    self.newlines += 1;
                    match self.take_line() {
                        Some(line) => Poll::Line(line),
                        None => Poll::Eof,
                    }
                }
            }
        }
    }

    fn ingest(&mut self, chunk: &[u8]) -> bool {
        let mut overflowed = false;
        for &byte in chunk {
            if self.purging {
                if byte == b'\n' {
                    self.purging = false;
                }
                continue;
            }

            self.buf.push(byte);
            if byte == b'\n' {
                self.newlines += 1;
            } else if self.newlines == 0 && self.buf.len() >= LINE_BUFFER_LEN {
                // No complete line fits; drop everything accumulated and
                // the remainder of this line.
                self.buf.clear();
                self.purging = true;
                overflowed = true;
            }
        }
        overflowed
    }

    fn take_line(&mut self) -> Option<String> {
        if self.newlines == 0 {
            return None;
        }
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        self.newlines -= 1;
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Pacing for idle `<READY` announcements.
///
/// Armed at startup and by `PING`; disarmed by the first byte of input.
/// While armed, at most one announcement per [`READY_INTERVAL`].
pub struct ReadyGate {
    armed: bool,
    last: Option<Instant>,
}

impl ReadyGate {
    /// A freshly armed gate
    pub fn new() -> Self {
        Self {
            armed: true,
            last: None,
        }
    }

    /// Whether an announcement is due now; records it if so.
    pub fn due(&mut self, now: Instant) -> bool {
        if !self.armed {
            return false;
        }
        match self.last {
            Some(at) if now.duration_since(at) < READY_INTERVAL => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Stop announcing until re-armed
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Resume announcing
    pub fn rearm(&mut self) {
        self.armed = true;
        self.last = None;
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}
