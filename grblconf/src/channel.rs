//! Line-oriented command exchange with an open controller port.
//!
//! GRBL speaks `\n`-terminated ASCII commands and answers with a burst of
//! newline-delimited lines. A burst ends when a read runs into the per-read
//! timeout, so a slow but responding device keeps the read loop alive.

use crate::error::{Error, Result};
use crate::port::Port;
use log::{debug, trace, warn};
use std::io::{Read, Write};

/// Maximum attempts for the same command before the channel gives up.
pub const SEND_RETRIES: usize = 3;

/// Owns one open port and exchanges single-line commands over it.
///
/// The channel is the connection handle: it is single-owner for the whole
/// lifetime of the open port and must be closed (or dropped) on every exit
/// path of the attempt that opened it.
pub struct CommandChannel<P: Port> {
    port: P,
}

impl<P: Port> CommandChannel<P> {
    /// Wrap an open port.
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Port name/path of the underlying connection.
    pub fn port_name(&self) -> &str {
        self.port
            .name()
    }

    /// Send a command line and collect the controller's response burst.
    ///
    /// The command is terminated with a single `\n`. An empty burst is a
    /// valid result, distinct from an I/O failure: it means the controller
    /// answered with nothing inside the read budget.
    pub fn send(&mut self, command: &str) -> Result<Vec<String>> {
        let line = format!("{command}\n");
        self.exchange(command, line.as_bytes())
    }

    /// Send raw bytes (e.g. the wake sequence) and collect the response burst.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.exchange("<raw>", bytes)
    }

    /// Close the underlying port. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        self.port
            .close()
    }

    /// One command, retried up to [`SEND_RETRIES`] times on I/O faults.
    /// The last attempt's error is the one returned.
    fn exchange(&mut self, label: &str, bytes: &[u8]) -> Result<Vec<String>> {
        let mut attempt = 1;
        let lines = loop {
            match self.try_exchange(bytes) {
                Ok(lines) => break lines,
                Err(e) => {
                    warn!("I/O fault sending {label} (attempt {attempt}/{SEND_RETRIES}): {e}");
                    if attempt >= SEND_RETRIES {
                        return Err(e);
                    }
                    attempt += 1;
                },
            }
        };

        if lines.is_empty() {
            debug!("no response to {label}");
        } else {
            debug!("{label}: {} response line(s)", lines.len());
        }
        Ok(lines)
    }

    /// Single write-then-read-burst exchange.
    fn try_exchange(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        // Stale bytes left over from a prior command would otherwise be
        // read back as part of this command's response.
        self.port
            .clear_input()?;

        self.port
            .write_all(bytes)?;
        self.port
            .flush()?;

        self.read_burst()
    }

    /// Read every line that becomes available before a read times out.
    fn read_burst(&mut self) -> Result<Vec<String>> {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 256];

        loop {
            match self
                .port
                .read(&mut chunk)
            {
                Ok(0) => break,
                Ok(n) => {
                    trace!("received {n} bytes");
                    raw.extend_from_slice(&chunk[..n]);
                },
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Ok(split_lines(&raw))
    }
}

/// Split a raw response burst into trimmed, non-empty lines.
fn split_lines(raw: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(raw)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
