//! Port abstraction for serial communication.
//!
//! The protocol layers (`channel`, `handshake`, `settings`) are written
//! against the `Port` trait so they can be exercised with a scripted port in
//! tests while production code uses [`NativePort`] over the `serialport`
//! crate.

pub mod native;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Serial port configuration.
///
/// GRBL controllers talk 8N1 at a fixed baud rate; only the port path, baud
/// rate, and per-read timeout vary.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyUSB0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Per-read timeout. Each blocking read waits at most this long.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 115200,
            timeout: Duration::from_millis(1000),
        }
    }
}

impl SerialConfig {
    /// Create a new configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            ..Default::default()
        }
        .with_baud_rate(baud_rate)
    }

    /// Set the baud rate.
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the per-read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Unified trait for an open, line-oriented serial connection.
pub trait Port: Read + Write + Send {
    /// Set the per-read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Get the current per-read timeout.
    fn timeout(&self) -> Duration;

    /// Discard any unread bytes in the input buffer.
    fn clear_input(&mut self) -> Result<()>;

    /// Get the port name/path.
    fn name(&self) -> &str;

    /// Close the port and release resources.
    ///
    /// After calling this method, the port cannot be used for further I/O.
    /// Closing an already-closed port is a no-op.
    fn close(&mut self) -> Result<()>;
}

pub use native::NativePort;
