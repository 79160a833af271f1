//! Error types for grblconf.

use std::io;
use thiserror::Error;

/// Result type for grblconf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for grblconf operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port read/write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The OS reports the port is already claimed by another process.
    ///
    /// Surfaced as its own variant so callers can stop probing further
    /// candidates instead of string-matching the OS message.
    #[error("Access denied on port {port}: {details}")]
    AccessDenied {
        /// Port path the open was attempted on.
        port: String,
        /// OS-reported failure text.
        details: String,
    },

    /// The wake sequence produced no firmware banner.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),
}

impl Error {
    /// Whether this error means the port is held by another program.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_classification() {
        let err = Error::AccessDenied {
            port: "COM5".into(),
            details: "claimed by another process".into(),
        };
        assert!(err.is_access_denied());
        assert!(err.to_string().contains("COM5"));
    }

    #[test]
    fn test_other_errors_are_not_access_denied() {
        let err = Error::HandshakeFailed("no banner".into());
        assert!(!err.is_access_denied());

        let err = Error::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
        assert!(!err.is_access_denied());
    }
}
