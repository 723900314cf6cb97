//! Error types for redis-cp
//!
//! Every fallible operation in the workspace returns [`CopyError`]. A
//! vanished source key is not an error and never shows up here.

use std::io;
use thiserror::Error;

/// Main error type for copy operations
#[derive(Error, Debug)]
pub enum CopyError {
    /// Malformed or missing configuration, raised before any connection is made
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to reach an endpoint
    #[error("connection error: {0}")]
    Connection(String),

    /// The peer closed the connection mid round trip
    #[error("connection closed")]
    ConnectionClosed,

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed RESP data or a reply of the wrong shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The store answered a command with an error reply
    #[error("{command} failed: {message}")]
    Server {
        /// Command name that was rejected
        command: String,
        /// Error text returned by the server
        message: String,
    },
}

/// Result type alias for copy operations
pub type Result<T> = std::result::Result<T, CopyError>;

impl CopyError {
    /// Returns true if this error came from the transport rather than the store
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CopyError::Connection(_) | CopyError::ConnectionClosed | CopyError::Io(_)
        )
    }

    /// Build a [`CopyError::Server`] from a command name and error text
    pub fn server(command: impl Into<String>, message: impl Into<String>) -> Self {
        CopyError::Server {
            command: command.into(),
            message: message.into(),
        }
    }
}

impl From<crate::protocol::ParseError> for CopyError {
    fn from(err: crate::protocol::ParseError) -> Self {
        CopyError::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(CopyError::ConnectionClosed.is_transport());
        assert!(CopyError::Connection("refused".into()).is_transport());
        assert!(CopyError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe")).is_transport());
        assert!(!CopyError::Config("batch".into()).is_transport());
        assert!(!CopyError::server("RESTORE", "ERR bad payload").is_transport());
    }

    #[test]
    fn test_server_error_display() {
        let err = CopyError::server("MIGRATE", "IOERR error or timeout");
        assert_eq!(err.to_string(), "MIGRATE failed: IOERR error or timeout");
    }
}
