//! Error types for DrawVault
//!
//! Provides a unified error type for server and client operations.

use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for DrawVault operations
#[derive(Debug, Error)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// Local filesystem or socket failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    /// Dial, bind or accept failure
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer did not answer within the configured deadline
    #[error("Timed out waiting for the server")]
    Timeout,

    /// The server's worker pool is saturated
    #[error("Server is overloaded, try again later")]
    Overloaded,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Truncated or malformed frame
    #[error("Framing error: {0}")]
    Framing(String),

    /// Unknown command, invalid filename, or unexpected reply
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The server reported a failure of its own
    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("File not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// True for socket read/write deadline expiry
    ///
    /// Unix reports `WouldBlock`, Windows reports `TimedOut`.
    pub fn is_timeout(&self) -> bool {
        match self {
            VaultError::Timeout => true,
            VaultError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// True when the peer went away mid-conversation
    pub fn is_disconnect(&self) -> bool {
        match self {
            VaultError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
