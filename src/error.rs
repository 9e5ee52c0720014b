//! Error types
//!
//! None of these are ever sent to a connected party. Malformed envelopes and
//! per-target send failures are handled where they occur and never surface
//! here. Transport failures are reported to the relay as `TransportError` and
//! end only the connection they occurred on.

/// Connection-level transport failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Reading from the socket failed
    Receive(String),
    /// Writing to the socket failed
    Send(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Receive(detail) => write!(f, "Receive failed: {}", detail),
            TransportError::Send(detail) => write!(f, "Send failed: {}", detail),
        }
    }
}

impl std::error::Error for TransportError {}

/// Crate-level error
#[derive(Debug)]
pub enum Error {
    /// Socket bind or accept failure
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
