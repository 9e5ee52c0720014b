//! Delivery error types
//!
//! Error type for enqueueing a payload on a registered connection.

use super::frame::ConnectionId;

/// Error type for per-connection delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Outbound queue is saturated (slow consumer)
    QueueFull(ConnectionId),
    /// Transport side of the connection is gone
    Closed(ConnectionId),
}

impl SendError {
    /// Connection the delivery was aimed at
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            SendError::QueueFull(id) | SendError::Closed(id) => *id,
        }
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::QueueFull(id) => write!(f, "Outbound queue full: {}", id),
            SendError::Closed(id) => write!(f, "Connection closed: {}", id),
        }
    }
}

impl std::error::Error for SendError {}
