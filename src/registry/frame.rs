//! Connection identity and relayed payload types
//!
//! This module defines the key used to identify connections in the registry
//! and the payloads that are fanned out to them.

use bytes::Bytes;

/// Unique identifier for a relay connection
///
/// Allocated by the listener from a monotonically increasing counter, so
/// ordering by id is ordering by accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a connection id from a raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A message as it arrived on the wire
///
/// Cheap to clone: every fan-out target shares the same `Bytes` allocation,
/// and the bytes are never re-encoded between receive and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text frame (always valid UTF-8)
    Text(Bytes),
    /// Binary frame
    Binary(Bytes),
}

impl Payload {
    /// Create a text payload
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(Bytes::from(text.into()))
    }

    /// Create a binary payload
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Payload::Binary(data.into())
    }

    /// Raw bytes of the payload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(data) | Payload::Binary(data) => data,
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Whether this came in as a text frame
    pub fn is_text(&self) -> bool {
        matches!(self, Payload::Text(_))
    }
}
