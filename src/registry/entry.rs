//! Connection handle and liveness types
//!
//! This module defines the per-connection state stored in the registry. The
//! registry never owns a connection; it holds a handle that can enqueue
//! payloads onto the connection's outbound queue and observe its liveness.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::error::SendError;
use super::frame::{ConnectionId, Payload};

/// Observable liveness of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Connection accepts outbound payloads
    Open,
    /// Transport reported an error, close is pending
    Erroring,
    /// Connection is closed
    Closed,
}

impl Liveness {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Liveness::Open,
            1 => Liveness::Erroring,
            _ => Liveness::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Liveness::Open => 0,
            Liveness::Erroring => 1,
            Liveness::Closed => 2,
        }
    }
}

/// Non-owning handle to a relay connection
///
/// Cloning is cheap; all clones share the same liveness flag and outbound
/// queue. The transport task owns the receiving end of the queue.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    liveness: Arc<AtomicU8>,
    tx: mpsc::Sender<Payload>,
}

impl ConnectionHandle {
    /// Create a handle together with the receiving end of its outbound queue
    ///
    /// `capacity` bounds how many payloads may wait for the writer before
    /// sends start failing with [`SendError::QueueFull`]. A capacity of zero
    /// is treated as one.
    pub fn channel(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let handle = Self {
            id,
            liveness: Arc::new(AtomicU8::new(Liveness::Open.as_u8())),
            tx,
        };

        (handle, rx)
    }

    /// Get the connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current liveness
    ///
    /// A connection whose outbound queue receiver has been dropped reports
    /// `Closed` even if the transport task has not marked it yet.
    pub fn liveness(&self) -> Liveness {
        if self.tx.is_closed() {
            return Liveness::Closed;
        }
        Liveness::from_u8(self.liveness.load(Ordering::Acquire))
    }

    /// Check if the connection is open
    pub fn is_open(&self) -> bool {
        self.liveness() == Liveness::Open
    }

    /// Mark the connection as erroring (only from `Open`)
    pub fn mark_erroring(&self) {
        let _ = self.liveness.compare_exchange(
            Liveness::Open.as_u8(),
            Liveness::Erroring.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Mark the connection as closed
    pub fn mark_closed(&self) {
        self.liveness
            .store(Liveness::Closed.as_u8(), Ordering::Release);
    }

    /// Enqueue a payload for delivery
    ///
    /// Never waits on the peer: a saturated queue fails immediately so a slow
    /// connection cannot hold up the caller.
    pub fn send(&self, payload: Payload) -> Result<(), SendError> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull(self.id),
            TrySendError::Closed(_) => SendError::Closed(self.id),
        })
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("liveness", &self.liveness())
            .finish()
    }
}
