//! Relay core
//!
//! Owns the registry and wires the dispatcher and lifecycle manager to it.
//! The transport layer talks only to [`Relay`]: it allocates a handle per
//! accepted connection, feeds inbound payloads in arrival order, and reports
//! exactly one terminal event (close or error) per connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Payload};
use crate::session::{Cleanup, Dispatcher, Lifecycle, MessageOutcome};
use crate::stats::RelayStats;

/// Default outbound queue depth per connection
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Producer/consumer relay
#[derive(Debug)]
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    lifecycle: Lifecycle,
    stats: Arc<RelayStats>,
    next_connection_id: AtomicU64,
    outbound_queue: usize,
}

impl Relay {
    /// Create a relay with the default outbound queue depth
    pub fn new() -> Self {
        Self::with_outbound_queue(DEFAULT_OUTBOUND_QUEUE)
    }

    /// Create a relay with a custom outbound queue depth per connection
    pub fn with_outbound_queue(capacity: usize) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(RelayStats::new());

        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry), Arc::clone(&stats)),
            lifecycle: Lifecycle::new(Arc::clone(&registry)),
            registry,
            stats,
            next_connection_id: AtomicU64::new(1),
            outbound_queue: capacity.max(1),
        }
    }

    /// Allocate a handle for a newly accepted connection
    ///
    /// The receiver is the connection's outbound queue; the transport drains
    /// it onto the socket. The connection is not registered until it sends a
    /// registration envelope.
    pub fn connect(&self) -> (ConnectionHandle, mpsc::Receiver<Payload>) {
        let id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        self.stats.connection_opened();

        tracing::debug!(conn_id = %id, "New connection");

        ConnectionHandle::channel(id, self.outbound_queue)
    }

    /// Handle one inbound message
    pub async fn handle_message(
        &self,
        conn: &ConnectionHandle,
        payload: Payload,
    ) -> MessageOutcome {
        self.dispatcher.dispatch(conn, payload).await
    }

    /// Connection closed
    pub async fn on_close(&self, conn: &ConnectionHandle) -> Cleanup {
        conn.mark_closed();
        self.stats.connection_closed();
        self.lifecycle.on_close(conn.id()).await
    }

    /// Connection failed
    pub async fn on_error(&self, conn: &ConnectionHandle, error: &TransportError) -> Cleanup {
        conn.mark_erroring();
        let cleanup = self.lifecycle.on_error(conn.id(), error).await;
        conn.mark_closed();
        self.stats.connection_closed();
        cleanup
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get a reference to the relay counters
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Outbound queue depth per connection
    pub fn outbound_queue(&self) -> usize {
        self.outbound_queue
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}
