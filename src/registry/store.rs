//! Connection registry implementation
//!
//! The central registry tracking the single producer slot and the set of
//! consumers that receive fan-out copies of its frames.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::entry::ConnectionHandle;
use super::frame::ConnectionId;

/// Registry contents, mutated only under the registry lock
#[derive(Debug, Default)]
struct RegistryState {
    /// Current producer (None if no producer registered)
    producer: Option<ConnectionHandle>,

    /// Registered consumers, keyed and ordered by connection id
    consumers: BTreeMap<ConnectionId, ConnectionHandle>,
}

/// Central registry of producer and consumer connections
///
/// Thread-safe via `RwLock`. Every mutation takes the write lock, so a
/// snapshot taken under the read lock never observes a half-applied
/// join or leave. Invariant: a connection is never both the producer and a
/// consumer.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` the producer
    ///
    /// Last registration wins: any previous producer silently loses its
    /// forwarding privilege but its connection is left untouched. If
    /// `handle` was a consumer it leaves the consumer set.
    ///
    /// Returns the id of the replaced producer, if any.
    pub async fn set_producer(&self, handle: ConnectionHandle) -> Option<ConnectionId> {
        let mut state = self.state.write().await;
        let id = handle.id();

        if state.consumers.remove(&id).is_some() {
            tracing::debug!(
                conn_id = %id,
                consumers = state.consumers.len(),
                "Consumer promoted to producer"
            );
        }

        let previous = state.producer.replace(handle).map(|prev| prev.id());

        match previous {
            Some(prev) if prev != id => {
                // The replaced producer is not notified
                tracing::info!(conn_id = %id, replaced = %prev, "Producer replaced");
            }
            Some(_) => {
                tracing::debug!(conn_id = %id, "Producer re-registered");
            }
            None => {
                tracing::info!(
                    conn_id = %id,
                    consumers = state.consumers.len(),
                    "Producer registered"
                );
            }
        }

        previous
    }

    /// Add `handle` to the consumer set
    ///
    /// Idempotent. If `handle` is the current producer the producer slot is
    /// cleared first, so the connection ends up as a consumer only.
    ///
    /// Returns true if the consumer was newly inserted.
    pub async fn add_consumer(&self, handle: ConnectionHandle) -> bool {
        let mut state = self.state.write().await;
        let id = handle.id();

        if state.producer.as_ref().map(ConnectionHandle::id) == Some(id) {
            state.producer = None;
            tracing::info!(conn_id = %id, "Producer re-registered as consumer, slot cleared");
        }

        if state.consumers.contains_key(&id) {
            return false;
        }

        state.consumers.insert(id, handle);

        tracing::info!(
            conn_id = %id,
            consumers = state.consumers.len(),
            "Consumer registered"
        );

        true
    }

    /// Remove a consumer if present
    ///
    /// Returns true if a consumer was removed.
    pub async fn remove_consumer(&self, id: ConnectionId) -> bool {
        let mut state = self.state.write().await;

        if state.consumers.remove(&id).is_some() {
            tracing::info!(
                conn_id = %id,
                consumers = state.consumers.len(),
                "Consumer removed"
            );
            true
        } else {
            false
        }
    }

    /// Clear the producer slot only if it currently holds `id`
    ///
    /// A late close event from an old producer cannot evict a newer one.
    /// Returns true if the slot was cleared.
    pub async fn clear_producer_if_matches(&self, id: ConnectionId) -> bool {
        let mut state = self.state.write().await;

        match state.producer.as_ref().map(ConnectionHandle::id) {
            Some(current) if current == id => {
                state.producer = None;
                tracing::info!(conn_id = %id, "Producer cleared");
                true
            }
            Some(current) => {
                tracing::trace!(
                    conn_id = %id,
                    current = %current,
                    "Producer clear ignored, slot held by another connection"
                );
                false
            }
            None => false,
        }
    }

    /// Check whether `id` is the current producer
    pub async fn is_current_producer(&self, id: ConnectionId) -> bool {
        let state = self.state.read().await;
        state.producer.as_ref().map(ConnectionHandle::id) == Some(id)
    }

    /// Get the current producer handle
    pub async fn producer(&self) -> Option<ConnectionHandle> {
        self.state.read().await.producer.clone()
    }

    /// Check if a producer is registered
    pub async fn has_producer(&self) -> bool {
        self.state.read().await.producer.is_some()
    }

    /// Copy of the current consumers, ordered by connection id
    ///
    /// The returned handles are detached from the registry: joins and leaves
    /// after this call do not affect the snapshot.
    pub async fn snapshot_consumers(&self) -> Vec<ConnectionHandle> {
        let state = self.state.read().await;
        state.consumers.values().cloned().collect()
    }

    /// Copy of the current consumers, if `id` is the current producer
    ///
    /// The producer check and the snapshot happen under one read guard, so a
    /// producer replaced concurrently cannot fan out against the new
    /// producer's consumer set. Returns None if `id` is not the producer.
    pub async fn consumers_if_producer(&self, id: ConnectionId) -> Option<Vec<ConnectionHandle>> {
        let state = self.state.read().await;
        if state.producer.as_ref().map(ConnectionHandle::id) != Some(id) {
            return None;
        }
        Some(state.consumers.values().cloned().collect())
    }

    /// Number of registered consumers
    pub async fn consumer_count(&self) -> usize {
        self.state.read().await.consumers.len()
    }

    /// Get registry statistics
    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.read().await;
        RegistryStats {
            producer: state.producer.as_ref().map(ConnectionHandle::id),
            consumer_count: state.consumers.len(),
        }
    }
}

/// Point-in-time view of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Current producer, if any
    pub producer: Option<ConnectionId>,
    /// Number of registered consumers
    pub consumer_count: usize,
}
