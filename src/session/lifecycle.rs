//! Connection lifecycle
//!
//! Close and error events remove a connection from whichever registry slot
//! holds it. Both cleanup steps are no-ops when the id does not match, so
//! they are safe to run for every connection, registered or not.

use std::sync::Arc;

use crate::error::TransportError;
use crate::registry::{ConnectionId, ConnectionRegistry};

/// Which registry slots a cleanup emptied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleanup {
    /// Connection was the producer
    pub was_producer: bool,
    /// Connection was a consumer
    pub was_consumer: bool,
}

/// Lifecycle manager
#[derive(Debug, Clone)]
pub struct Lifecycle {
    registry: Arc<ConnectionRegistry>,
}

impl Lifecycle {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Connection closed
    pub async fn on_close(&self, id: ConnectionId) -> Cleanup {
        let cleanup = Cleanup {
            was_producer: self.registry.clear_producer_if_matches(id).await,
            was_consumer: self.registry.remove_consumer(id).await,
        };

        if cleanup.was_producer {
            tracing::info!(conn_id = %id, "Producer disconnected");
        } else if cleanup.was_consumer {
            let consumers = self.registry.consumer_count().await;
            tracing::info!(conn_id = %id, consumers, "Consumer disconnected");
        } else {
            tracing::debug!(conn_id = %id, "Unregistered connection closed");
        }

        cleanup
    }

    /// Connection errored
    ///
    /// Same registry transition as a close.
    pub async fn on_error(&self, id: ConnectionId, error: &TransportError) -> Cleanup {
        tracing::warn!(conn_id = %id, error = %error, "Connection error");
        self.on_close(id).await
    }
}
