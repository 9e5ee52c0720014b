//! Frame and control routing
//!
//! Delivery is a non-blocking enqueue onto each target's outbound queue. A
//! failure on one target is logged and counted; it never stops delivery to
//! the others.

use std::sync::Arc;

use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Payload, SendError};

/// Outcome of fanning out one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Consumers in the snapshot
    pub targets: usize,
    /// Consumers the frame was enqueued for
    pub delivered: usize,
    /// Consumers skipped because they were not open
    pub skipped: usize,
    /// Consumers whose send failed
    pub failed: usize,
}

/// Outcome of routing one control message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlDelivery {
    /// Enqueued for the producer
    Delivered(ConnectionId),
    /// No producer registered, dropped
    NoProducer,
    /// Producer registered but not open, dropped
    ProducerNotOpen(ConnectionId),
    /// Enqueue to the producer failed, dropped
    Failed(SendError),
}

impl ControlDelivery {
    /// Whether the control message reached the producer's queue
    pub fn is_delivered(&self) -> bool {
        matches!(self, ControlDelivery::Delivered(_))
    }
}

/// Routing engine
///
/// Reads the registry, never mutates it: removal of dead connections is left
/// to the lifecycle path so a delivery-time skip cannot race a close.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<ConnectionRegistry>,
}

impl Router {
    /// Create a router over a registry
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver a frame to every consumer open at snapshot time
    pub async fn route_frame(&self, payload: &Payload) -> DeliveryReport {
        let consumers = self.registry.snapshot_consumers().await;
        Self::fan_out(&consumers, payload)
    }

    /// Deliver a frame from `sender` only if it is the current producer
    ///
    /// The producer check and the consumer snapshot are taken together.
    /// Returns None if `sender` is not the producer.
    pub async fn route_producer_frame(
        &self,
        sender: ConnectionId,
        payload: &Payload,
    ) -> Option<DeliveryReport> {
        let consumers = self.registry.consumers_if_producer(sender).await?;
        Some(Self::fan_out(&consumers, payload))
    }

    fn fan_out(consumers: &[ConnectionHandle], payload: &Payload) -> DeliveryReport {
        let mut report = DeliveryReport {
            targets: consumers.len(),
            ..DeliveryReport::default()
        };

        for consumer in consumers {
            if !consumer.is_open() {
                report.skipped += 1;
                continue;
            }

            match consumer.send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        conn_id = %consumer.id(),
                        error = %e,
                        "Frame delivery failed"
                    );
                }
            }
        }

        tracing::trace!(
            targets = report.targets,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            bytes = payload.len(),
            "Frame routed"
        );

        report
    }

    /// Deliver a control message to the producer, if set and open
    pub async fn route_control(&self, payload: &Payload) -> ControlDelivery {
        let Some(producer) = self.registry.producer().await else {
            tracing::trace!("Control dropped, no producer");
            return ControlDelivery::NoProducer;
        };

        if !producer.is_open() {
            tracing::trace!(conn_id = %producer.id(), "Control dropped, producer not open");
            return ControlDelivery::ProducerNotOpen(producer.id());
        }

        match producer.send(payload.clone()) {
            Ok(()) => ControlDelivery::Delivered(producer.id()),
            Err(e) => {
                tracing::warn!(
                    conn_id = %producer.id(),
                    error = %e,
                    "Control delivery failed"
                );
                ControlDelivery::Failed(e)
            }
        }
    }
}
