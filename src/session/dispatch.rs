//! Inbound message dispatch
//!
//! Classifies each message from a connection and applies its role intent:
//! registrations update the registry, frames and control messages go to the
//! router. Nothing is ever sent back to the sender.

use std::sync::Arc;

use crate::protocol::{classify, EnvelopeKind};
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Payload};
use crate::routing::{ControlDelivery, DeliveryReport, Router};
use crate::stats::RelayStats;

/// What the dispatcher did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Sender is now the producer
    ProducerRegistered {
        /// Producer that lost its slot, if any
        replaced: Option<ConnectionId>,
    },
    /// Sender is a consumer
    ConsumerRegistered {
        /// False if it was already registered
        inserted: bool,
    },
    /// Producer frame fanned out
    FrameRouted(DeliveryReport),
    /// Frame from a connection that is not the producer, ignored
    FrameRejected,
    /// Control message routed (or dropped) toward the producer
    Control(ControlDelivery),
    /// Unknown discriminant, ignored
    Unrecognized,
    /// Not JSON, dropped
    Malformed,
}

/// Message classifier and dispatcher
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    router: Router,
    stats: Arc<RelayStats>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry
    pub fn new(registry: Arc<ConnectionRegistry>, stats: Arc<RelayStats>) -> Self {
        let router = Router::new(Arc::clone(&registry));
        Self {
            registry,
            router,
            stats,
        }
    }

    /// Handle one inbound message from `sender`
    pub async fn dispatch(&self, sender: &ConnectionHandle, payload: Payload) -> MessageOutcome {
        self.stats.message_received(payload.len());

        let envelope = match classify(&payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.parse_error();
                tracing::warn!(
                    conn_id = %sender.id(),
                    error = %e,
                    bytes = payload.len(),
                    "Dropping malformed message"
                );
                return MessageOutcome::Malformed;
            }
        };

        match envelope.kind() {
            EnvelopeKind::ProducerRegister => {
                let replaced = self.registry.set_producer(sender.clone()).await;
                MessageOutcome::ProducerRegistered { replaced }
            }
            EnvelopeKind::ConsumerRegister => {
                let inserted = self.registry.add_consumer(sender.clone()).await;
                MessageOutcome::ConsumerRegistered { inserted }
            }
            EnvelopeKind::DataFrame => {
                let routed = self
                    .router
                    .route_producer_frame(sender.id(), &payload)
                    .await;
                let Some(report) = routed else {
                    self.stats.frame_rejected();
                    tracing::debug!(conn_id = %sender.id(), "Ignoring frame from non-producer");
                    return MessageOutcome::FrameRejected;
                };

                self.stats
                    .frame_routed(report.delivered, report.skipped, report.failed);
                MessageOutcome::FrameRouted(report)
            }
            EnvelopeKind::Control => {
                let delivery = self.router.route_control(&payload).await;
                match delivery {
                    ControlDelivery::Delivered(_) => self.stats.control_forwarded(),
                    ControlDelivery::Failed(_) => self.stats.control_failed(),
                    ControlDelivery::NoProducer | ControlDelivery::ProducerNotOpen(_) => {
                        self.stats.control_dropped()
                    }
                }
                MessageOutcome::Control(delivery)
            }
            EnvelopeKind::Unrecognized(discriminant) => {
                self.stats.unrecognized();
                tracing::debug!(
                    conn_id = %sender.id(),
                    discriminant = ?discriminant,
                    "Ignoring unrecognized message"
                );
                MessageOutcome::Unrecognized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn handle(id: u64) -> (ConnectionHandle, mpsc::Receiver<Payload>) {
        ConnectionHandle::channel(ConnectionId::new(id), 8)
    }

    fn setup() -> (Arc<ConnectionRegistry>, Arc<RelayStats>, Dispatcher) {
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(RelayStats::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&stats));
        (registry, stats, dispatcher)
    }

    #[tokio::test]
    async fn test_registrations() {
        let (registry, _stats, dispatcher) = setup();
        let (a, _rx_a) = handle(1);
        let (b, _rx_b) = handle(2);

        let outcome = dispatcher
            .dispatch(&a, Payload::text(r#"{"type":"producer-register"}"#))
            .await;
        assert_eq!(
            outcome,
            MessageOutcome::ProducerRegistered { replaced: None }
        );

        let outcome = dispatcher
            .dispatch(&b, Payload::text(r#"{"type":"consumer-register"}"#))
            .await;
        assert_eq!(
            outcome,
            MessageOutcome::ConsumerRegistered { inserted: true }
        );

        let outcome = dispatcher
            .dispatch(&b, Payload::text(r#"{"type":"viewer"}"#))
            .await;
        assert_eq!(
            outcome,
            MessageOutcome::ConsumerRegistered { inserted: false }
        );

        assert!(registry.is_current_producer(ConnectionId::new(1)).await);
        assert_eq!(registry.consumer_count().await, 1);
    }

    #[tokio::test]
    async fn test_frame_from_producer_is_forwarded_verbatim() {
        let (_registry, stats, dispatcher) = setup();
        let (a, _rx_a) = handle(1);
        let (b, mut rx_b) = handle(2);

        dispatcher
            .dispatch(&a, Payload::text(r#"{"type":"simulation"}"#))
            .await;
        dispatcher
            .dispatch(&b, Payload::text(r#"{"type":"viewer"}"#))
            .await;

        // Whitespace and key order survive because the bytes are not re-encoded
        let frame = Payload::text(r#"{ "seq": 1,  "type" : "data-frame" }"#);
        let outcome = dispatcher.dispatch(&a, frame.clone()).await;

        assert!(matches!(
            outcome,
            MessageOutcome::FrameRouted(DeliveryReport { delivered: 1, .. })
        ));
        assert_eq!(rx_b.try_recv().unwrap(), frame);
        assert_eq!(stats.snapshot().frames_routed, 1);
    }

    #[tokio::test]
    async fn test_frame_from_non_producer_is_ignored() {
        let (_registry, stats, dispatcher) = setup();
        let (a, _rx_a) = handle(1);
        let (b, mut rx_b) = handle(2);
        let (d, mut rx_d) = handle(4);

        dispatcher
            .dispatch(&a, Payload::text(r#"{"type":"producer-register"}"#))
            .await;
        dispatcher
            .dispatch(&b, Payload::text(r#"{"type":"consumer-register"}"#))
            .await;

        let outcome = dispatcher
            .dispatch(&d, Payload::text(r#"{"type":"data-frame","seq":1}"#))
            .await;
        assert_eq!(outcome, MessageOutcome::FrameRejected);

        // A consumer cannot inject frames either
        let outcome = dispatcher
            .dispatch(&b, Payload::text(r#"{"type":"data-frame","seq":2}"#))
            .await;
        assert_eq!(outcome, MessageOutcome::FrameRejected);

        assert!(rx_b.try_recv().is_err());
        assert!(rx_d.try_recv().is_err());
        assert_eq!(stats.snapshot().frames_rejected, 2);
    }

    #[tokio::test]
    async fn test_control_from_anyone_reaches_producer() {
        let (_registry, stats, dispatcher) = setup();
        let (a, mut rx_a) = handle(1);
        let (d, _rx_d) = handle(4);

        dispatcher
            .dispatch(&a, Payload::text(r#"{"type":"producer-register"}"#))
            .await;

        let control = Payload::text(r#"{"type":"control","linear":0.3}"#);
        let outcome = dispatcher.dispatch(&d, control.clone()).await;

        assert_eq!(
            outcome,
            MessageOutcome::Control(ControlDelivery::Delivered(ConnectionId::new(1)))
        );
        assert_eq!(rx_a.try_recv().unwrap(), control);
        assert_eq!(stats.snapshot().controls_forwarded, 1);
    }

    #[tokio::test]
    async fn test_control_without_producer_is_dropped() {
        let (_registry, stats, dispatcher) = setup();
        let (d, mut rx_d) = handle(4);

        let outcome = dispatcher
            .dispatch(&d, Payload::text(r#"{"type":"control"}"#))
            .await;

        assert_eq!(
            outcome,
            MessageOutcome::Control(ControlDelivery::NoProducer)
        );
        assert!(rx_d.try_recv().is_err());
        assert_eq!(stats.snapshot().controls_dropped, 1);
    }

    #[tokio::test]
    async fn test_malformed_and_unrecognized() {
        let (registry, stats, dispatcher) = setup();
        let (d, mut rx_d) = handle(4);

        let outcome = dispatcher.dispatch(&d, Payload::text("not-json")).await;
        assert_eq!(outcome, MessageOutcome::Malformed);

        let outcome = dispatcher
            .dispatch(&d, Payload::text(r#"{"type":"ping"}"#))
            .await;
        assert_eq!(outcome, MessageOutcome::Unrecognized);

        assert_eq!(registry.stats().await.consumer_count, 0);
        assert!(!registry.has_producer().await);
        assert!(rx_d.try_recv().is_err());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.unrecognized, 1);
    }
}
