//! End-to-end relay scenarios against in-memory connections

use frame_relay::{
    ConnectionHandle, ControlDelivery, Liveness, MessageOutcome, Payload, Relay, TransportError,
};
use tokio::sync::mpsc;

struct Peer {
    handle: ConnectionHandle,
    rx: mpsc::Receiver<Payload>,
}

impl Peer {
    fn connect(relay: &Relay) -> Self {
        let (handle, rx) = relay.connect();
        Self { handle, rx }
    }

    async fn send(&self, relay: &Relay, text: &str) -> MessageOutcome {
        relay
            .handle_message(&self.handle, Payload::text(text))
            .await
    }

    fn drain(&mut self) -> Vec<Payload> {
        let mut received = Vec::new();
        while let Ok(payload) = self.rx.try_recv() {
            received.push(payload);
        }
        received
    }
}

const PRODUCER: &str = r#"{"type":"producer-register"}"#;
const CONSUMER: &str = r#"{"type":"consumer-register"}"#;
const FRAME_1: &str = r#"{"type":"data-frame","seq":1}"#;
const FRAME_2: &str = r#"{"type":"data-frame","seq":2}"#;

#[tokio::test]
async fn frame_fan_out_and_consumer_close() {
    let relay = Relay::new();
    let mut a = Peer::connect(&relay);
    let mut b = Peer::connect(&relay);
    let mut c = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;
    c.send(&relay, CONSUMER).await;

    a.send(&relay, FRAME_1).await;

    assert_eq!(b.drain(), vec![Payload::text(FRAME_1)]);
    assert_eq!(c.drain(), vec![Payload::text(FRAME_1)]);
    assert!(a.drain().is_empty());

    let cleanup = relay.on_close(&b.handle).await;
    assert!(cleanup.was_consumer);

    a.send(&relay, FRAME_2).await;

    assert!(b.drain().is_empty());
    assert_eq!(c.drain(), vec![Payload::text(FRAME_2)]);
}

#[tokio::test]
async fn unregistered_sender_cannot_inject_frames() {
    let relay = Relay::new();
    let a = Peer::connect(&relay);
    let mut b = Peer::connect(&relay);
    let d = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;

    let outcome = d.send(&relay, FRAME_1).await;

    assert_eq!(outcome, MessageOutcome::FrameRejected);
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn malformed_payload_changes_nothing() {
    let relay = Relay::new();
    let a = Peer::connect(&relay);
    let mut b = Peer::connect(&relay);
    let d = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;
    let before = relay.registry().stats().await;

    let outcome = d.send(&relay, "not-json").await;
    assert_eq!(outcome, MessageOutcome::Malformed);

    // Producer sending garbage is dropped too, connection stays usable
    let outcome = a.send(&relay, "not-json").await;
    assert_eq!(outcome, MessageOutcome::Malformed);

    assert_eq!(relay.registry().stats().await, before);
    assert!(b.drain().is_empty());
    assert_eq!(a.handle.liveness(), Liveness::Open);

    a.send(&relay, FRAME_1).await;
    assert_eq!(b.drain(), vec![Payload::text(FRAME_1)]);
}

#[tokio::test]
async fn latest_producer_wins() {
    let relay = Relay::new();
    let p1 = Peer::connect(&relay);
    let p2 = Peer::connect(&relay);
    let p3 = Peer::connect(&relay);
    let mut consumer = Peer::connect(&relay);

    consumer.send(&relay, CONSUMER).await;

    for producer in [&p1, &p2, &p3] {
        producer.send(&relay, PRODUCER).await;
        let id = producer.handle.id();
        assert!(relay.registry().is_current_producer(id).await);
    }

    // Replaced producers keep their connection but lose forwarding privilege
    assert_eq!(p1.handle.liveness(), Liveness::Open);
    for replaced in [&p1, &p2] {
        let outcome = replaced.send(&relay, FRAME_1).await;
        assert_eq!(outcome, MessageOutcome::FrameRejected);
    }
    assert!(consumer.drain().is_empty());

    p3.send(&relay, FRAME_2).await;
    assert_eq!(consumer.drain(), vec![Payload::text(FRAME_2)]);
}

#[tokio::test]
async fn stale_close_does_not_evict_new_producer() {
    let relay = Relay::new();
    let old = Peer::connect(&relay);
    let new = Peer::connect(&relay);

    old.send(&relay, PRODUCER).await;
    new.send(&relay, PRODUCER).await;

    relay.on_close(&old.handle).await;

    assert!(relay.registry().is_current_producer(new.handle.id()).await);
}

#[tokio::test]
async fn closing_producer_clears_slot_and_keeps_consumers() {
    let relay = Relay::new();
    let a = Peer::connect(&relay);
    let b = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;

    let cleanup = relay.on_close(&a.handle).await;

    assert!(cleanup.was_producer);
    assert!(!relay.registry().has_producer().await);
    assert_eq!(relay.registry().consumer_count().await, 1);

    // Control now has nowhere to go
    let outcome = b.send(&relay, r#"{"type":"control"}"#).await;
    assert_eq!(
        outcome,
        MessageOutcome::Control(ControlDelivery::NoProducer)
    );
}

#[tokio::test]
async fn transport_error_is_handled_like_close() {
    let relay = Relay::new();
    let a = Peer::connect(&relay);
    let b = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;

    let error = TransportError::Receive("connection reset by peer".into());
    let cleanup = relay.on_error(&a.handle, &error).await;

    assert!(cleanup.was_producer);
    assert_eq!(a.handle.liveness(), Liveness::Closed);
    assert!(!relay.registry().has_producer().await);
    assert_eq!(relay.stats().snapshot().active_connections, 1);
}

#[tokio::test]
async fn control_reaches_open_producer_only() {
    let relay = Relay::new();
    let mut a = Peer::connect(&relay);
    let b = Peer::connect(&relay);
    let control = r#"{"type":"control","command":"walk","vx":0.5}"#;

    // No producer yet
    let outcome = b.send(&relay, control).await;
    assert_eq!(
        outcome,
        MessageOutcome::Control(ControlDelivery::NoProducer)
    );

    a.send(&relay, PRODUCER).await;
    let outcome = b.send(&relay, control).await;
    assert_eq!(
        outcome,
        MessageOutcome::Control(ControlDelivery::Delivered(a.handle.id()))
    );
    assert_eq!(a.drain(), vec![Payload::text(control)]);

    // Producer is going away but its close has not been processed yet
    a.handle.mark_erroring();
    let outcome = b.send(&relay, control).await;
    assert_eq!(
        outcome,
        MessageOutcome::Control(ControlDelivery::ProducerNotOpen(a.handle.id()))
    );
    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn consumer_closing_mid_stream_is_skipped_until_cleanup() {
    let relay = Relay::new();
    let a = Peer::connect(&relay);
    let b = Peer::connect(&relay);
    let mut c = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;
    c.send(&relay, CONSUMER).await;

    // Transport gone, close event not yet delivered
    drop(b.rx);

    let outcome = a.send(&relay, FRAME_1).await;
    match outcome {
        MessageOutcome::FrameRouted(report) => {
            assert_eq!(report.targets, 2);
            assert_eq!(report.delivered, 1);
            assert_eq!(report.skipped, 1);
        }
        other => panic!("Expected routed frame, got {:?}", other),
    }
    assert_eq!(c.drain(), vec![Payload::text(FRAME_1)]);
    assert_eq!(relay.registry().consumer_count().await, 2);

    relay.on_close(&b.handle).await;
    assert_eq!(relay.registry().consumer_count().await, 1);
}

#[tokio::test]
async fn slow_consumer_does_not_starve_others() {
    let relay = Relay::with_outbound_queue(2);
    let a = Peer::connect(&relay);
    let slow = Peer::connect(&relay);
    let mut fast = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    slow.send(&relay, CONSUMER).await;
    fast.send(&relay, CONSUMER).await;

    for seq in 0..5 {
        let frame = format!(r#"{{"type":"data-frame","seq":{}}}"#, seq);
        a.send(&relay, &frame).await;
        assert_eq!(fast.drain(), vec![Payload::text(frame)]);
    }

    let stats = relay.stats().snapshot();
    assert_eq!(stats.frames_routed, 5);
    assert_eq!(stats.deliveries, 5 + 2);
    assert_eq!(stats.send_failures, 3);
}

#[tokio::test]
async fn short_discriminants_from_deployed_clients() {
    let relay = Relay::new();
    let sim = Peer::connect(&relay);
    let mut viewer = Peer::connect(&relay);

    sim.send(&relay, r#"{"type":"simulation"}"#).await;
    viewer.send(&relay, r#"{"type":"viewer"}"#).await;

    let frame = r#"{"type":"frame","frame":"/9j/4AAQSkZJRg==","timestamp":"2024-05-01T12:00"}"#;
    sim.send(&relay, frame).await;

    assert_eq!(viewer.drain(), vec![Payload::text(frame)]);
}

#[tokio::test]
async fn binary_frames_are_forwarded_as_binary() {
    let relay = Relay::new();
    let a = Peer::connect(&relay);
    let mut b = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;

    let frame = Payload::binary(FRAME_1.as_bytes().to_vec());
    relay.handle_message(&a.handle, frame.clone()).await;

    let received = b.drain();
    assert_eq!(received, vec![frame]);
    assert!(!received[0].is_text());
}

#[tokio::test]
async fn per_connection_order_is_preserved() {
    let relay = Relay::new();
    let a = Peer::connect(&relay);
    let mut b = Peer::connect(&relay);

    a.send(&relay, PRODUCER).await;
    b.send(&relay, CONSUMER).await;

    let frames: Vec<String> = (0..20)
        .map(|seq| format!(r#"{{"type":"data-frame","seq":{}}}"#, seq))
        .collect();
    for frame in &frames {
        a.send(&relay, frame).await;
    }

    let expected: Vec<Payload> = frames.into_iter().map(Payload::text).collect();
    assert_eq!(b.drain(), expected);
}
