//! Statistics and metrics for the relay

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Relay-wide counters
///
/// Updated lock-free from every connection task.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    frames_routed: AtomicU64,
    frames_rejected: AtomicU64,
    deliveries: AtomicU64,
    deliveries_skipped: AtomicU64,
    send_failures: AtomicU64,
    controls_forwarded: AtomicU64,
    controls_dropped: AtomicU64,
    parse_errors: AtomicU64,
    unrecognized: AtomicU64,
    bytes_received: AtomicU64,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            frames_routed: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            deliveries_skipped: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            controls_forwarded: AtomicU64::new(0),
            controls_dropped: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            unrecognized: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    pub fn message_received(&self, bytes: usize) {
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record one fan-out of a producer frame
    pub fn frame_routed(&self, delivered: usize, skipped: usize, failed: usize) {
        self.frames_routed.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.deliveries_skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);
        self.send_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn control_forwarded(&self) {
        self.controls_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn control_dropped(&self) {
        self.controls_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn control_failed(&self) {
        self.controls_dropped.fetch_add(1, Ordering::Relaxed);
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unrecognized(&self) {
        self.unrecognized.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the counters were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            frames_routed: self.frames_routed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            deliveries_skipped: self.deliveries_skipped.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            controls_forwarded: self.controls_forwarded.load(Ordering::Relaxed),
            controls_dropped: self.controls_dropped.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Seconds since startup
    pub uptime_secs: u64,
    /// Connections accepted since startup
    pub total_connections: u64,
    /// Currently open connections
    pub active_connections: u64,
    /// Producer frames fanned out
    pub frames_routed: u64,
    /// Frames dropped because the sender was not the producer
    pub frames_rejected: u64,
    /// Successful per-consumer enqueues
    pub deliveries: u64,
    /// Consumers skipped because they were not open
    pub deliveries_skipped: u64,
    /// Per-target send failures (frames and control)
    pub send_failures: u64,
    /// Control messages handed to the producer
    pub controls_forwarded: u64,
    /// Control messages dropped (no open producer or send failure)
    pub controls_dropped: u64,
    /// Malformed envelopes
    pub parse_errors: u64,
    /// Envelopes with an unknown discriminant
    pub unrecognized: u64,
    /// Total inbound payload bytes
    pub bytes_received: u64,
}
