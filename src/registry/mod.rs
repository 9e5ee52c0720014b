//! Connection registry for producer/consumer routing
//!
//! The registry tracks the single producer slot and the set of consumers.
//! It holds only handles: each connection is owned by its transport task,
//! and the registry reaches it through a bounded outbound queue.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ConnectionRegistry>
//!                     ┌─────────────────────────┐
//!                     │ producer: Option<Handle>│
//!                     │ consumers: BTreeMap<    │
//!                     │   ConnectionId, Handle> │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Producer]              [Consumer]              [Consumer]
//!    data-frame              outbound rx             outbound rx
//!         │                       │                       │
//!         └──► Router::route_frame()──► handle.send() ──► WebSocket
//! ```
//!
//! # Shared Payloads
//!
//! `bytes::Bytes` uses reference counting, so every consumer queue holds the
//! same allocation as the inbound message and payloads are never re-encoded.
//! The one copy per target happens at the socket edge, where the writer task
//! turns a payload into an owned axum `Message`.

pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use entry::{ConnectionHandle, Liveness};
pub use error::SendError;
pub use frame::{ConnectionId, Payload};
pub use store::{ConnectionRegistry, RegistryStats};
