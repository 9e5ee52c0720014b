//! WebSocket frame relay
//!
//! One producer connection streams frames; any number of consumer
//! connections receive a copy of each. Consumers (or anyone else) can send
//! control messages back to the producer.
//!
//! ```text
//!   producer ──data-frame──►  Relay  ──data-frame──► consumer
//!            ◄──control────          ──data-frame──► consumer
//!                                    ◄──control───── consumer
//! ```
//!
//! Messages are JSON envelopes with a `type` discriminant. The relay reads
//! the discriminant and forwards the original bytes untouched.
//!
//! # Example
//!
//! ```no_run
//! use frame_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> frame_relay::error::Result<()> {
//! let config = ServerConfig::default().max_connections(100);
//! let server = RelayServer::new(config);
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod routing;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result, TransportError};
pub use protocol::{classify, Envelope, EnvelopeKind, ParseError};
pub use registry::{
    ConnectionHandle, ConnectionId, ConnectionRegistry, Liveness, Payload, SendError,
};
pub use relay::Relay;
pub use routing::{ControlDelivery, DeliveryReport, Router};
pub use server::{RelayServer, ServerConfig};
pub use session::{Cleanup, MessageOutcome};
pub use stats::{RelayStats, StatsSnapshot};
