//! Wire protocol
//!
//! Inbound messages are JSON envelopes with a `type` discriminant. This
//! module turns a raw payload into an [`Envelope`] without touching the
//! bytes that will be forwarded.

pub mod envelope;

pub use envelope::{classify, Envelope, EnvelopeKind, ParseError};
