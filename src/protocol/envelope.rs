//! Envelope classification
//!
//! Every inbound message is a JSON object carrying a `type` discriminant.
//! Classification only reads the discriminant; the rest of the object is
//! role-specific and is never validated or rewritten.
//!
//! # Discriminants
//!
//! | Canonical           | Also accepted | Meaning                          |
//! |---------------------|---------------|----------------------------------|
//! | `producer-register` | `simulation`  | sender becomes the producer      |
//! | `consumer-register` | `viewer`      | sender joins the consumer set    |
//! | `data-frame`        | `frame`       | frame to fan out to consumers    |
//! | `control`           |               | message for the current producer |
//!
//! The short forms are what deployed simulation streamers and browser
//! viewers send.

use serde_json::Value;

use crate::registry::Payload;

/// Role intent of an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Sender registers as the producer
    ProducerRegister,
    /// Sender registers as a consumer
    ConsumerRegister,
    /// Frame data from the producer
    DataFrame,
    /// Control message addressed to the producer
    Control,
    /// Missing, non-string or unknown discriminant
    Unrecognized(Option<String>),
}

impl EnvelopeKind {
    /// Map a discriminant string to a kind
    pub fn from_discriminant(discriminant: &str) -> Self {
        match discriminant {
            "producer-register" | "simulation" => EnvelopeKind::ProducerRegister,
            "consumer-register" | "viewer" => EnvelopeKind::ConsumerRegister,
            "data-frame" | "frame" => EnvelopeKind::DataFrame,
            "control" => EnvelopeKind::Control,
            other => EnvelopeKind::Unrecognized(Some(other.to_string())),
        }
    }

    /// Canonical discriminant, if recognized
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            EnvelopeKind::ProducerRegister => Some("producer-register"),
            EnvelopeKind::ConsumerRegister => Some("consumer-register"),
            EnvelopeKind::DataFrame => Some("data-frame"),
            EnvelopeKind::Control => Some("control"),
            EnvelopeKind::Unrecognized(_) => None,
        }
    }
}

/// A classified inbound message
#[derive(Debug, Clone)]
pub struct Envelope {
    kind: EnvelopeKind,
    value: Value,
}

impl Envelope {
    /// Role intent
    pub fn kind(&self) -> &EnvelopeKind {
        &self.kind
    }

    /// Parsed message body
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Payload is not well-formed JSON
#[derive(Debug)]
pub struct ParseError {
    source: serde_json::Error,
}

impl ParseError {
    /// Line of the syntax error
    pub fn line(&self) -> usize {
        self.source.line()
    }

    /// Column of the syntax error
    pub fn column(&self) -> usize {
        self.source.column()
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Malformed envelope: {}", self.source)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Parse a payload and determine its role intent
///
/// Only a payload that is not valid JSON is an error. Valid JSON without a
/// string `type` field (including non-object values) classifies as
/// [`EnvelopeKind::Unrecognized`].
pub fn classify(payload: &Payload) -> Result<Envelope, ParseError> {
    let value: Value =
        serde_json::from_slice(payload.as_bytes()).map_err(|source| ParseError { source })?;

    let kind = match value.get("type") {
        Some(Value::String(discriminant)) => EnvelopeKind::from_discriminant(discriminant),
        Some(other) => EnvelopeKind::Unrecognized(Some(other.to_string())),
        None => EnvelopeKind::Unrecognized(None),
    };

    Ok(Envelope { kind, value })
}
