//! Routing engine
//!
//! Given the registry state, decides who receives a message and delivers it:
//! producer frames fan out to consumers, control messages go to the
//! producer.

pub mod router;

pub use router::{ControlDelivery, DeliveryReport, Router};
