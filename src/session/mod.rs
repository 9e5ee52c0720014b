//! Per-connection session handling
//!
//! This module provides:
//! - Message classification and dispatch
//! - Close/error cleanup of registry state

pub mod dispatch;
pub mod lifecycle;

pub use dispatch::{Dispatcher, MessageOutcome};
pub use lifecycle::{Cleanup, Lifecycle};
