//! WebSocket server
//!
//! Transport plumbing around the relay core: accepts WebSocket upgrades,
//! enforces the connection limit and runs one task per connection.

pub mod config;
mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use listener::RelayServer;
