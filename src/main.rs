//! Frame relay server
//!
//! Run with: frame-relay [--port PORT] [--bind ADDR]
//!
//! ## Producer
//!
//! Connect to `ws://HOST:PORT/` and send `{"type": "producer-register"}`,
//! then stream `{"type": "data-frame", ...}` messages.
//!
//! ## Consumers
//!
//! Connect to the same endpoint and send `{"type": "consumer-register"}`.
//! Every frame from the producer arrives unchanged. Send
//! `{"type": "control", ...}` to reach the producer.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use frame_relay::relay::DEFAULT_OUTBOUND_QUEUE;
use frame_relay::server::config::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT};
use frame_relay::{RelayServer, ServerConfig};

/// WebSocket frame relay: one producer, many consumers
#[derive(Parser, Debug)]
#[command(name = "frame-relay")]
#[command(version)]
struct Args {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Outbound queue depth per connection
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_QUEUE)]
    queue_capacity: usize,

    /// Maximum inbound message size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// WebSocket endpoint path
    #[arg(long, default_value = "/")]
    ws_path: String,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = format!("frame_relay={},tower_http=info", args.log_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = ServerConfig::with_addr(SocketAddr::new(args.bind, args.port))
        .max_connections(args.max_connections)
        .outbound_queue_capacity(args.queue_capacity)
        .max_message_size(args.max_message_size)
        .ws_path(args.ws_path);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Frame relay starting");
    tracing::info!("Relay endpoint: ws://{}{}", config.bind_addr, config.ws_path);

    let server = RelayServer::new(config);

    // Run with Ctrl+C handling
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Shut down");
    Ok(())
}
