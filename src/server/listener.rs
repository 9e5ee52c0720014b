//! Relay server listener
//!
//! Serves the WebSocket endpoint and a health endpoint, and hands every
//! upgraded socket to its own connection task.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::relay::Relay;
use crate::server::config::ServerConfig;
use crate::server::connection;
use crate::stats::StatsSnapshot;

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/health";

/// State shared with request handlers
struct AppState {
    relay: Arc<Relay>,
    connection_semaphore: Option<Arc<Semaphore>>,
    max_message_size: usize,
}

/// Relay server
pub struct RelayServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let state = AppState {
            relay: Arc::new(Relay::with_outbound_queue(config.outbound_queue_capacity)),
            connection_semaphore,
            max_message_size: config.max_message_size,
        };

        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Get a reference to the relay core
    pub fn relay(&self) -> &Arc<Relay> {
        &self.state.relay
    }

    /// Build the HTTP router
    ///
    /// The WebSocket handler extracts `ConnectInfo<SocketAddr>`, so the
    /// router must be served with `into_make_service_with_connect_info`, as
    /// [`RelayServer::serve`] does.
    pub(crate) fn router(&self) -> Router {
        let mut app = Router::new().route(&self.config.ws_path, get(ws_handler));

        if self.config.ws_path != HEALTH_PATH {
            app = app.route(HEALTH_PATH, get(health_handler));
        }

        app.layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Open WebSocket connections are not drained: they end with the
    /// runtime.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            ws_path = %self.config.ws_path,
            max_connections = self.config.max_connections,
            "Relay server listening"
        );
        Ok(listener)
    }

    /// Serve on an already bound listener
    ///
    /// Blocks until the listener fails. Useful when the caller picks the
    /// socket, for example binding port 0.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app).into_future().await?;
        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    // Check connection limit
    let permit = match state.connection_semaphore {
        Some(ref sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
            }
        },
        None => None,
    };

    let relay = Arc::clone(&state.relay);

    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            connection::serve(socket, relay, peer_addr).await;
        })
        .into_response()
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    producer: Option<u64>,
    consumers: usize,
    stats: StatsSnapshot,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let registry = state.relay.registry().stats().await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        producer: registry.producer.map(|id| id.get()),
        consumers: registry.consumer_count,
        stats: state.relay.stats().snapshot(),
    })
}
