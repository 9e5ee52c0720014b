//! Per-connection WebSocket task
//!
//! Each socket is split into a reader loop, which feeds the relay in
//! arrival order, and a writer task, which drains the connection's outbound
//! queue. The reader loop ends on close, on a transport error, or when the
//! writer fails, and then reports exactly one terminal event to the relay.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};

use crate::error::TransportError;
use crate::registry::Payload;
use crate::relay::Relay;

/// Run a WebSocket connection until it closes
pub(crate) async fn serve(socket: WebSocket, relay: Arc<Relay>, peer_addr: SocketAddr) {
    let (conn, mut outbound) = relay.connect();
    let conn_id = conn.id();

    tracing::info!(conn_id = %conn_id, peer = %peer_addr, "WebSocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_conn = conn.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if let Err(e) = ws_tx.send(to_message(payload)).await {
                writer_conn.mark_erroring();
                return Err(TransportError::Send(e.to_string()));
            }
        }
        Ok(())
    });

    let mut failure = None;

    loop {
        tokio::select! {
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    relay.handle_message(&conn, Payload::text(text)).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    relay.handle_message(&conn, Payload::binary(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(
                        conn_id = %conn_id,
                        code = frame.as_ref().map(|f| f.code),
                        "Close frame received"
                    );
                    break;
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Axum answers pings itself
                }
                Some(Err(e)) => {
                    failure = Some(TransportError::Receive(e.to_string()));
                    break;
                }
                None => break,
            },
            result = &mut writer => {
                failure = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e),
                    Err(e) => Some(TransportError::Send(e.to_string())),
                };
                break;
            }
        }
    }

    writer.abort();

    match failure {
        Some(e) => relay.on_error(&conn, &e).await,
        None => relay.on_close(&conn).await,
    };

    tracing::info!(conn_id = %conn_id, peer = %peer_addr, "WebSocket disconnected");
}

/// Convert a relayed payload back into a WebSocket message of the same kind
///
/// axum messages own their buffers, so this copies the shared payload.
fn to_message(payload: Payload) -> Message {
    match payload {
        // Text payloads are only ever built from `String`, so this is lossless
        Payload::Text(data) => Message::Text(String::from_utf8_lossy(&data).into_owned()),
        Payload::Binary(data) => Message::Binary(data.to_vec()),
    }
}
