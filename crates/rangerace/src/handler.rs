//! Per-connection handling.
//!
//! Each accepted connection runs [`handle_connection`] in its own task:
//! finish the WebSocket upgrade, mint a [`ClientId`], register with the
//! coordinator, then read inbound messages until the connection dies. A
//! separate writer task drains the client's outbound channel into the
//! socket, so a slow socket never blocks the coordinator.

use std::sync::Arc;
use std::time::Duration;

use rangerace_game::CoordinatorHandle;
use rangerace_protocol::{ClientId, ClientMessage, ServerMessage};
use rangerace_transport::{PendingConnection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ServerError;

pub(crate) async fn handle_connection(
    pending: PendingConnection,
    coordinator: CoordinatorHandle,
    ws_path: String,
    write_deadline: Duration,
) -> Result<(), ServerError> {
    let conn = Arc::new(pending.upgrade(&ws_path, write_deadline).await?);
    let client_id = ClientId::generate();
    tracing::info!(conn_id = %conn.id(), %client_id, "client connected");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx));

    // Registration precedes the first read, so the welcome is always the
    // first event the client sees.
    coordinator.register(client_id.clone(), tx).await?;

    let result = read_loop(&conn, &coordinator).await;

    // Unregistering drops the sender inside the coordinator, which closes
    // the outbound channel and ends the writer task.
    let _ = coordinator.unregister(client_id.clone()).await;
    let _ = conn.close().await;
    let _ = writer.await;

    tracing::info!(conn_id = %conn.id(), %client_id, "client disconnected");
    result
}

/// Reads inbound messages until the connection ends.
///
/// A clean close by the peer ends the loop with `Ok`; a transport failure,
/// an unparsable message, or a vanished coordinator ends it with the error.
/// Messages carrying an unknown id are dropped inside the coordinator
/// instead.
async fn read_loop(
    conn: &WebSocketConnection,
    coordinator: &CoordinatorHandle,
) -> Result<(), ServerError> {
    loop {
        match conn.recv().await {
            Ok(Some(text)) => {
                let msg = ClientMessage::from_json(&text)?;
                coordinator.submit(msg).await?;
            }
            Ok(None) => {
                tracing::debug!(conn_id = %conn.id(), "connection closed by peer");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Drains the outbound channel into the socket.
///
/// Ends when the channel closes or a write fails or times out; the socket
/// is closed on the way out either way.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let text = match msg.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "dropping unencodable event");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, closing");
            break;
        }
    }
    let _ = conn.close().await;
}
