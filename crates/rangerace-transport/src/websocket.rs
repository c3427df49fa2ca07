//! WebSocket listener and connection built on `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::{ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long the HTTP upgrade may take before the connection is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<TcpStream>;

// ---------------------------------------------------------------------------
// WebSocketTransport
// ---------------------------------------------------------------------------

/// Listens for TCP connections to be upgraded to WebSockets.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }

    /// Waits for the next TCP connection.
    ///
    /// The WebSocket upgrade has not happened yet. Call
    /// [`PendingConnection::upgrade`] from the connection's own task so a
    /// slow handshake cannot hold up the accept loop.
    pub async fn accept(&self) -> Result<PendingConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "accepted TCP connection");
        Ok(PendingConnection { id, peer, stream })
    }
}

// ---------------------------------------------------------------------------
// PendingConnection
// ---------------------------------------------------------------------------

/// An accepted TCP connection that has not completed its WebSocket
/// handshake yet.
pub struct PendingConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
}

impl PendingConnection {
    /// Returns the peer's socket address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Completes the WebSocket handshake.
    ///
    /// Requests for any path other than `path` are rejected with 404, and
    /// the whole handshake is bounded by a timeout.
    pub async fn upgrade(
        self,
        path: &str,
        write_deadline: Duration,
    ) -> Result<WebSocketConnection, TransportError> {
        let expected = path.to_string();
        let check_path = move |req: &Request, resp: Response| {
            if req.uri().path() == expected {
                Ok(resp)
            } else {
                let mut reject = ErrorResponse::new(None);
                *reject.status_mut() = StatusCode::NOT_FOUND;
                Err(reject)
            }
        };

        let ws = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            tokio_tungstenite::accept_hdr_async(self.stream, check_path),
        )
        .await
        .map_err(|_| TransportError::HandshakeFailed("handshake timed out".to_string()))?
        .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        tracing::debug!(id = %self.id, peer = %self.peer, "WebSocket handshake complete");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id: self.id,
            write_deadline,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

// ---------------------------------------------------------------------------
// WebSocketConnection
// ---------------------------------------------------------------------------

/// A single upgraded WebSocket connection.
///
/// The send and receive halves are locked independently, so a reader parked
/// in [`recv`](Self::recv) never starves a concurrent [`send`](Self::send).
pub struct WebSocketConnection {
    id: ConnectionId,
    write_deadline: Duration,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// Sends one text frame, bounded by the write deadline.
    ///
    /// A peer that stops draining its socket fails here with
    /// [`TransportError::SendTimeout`] instead of wedging the caller.
    pub async fn send(&self, text: &str) -> Result<(), TransportError> {
        let msg = Message::text(text.to_string());
        let mut sink = self.sink.lock().await;
        tokio::time::timeout(self.write_deadline, sink.send(msg))
            .await
            .map_err(|_| TransportError::SendTimeout(self.write_deadline))?
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Receives the next text payload.
    ///
    /// Returns `Ok(None)` once the peer has closed. Binary frames are
    /// accepted when they hold valid UTF-8; ping and pong frames are
    /// skipped.
    pub async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data.to_vec())
                        .map(Some)
                        .map_err(|e| TransportError::ReceiveFailed(e.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
    }

    /// Flushes and closes the connection.
    pub async fn close(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.close()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}
