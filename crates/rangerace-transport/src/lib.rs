//! WebSocket transport for rangerace.
//!
//! The server listens on one TCP address and upgrades connections on a
//! single HTTP path. [`WebSocketTransport::accept`] hands back a
//! [`PendingConnection`] whose upgrade runs in the connection's own task, so
//! a client that stalls mid-handshake never blocks the accept loop.
//!
//! [`WebSocketConnection`] locks its sink and stream halves independently:
//! one task can sit in [`recv`](WebSocketConnection::recv) while another
//! sends, which is exactly how the server drives each connection (a read
//! loop plus a writer task).

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{PendingConnection, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
