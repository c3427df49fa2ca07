//! Error types for the transport layer.

use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade did not complete: wrong path, bad handshake,
    /// or a client that stalled past the handshake timeout.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Writing a frame to the socket failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The peer did not accept a frame within the write deadline.
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),

    /// Reading a frame from the socket failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}
