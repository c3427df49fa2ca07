//! Unified error type for the rangerace server.

use rangerace_game::GameError;
use rangerace_protocol::ProtocolError;
use rangerace_transport::TransportError;

/// Top-level error wrapping the layer-specific ones.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, handshake, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A game-level error (the coordinator is gone).
    #[error(transparent)]
    Game(#[from] GameError),
}
