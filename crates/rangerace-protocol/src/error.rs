//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a message to JSON failed.
    #[error("failed to encode message: {0}")]
    Encode(serde_json::Error),

    /// The peer sent something that is not a message: malformed JSON or
    /// fields of the wrong type.
    #[error("failed to decode message: {0}")]
    Decode(serde_json::Error),
}
