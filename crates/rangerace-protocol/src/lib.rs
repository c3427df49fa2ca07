//! Wire protocol for rangerace.
//!
//! Everything that travels over the WebSocket is defined here: the flat JSON
//! messages clients send ([`ClientMessage`]), the tagged events the server
//! sends back ([`ServerMessage`]), and the identifier both sides use to name
//! a client ([`ClientId`]).
//!
//! This crate knows nothing about sockets or game state. It only defines
//! shapes and converts them to and from JSON text.

mod error;
mod types;

pub use error::ProtocolError;
pub use types::{ClientId, ClientMessage, PlayerMode, PlayerSummary, ServerMessage};
