//! The wire types.
//!
//! Inbound messages are flat JSON objects with no `type` tag: the
//! `playerMode` field says what the client wants. Outbound events carry a
//! kebab-case `type` tag so the browser can switch on it.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// Opaque identifier the server assigns to each connection.
///
/// Serializes transparently as its inner string, so it appears on the wire
/// as `"6b86b273..."` rather than a wrapper object.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Generates a fresh id: 16 random bytes rendered as 32 hex characters.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Inbound messages
// ---------------------------------------------------------------------------

/// What a client wants, carried in the `playerMode` field.
///
/// The browser sends `"play"` to enter the game and `"roundPlay"` to submit
/// a guess. Anything else, including a missing field, maps to
/// [`PlayerMode::Unknown`] instead of failing the whole message, because a
/// message without a mode can still carry a player name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayerMode {
    /// Join the current or next game.
    Play,
    /// Submit a guessed interval for the running round.
    RoundPlay,
    /// Unrecognized or absent mode.
    #[default]
    Unknown,
}

impl From<String> for PlayerMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "play" => Self::Play,
            "roundPlay" => Self::RoundPlay,
            _ => Self::Unknown,
        }
    }
}

impl From<PlayerMode> for String {
    fn from(mode: PlayerMode) -> Self {
        match mode {
            PlayerMode::Play => "play".to_string(),
            PlayerMode::RoundPlay => "roundPlay".to_string(),
            PlayerMode::Unknown => String::new(),
        }
    }
}

/// A gameplay message from a client.
///
/// Every field is optional on the wire and defaults to its zero value,
/// matching what the browser actually sends: a `play` message carries no
/// inputs, and the name may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientMessage {
    /// The id the server handed out in the welcome event.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Display name. The server keeps the first non-empty one it sees.
    pub player: String,
    #[serde(rename = "playerMode")]
    pub player_mode: PlayerMode,
    /// One end of the guessed interval, in either order.
    pub input1: u8,
    /// The other end of the guessed interval.
    pub input2: u8,
}

impl ClientMessage {
    /// Parses a message from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// Encodes the message as JSON text.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// The public view of a client, as it appears in scoreboards and winner
/// announcements. Guess bounds and internal flags never leave the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: ClientId,
    pub name: String,
    #[serde(rename = "totalScore")]
    pub total_score: i32,
}

/// An event from the server, tagged with a kebab-case `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// General notice: welcomes, joins, disconnects, reset countdowns.
    ///
    /// `clientID` is present only on the personal welcome, where it tells
    /// the client the id it must echo in every message.
    GameInfo {
        info: String,
        #[serde(
            rename = "clientID",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        client_id: Option<ClientId>,
    },
    /// Sent to a client that asked to play while a game is in session.
    PlayerWait { info: String },
    /// A game session has started.
    GameStart { info: String },
    /// Per-client scoring result for one round.
    PlayInfo { info: String },
    /// End-of-round standings, best first.
    Scoreboard {
        info: String,
        scoreboard: Vec<PlayerSummary>,
    },
    /// Someone won, either by reaching the target score or by leading when
    /// the round limit ran out.
    GameWinner { info: String, winner: PlayerSummary },
    /// The session is over; a reset follows.
    GameEnd,
}

impl ServerMessage {
    /// Encodes the event as JSON text.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Parses an event from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
