//! # rangerace
//!
//! A real-time multiplayer range-guessing game server.
//!
//! Clients connect over WebSocket, elect to play, and each round submit an
//! interval they believe brackets the server's random target. Tight guesses
//! score points, the first player to land on exactly 21 wins, and the pool
//! resets itself for the next game.
//!
//! ```rust,no_run
//! use rangerace::ServerBuilder;
//!
//! # async fn run() -> Result<(), rangerace::ServerError> {
//! let server = ServerBuilder::new().bind("0.0.0.0:8080").build().await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ServerError;
pub use server::{Server, ServerBuilder};

pub use rangerace_game::{CoordinatorHandle, GameConfig, PoolSnapshot, SessionState};
pub use rangerace_protocol::{ClientId, ClientMessage, PlayerMode, PlayerSummary, ServerMessage};
