//! Game state and round logic for rangerace.
//!
//! The [`Coordinator`] is a single actor task that owns every piece of
//! shared state: the connected clients, the player and waiting rooms, the
//! session flag, and the [`RankingSystem`]. Connection handlers, the round
//! timer, and the reset countdown all post events into its mailbox and
//! never touch state directly, so no handler in this crate ever takes a
//! lock or awaits.
//!
//! # Key types
//!
//! - [`Coordinator`] / [`CoordinatorHandle`] for the actor and its mailbox
//! - [`RankingSystem`] / [`Leaderboard`] for rounds, scoring, and standings
//! - [`GameConfig`] / [`SessionState`] for the tunables and session flag
//! - [`Client`] for one connected player

mod client;
mod config;
mod coordinator;
mod error;
mod ranking;

pub use client::{Client, ClientSender};
pub use config::{GameConfig, SessionState};
pub use coordinator::{Coordinator, CoordinatorHandle, PoolSnapshot};
pub use error::GameError;
pub use ranking::{GuessOutcome, Leaderboard, RankingSystem, score_guess};
