//! Game tunables and the session state flag.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Tunables for the game pool.
///
/// The defaults are the production rules: a round every 5 seconds, first to
/// land on exactly 21 points wins, 30 rounds per session, targets drawn from
/// 1..=10. Tests shrink the timings and pin the target range.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Players needed in the player room before a session starts.
    pub min_players: usize,
    /// Time between rounds while a session runs.
    pub round_interval: Duration,
    /// Countdown between a session ending and the waiting room promotion.
    pub reset_delay: Duration,
    /// A session ends after this many rounds even without a winner.
    pub round_limit: u32,
    /// Exact total score required to win. Overshooting does not count.
    pub win_score: i32,
    /// The round target is drawn uniformly from this range.
    pub target_range: RangeInclusive<u8>,
    /// Capacity of the coordinator's mailbox.
    pub mailbox_capacity: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            round_interval: Duration::from_secs(5),
            reset_delay: Duration::from_secs(15),
            round_limit: 30,
            win_score: 21,
            target_range: 1..=10,
            mailbox_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Whether a game session is currently running.
///
/// The pool starts `Idle`, flips to `InSession` once enough players have
/// elected to play, and returns to `Idle` when the session resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    InSession,
}

impl SessionState {
    /// Returns `true` while a session is running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InSession)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::InSession => write!(f, "InSession"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
