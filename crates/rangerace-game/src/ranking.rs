//! Scoring and standings.
//!
//! Each round the coordinator draws a target and scores every playing
//! client's stored interval against it. The [`Leaderboard`] keeps one row
//! per scored client, re-sorted after every update, and supplies the winner
//! when the round limit runs out.

use std::cmp::Ordering;

use rangerace_protocol::{ClientId, PlayerSummary};

use crate::Client;

// ---------------------------------------------------------------------------
// Guess scoring
// ---------------------------------------------------------------------------

/// Which branch of the scoring rule fired for a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The target landed exactly on one of the bounds.
    Exact,
    /// The target fell strictly inside the interval.
    Inside,
    /// The target missed the interval.
    Miss,
}

impl GuessOutcome {
    /// The per-client notice text for this outcome.
    pub fn notice(&self, target: u8) -> String {
        match self {
            Self::Exact => format!("exact match!: {target}"),
            Self::Inside => format!("nice, you guessed right!: {target}"),
            Self::Miss => format!("better luck next time!: {target}"),
        }
    }
}

/// Scores one guessed interval against the round target.
///
/// A bound hit is worth +5 and is checked before the inside case, so a
/// degenerate interval sitting on the target still scores +5. An inside hit
/// is worth 5 minus the interval width, which reaches zero and below once
/// the interval is 5 or wider. A miss costs 1 point.
pub fn score_guess(target: u8, lower: u8, upper: u8) -> (GuessOutcome, i32) {
    if target == lower || target == upper {
        (GuessOutcome::Exact, 5)
    } else if lower < target && target < upper {
        (GuessOutcome::Inside, 5 - i32::from(upper - lower))
    } else {
        (GuessOutcome::Miss, -1)
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// One scored client's row: the identity key plus the sort keys.
#[derive(Debug, Clone)]
struct ScoreRow {
    id: ClientId,
    name: String,
    total_score: i32,
    lower_bound: u8,
    upper_bound: u8,
}

/// Ranked standings for the current session.
///
/// Rows are keyed by client id and kept sorted: total score, then upper
/// bound, then lower bound, all descending, with ascending name as the
/// final tie break.
#[derive(Debug, Default)]
pub struct Leaderboard {
    rows: Vec<ScoreRow>,
}

impl Leaderboard {
    /// Inserts or updates the row for `client`, then re-sorts.
    pub(crate) fn record(&mut self, client: &Client) {
        let row = ScoreRow {
            id: client.id.clone(),
            name: client.name.clone(),
            total_score: client.total_score,
            lower_bound: client.lower_bound,
            upper_bound: client.upper_bound,
        };
        match self.rows.iter().position(|r| r.id == row.id) {
            Some(i) => self.rows[i] = row,
            None => self.rows.push(row),
        }
        self.rows.sort_by(rank_order);
    }

    /// Removes the row for `id`. Returns whether a row was removed.
    pub(crate) fn remove(&mut self, id: &ClientId) -> bool {
        match self.rows.iter().position(|r| r.id == *id) {
            Some(i) => {
                self.rows.remove(i);
                true
            }
            None => false,
        }
    }

    /// The current leader, if anyone has been scored.
    pub fn top(&self) -> Option<PlayerSummary> {
        self.rows.first().map(summary)
    }

    /// The full standings, best first.
    pub fn standings(&self) -> Vec<PlayerSummary> {
        self.rows.iter().map(summary).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    /// Number of scored clients.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nobody has been scored yet.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn summary(row: &ScoreRow) -> PlayerSummary {
    PlayerSummary {
        id: row.id.clone(),
        name: row.name.clone(),
        total_score: row.total_score,
    }
}

fn rank_order(a: &ScoreRow, b: &ScoreRow) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then_with(|| b.upper_bound.cmp(&a.upper_bound))
        .then_with(|| b.lower_bound.cmp(&a.lower_bound))
        .then_with(|| a.name.cmp(&b.name))
}

// ---------------------------------------------------------------------------
// RankingSystem
// ---------------------------------------------------------------------------

/// Round bookkeeping for the pool.
///
/// The round counter is per session; the tick counter spans the lifetime of
/// the pool and survives resets.
#[derive(Debug, Default)]
pub struct RankingSystem {
    pub(crate) leaderboard: Leaderboard,
    round: u32,
    ticks: u64,
}

impl RankingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the next round and returns its number, 1-based per session.
    pub(crate) fn begin_round(&mut self) -> u32 {
        self.ticks += 1;
        self.round += 1;
        self.round
    }

    /// Rounds played in the current session.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Round ticks processed over the lifetime of the pool.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ends the session cycle: the round counter and the standings are
    /// cleared, the lifetime tick count is kept.
    pub(crate) fn reset(&mut self) {
        self.round = 0;
        self.leaderboard.clear();
    }

    /// Read access to the standings.
    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
