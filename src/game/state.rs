//! Match State Definitions
//!
//! All state owned by a single simulated tennis match.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::events::MatchEvent;
use crate::network::protocol::MatchSnapshot;
use crate::{MAX_VISIBLE_EVENTS, SETS_TO_WIN};

/// Time label reported once a match is over.
pub const ENDED_LABEL: &str = "Fine";

/// Lower bound of player A's per-game win probability.
pub const STRENGTH_MIN: f64 = 0.4;
/// Upper bound of player A's per-game win probability.
pub const STRENGTH_MAX: f64 = 0.6;

// =============================================================================
// SIDE
// =============================================================================

/// One of the two players of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// First listed player (`p1` on the wire).
    A = 0,
    /// Second listed player (`p2` on the wire).
    B = 1,
}

impl Side {
    /// Index into two-element score arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The other player.
    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Match status. Goes `Live` -> `Finished` once and never back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Match in progress.
    #[default]
    #[serde(rename = "LIVE")]
    Live,
    /// A player has won three sets.
    #[serde(rename = "TERMINATO")]
    Finished,
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Complete state of one match.
#[derive(Clone, Debug)]
pub struct MatchState {
    /// Ordinal id, assigned at creation.
    pub id: u32,
    /// Player A display name.
    pub player_a: String,
    /// Player B display name.
    pub player_b: String,
    /// Sets won, indexed by [`Side::index`].
    pub sets_won: [u8; 2],
    /// Games in the current set.
    pub games: [u8; 2],
    /// Live or finished.
    pub status: MatchStatus,
    /// Wall-clock creation time.
    pub started_at: DateTime<Utc>,
    /// Event log, newest first.
    pub events: Vec<MatchEvent>,
    /// Number of `advance` calls while live.
    pub tick_counter: u64,
    /// Player A's per-game win probability.
    pub strength: f64,
    /// Final set scores from player A's side, oldest first.
    pub set_history: Vec<String>,
    /// Match random source.
    pub rng: DeterministicRng,
}

impl MatchState {
    /// Create a live match starting now.
    pub fn new(
        id: u32,
        player_a: impl Into<String>,
        player_b: impl Into<String>,
        rng_seed: u64,
    ) -> Self {
        Self::new_at(id, player_a, player_b, rng_seed, Utc::now())
    }

    /// Create a live match with an explicit start time.
    pub fn new_at(
        id: u32,
        player_a: impl Into<String>,
        player_b: impl Into<String>,
        rng_seed: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut rng = DeterministicRng::new(rng_seed);
        let strength = rng.next_f64_range(STRENGTH_MIN, STRENGTH_MAX);

        Self {
            id,
            player_a: player_a.into(),
            player_b: player_b.into(),
            sets_won: [0, 0],
            games: [0, 0],
            status: MatchStatus::Live,
            started_at,
            events: Vec::new(),
            tick_counter: 0,
            strength,
            set_history: Vec::new(),
            rng,
        }
    }

    /// Display name of a side.
    pub fn player_name(&self, side: Side) -> &str {
        match side {
            Side::A => &self.player_a,
            Side::B => &self.player_b,
        }
    }

    /// Whether the match is over.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// The side that won the match, if it is over.
    pub fn winner(&self) -> Option<Side> {
        if !self.is_finished() {
            return None;
        }
        if self.sets_won[Side::A.index()] >= SETS_TO_WIN {
            Some(Side::A)
        } else {
            Some(Side::B)
        }
    }

    /// Number of completed sets.
    pub fn sets_played(&self) -> usize {
        self.sets_won.iter().map(|s| *s as usize).sum()
    }

    /// Prepend an event to the log.
    pub fn push_event(&mut self, event: MatchEvent) {
        self.events.insert(0, event);
    }

    /// Elapsed time label as of now.
    pub fn elapsed_label(&self) -> String {
        self.elapsed_label_at(Utc::now())
    }

    /// Elapsed time label (`m:ss`) as of `now`, or [`ENDED_LABEL`] once finished.
    pub fn elapsed_label_at(&self, now: DateTime<Utc>) -> String {
        if self.is_finished() {
            return ENDED_LABEL.to_string();
        }
        let elapsed = (now - self.started_at).num_seconds().max(0);
        format!("{}:{:02}", elapsed / 60, elapsed % 60)
    }

    /// The newest events, as exposed to viewers.
    pub fn recent_events(&self) -> &[MatchEvent] {
        let len = self.events.len().min(MAX_VISIBLE_EVENTS);
        &self.events[..len]
    }

    /// Side-effect-free snapshot as of now.
    pub fn to_public_view(&self) -> MatchSnapshot {
        MatchSnapshot::capture(self, Utc::now())
    }

    /// Check scoring invariants. Panics in debug builds only.
    #[inline]
    pub fn debug_check_invariants(&self) {
        debug_assert!(
            self.sets_won.iter().all(|s| *s <= SETS_TO_WIN),
            "sets_won over limit: {:?}",
            self.sets_won
        );
        debug_assert_eq!(self.set_history.len(), self.sets_played(), "set history out of sync");
        debug_assert_eq!(
            self.is_finished(),
            self.sets_won.contains(&SETS_TO_WIN),
            "status does not match sets won"
        );
    }
}
