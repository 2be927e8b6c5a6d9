//! Match Events
//!
//! Human-readable entries in a match's event log, and the fixed catalog of
//! highlights that can be injected between games.

use serde::{Serialize, Deserialize};

/// Icon for a plain game win.
pub const ICON_GAME: &str = "🎾";
/// Icon for a tiebreak win.
pub const ICON_TIEBREAK: &str = "🏆";
/// Icon for a set win.
pub const ICON_SET: &str = "⭐";
/// Icon for the match win.
pub const ICON_MATCH: &str = "🏆";

/// One entry of a match's event log.
///
/// Immutable once created. `time` is the elapsed-time label of the match at
/// the moment the event was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    /// Elapsed time label (`m:ss`).
    pub time: String,
    /// Display text.
    pub text: String,
    /// Display icon.
    pub icon: String,
}

impl MatchEvent {
    /// Create a new event.
    pub fn new(time: impl Into<String>, text: impl Into<String>, icon: &str) -> Self {
        Self {
            time: time.into(),
            text: text.into(),
            icon: icon.to_string(),
        }
    }

    /// A player won a game.
    pub fn game_won(time: String, winner: &str) -> Self {
        Self::new(time, format!("Game won by {}", winner), ICON_GAME)
    }

    /// Games reached 6-6 and the tiebreak begins.
    pub fn tiebreak_started(time: String) -> Self {
        Self::new(time, "Tiebreak in progress!", ICON_GAME)
    }

    /// A player won the 6-6 tiebreak; `score` is display-only.
    pub fn tiebreak_won(time: String, winner: &str, score: &str) -> Self {
        Self::new(time, format!("Tiebreak won by {} ({})", winner, score), ICON_TIEBREAK)
    }

    /// A player won a set, `score` from player A's side.
    pub fn set_won(time: String, winner: &str, score: &str) -> Self {
        Self::new(time, format!("SET won by {} ({})", winner, score), ICON_SET)
    }

    /// A player won the match.
    pub fn match_won(time: String, winner: &str) -> Self {
        Self::new(time, format!("MATCH won by {}!", winner), ICON_MATCH)
    }

    /// A highlight from the catalog credited to a player.
    pub fn highlight(time: String, player: &str, highlight: &Highlight) -> Self {
        Self::new(time, format!("{}: {}", player, highlight.text), highlight.icon)
    }
}

/// A catalog entry that may be injected into the event log.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Highlight {
    /// Display text.
    pub text: &'static str,
    /// Display icon.
    pub icon: &'static str,
    /// Independent per-draw trigger probability.
    pub probability: f64,
}

/// Fixed highlight catalog.
pub static HIGHLIGHTS: [Highlight; 7] = [
    Highlight { text: "Ace!", icon: "⚡", probability: 0.30 },
    Highlight { text: "Double fault", icon: "❌", probability: 0.15 },
    Highlight { text: "Forehand winner", icon: "💥", probability: 0.25 },
    Highlight { text: "Spectacular passing shot", icon: "🔥", probability: 0.20 },
    Highlight { text: "Winning smash", icon: "⭐", probability: 0.20 },
    Highlight { text: "Break point saved", icon: "🛡️", probability: 0.15 },
    Highlight { text: "Break point!", icon: "🎯", probability: 0.15 },
];
