//! Protocol Messages
//!
//! Wire format pushed to viewers over WebSocket. Every tick the server sends
//! one JSON array with a [`MatchSnapshot`] per court, in court order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::events::MatchEvent;
use crate::game::state::{MatchState, MatchStatus};

/// An encoded snapshot batch, shared by every subscriber of one tick.
pub type Payload = Arc<str>;

/// Public view of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Court / match id.
    pub id: u32,
    /// Player A name.
    #[serde(rename = "p1")]
    pub player_a: String,
    /// Player B name.
    #[serde(rename = "p2")]
    pub player_b: String,
    /// Sets won by player A.
    #[serde(rename = "sets1")]
    pub sets_a: u8,
    /// Sets won by player B.
    #[serde(rename = "sets2")]
    pub sets_b: u8,
    /// Games in the current set, player A.
    #[serde(rename = "games1")]
    pub games_a: u8,
    /// Games in the current set, player B.
    #[serde(rename = "games2")]
    pub games_b: u8,
    /// `"LIVE"` or `"TERMINATO"`.
    pub status: MatchStatus,
    /// Elapsed time label.
    pub time: String,
    /// Most recent events, newest first.
    pub events: Vec<MatchEvent>,
    /// Completed set scores from player A's side.
    pub set_history: Vec<String>,
}

impl MatchSnapshot {
    /// Project a match as of `now`. Never mutates the match.
    pub fn capture(state: &MatchState, now: DateTime<Utc>) -> Self {
        Self {
            id: state.id,
            player_a: state.player_a.clone(),
            player_b: state.player_b.clone(),
            sets_a: state.sets_won[0],
            sets_b: state.sets_won[1],
            games_a: state.games[0],
            games_b: state.games[1],
            status: state.status,
            time: state.elapsed_label_at(now),
            events: state.recent_events().to_vec(),
            set_history: state.set_history.clone(),
        }
    }
}

/// Protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Snapshot batch could not be encoded.
    #[error("Failed to encode snapshots: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Encode a snapshot batch as a JSON array.
pub fn encode_snapshots(snapshots: &[MatchSnapshot]) -> Result<Payload, ProtocolError> {
    let json = serde_json::to_string(snapshots)?;
    Ok(Arc::from(json))
}

/// Decode a snapshot batch (used by viewers and tests).
pub fn decode_snapshots(payload: &str) -> Result<Vec<MatchSnapshot>, ProtocolError> {
    Ok(serde_json::from_str(payload)?)
}
