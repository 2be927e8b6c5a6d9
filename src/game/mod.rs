//! Match Simulation Module
//!
//! Per-match tennis simulation. Deterministic for a given seed, apart from
//! the wall-clock labels stamped on events.
//!
//! ## Module Structure
//!
//! - `state`: Match state, sides, status
//! - `tick`: The `advance` step and game/set/tiebreak resolution
//! - `events`: Event log entries and the highlight catalog
//! - `roster`: Player rosters and pairing strategies

pub mod state;
pub mod tick;
pub mod events;
pub mod roster;

// Re-export key types
pub use state::{MatchState, MatchStatus, Side};
pub use tick::{advance, advance_at, AdvanceOutcome};
pub use events::{MatchEvent, Highlight, HIGHLIGHTS};
pub use roster::{Pairing, PairingStrategy, PairingMode, FixedPairs, RandomBracket};
