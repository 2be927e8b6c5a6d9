//! # Live Score Server
//!
//! Simulated tennis matches, scored once per tick and pushed to every
//! connected WebSocket viewer as a JSON snapshot array.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LIVE SCORE SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Match simulation (seeded)                 │
//! │  ├── state.rs    - Match state, status, elapsed label        │
//! │  ├── tick.rs     - Game / set / tiebreak resolution          │
//! │  ├── events.rs   - Event log and highlight catalog           │
//! │  └── roster.rs   - Rosters and pairing strategies            │
//! │                                                              │
//! │  network/        - Delivery (non-deterministic)              │
//! │  ├── protocol.rs - Snapshot wire format                      │
//! │  ├── registry.rs - Subscriber set and fan-out                │
//! │  ├── scheduler.rs- Tick loop: advance, encode, broadcast     │
//! │  └── server.rs   - WebSocket accept loop                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Every match owns an RNG derived from the master seed and its court id.
//! Given the same seed and tick count, scores and event texts are identical;
//! only the `m:ss` time labels depend on the wall clock.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::time::Duration;

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::state::{MatchState, MatchStatus, Side};
pub use game::tick::advance;
pub use network::protocol::MatchSnapshot;
pub use network::scheduler::BroadcastScheduler;
pub use network::server::{LiveScoreServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default broadcast period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Events carried per match in a snapshot.
pub const MAX_VISIBLE_EVENTS: usize = 15;

/// Sets needed to win a match (best of five).
pub const SETS_TO_WIN: u8 = 3;
