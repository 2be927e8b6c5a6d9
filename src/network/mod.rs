//! Network Layer
//!
//! Broadcast scheduling and the WebSocket server.
//! This layer is **non-deterministic** - all score logic runs through `game/`.

pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod server;

pub use protocol::{MatchSnapshot, Payload, ProtocolError, encode_snapshots, decode_snapshots};
pub use registry::{SubscriberRegistry, SubscriberId, DeliveryError, DeliveryReport};
pub use scheduler::{BroadcastScheduler, TickReport};
pub use server::{LiveScoreServer, ServerConfig, ServerError, ConfigError};
