//! Core primitives.
//!
//! Seeded randomness shared by the simulation and startup pairing.

pub mod rng;

pub use rng::{DeterministicRng, derive_match_seed, entropy_seed};
