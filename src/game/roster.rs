//! Player Rosters and Pairing Strategies
//!
//! A pairing strategy produces the player-name pairs the server creates its
//! matches from. It runs once at startup.

use std::fmt;
use std::str::FromStr;

use crate::core::rng::DeterministicRng;

/// Roster used by the fixed five-court deployment, paired in order.
pub const FIXED_ROSTER: [&str; 10] = [
    "Carlos Alcaraz", "Jannik Sinner", "Alexander Zverev", "Novak Djokovic",
    "Daniil Medvedev", "Casper Ruud", "Andrey Rublev", "Hubert Hurkacz",
    "Alex de Minaur", "Grigor Dimitrov",
];

/// Pool the bracket deployment samples its round of sixteen from.
pub const BRACKET_POOL: [&str; 24] = [
    "Jannik Sinner", "Carlos Alcaraz", "Novak Djokovic", "Daniil Medvedev",
    "Alexander Zverev", "Andrey Rublev", "Casper Ruud", "Holger Rune",
    "Taylor Fritz", "Alex De Minaur", "Grigor Dimitrov", "Tommy Paul",
    "Lorenzo Musetti", "Ben Shelton", "Félix Auger-Aliassime", "Jack Draper",
    "Sebastian Korda", "Hubert Hurkacz", "Karen Khachanov", "Frances Tiafoe",
    "Alexander Bublik", "Sebastian Ofner", "Jaume Munar", "Brandon Nakashima",
];

/// Number of courts in the bracket deployment.
pub const BRACKET_COURTS: usize = 8;

/// Two player names that will face each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    /// Player A.
    pub player_a: String,
    /// Player B.
    pub player_b: String,
}

impl Pairing {
    /// Create a pairing.
    pub fn new(player_a: impl Into<String>, player_b: impl Into<String>) -> Self {
        Self {
            player_a: player_a.into(),
            player_b: player_b.into(),
        }
    }
}

/// Produces the match pairings for a run.
pub trait PairingStrategy: Send + Sync {
    /// Generate pairings using `rng` for any random choice.
    fn pairings(&self, rng: &mut DeterministicRng) -> Vec<Pairing>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Consecutive entries of a fixed roster play each other.
#[derive(Debug, Clone)]
pub struct FixedPairs {
    roster: Vec<String>,
}

impl FixedPairs {
    /// Pair `roster[0]` with `roster[1]`, `roster[2]` with `roster[3]`, and so on.
    /// A trailing odd name is left out.
    pub fn new<I, S>(roster: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roster: roster.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for FixedPairs {
    fn default() -> Self {
        Self::new(FIXED_ROSTER)
    }
}

impl PairingStrategy for FixedPairs {
    fn pairings(&self, _rng: &mut DeterministicRng) -> Vec<Pairing> {
        self.roster
            .chunks_exact(2)
            .map(|pair| Pairing::new(pair[0].clone(), pair[1].clone()))
            .collect()
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Courts filled by sampling players without replacement from a pool.
#[derive(Debug, Clone)]
pub struct RandomBracket {
    pool: Vec<String>,
    courts: usize,
}

impl RandomBracket {
    /// Sample `2 * courts` distinct players from `pool`.
    /// Fewer courts are produced if the pool is too small.
    pub fn new<I, S>(pool: I, courts: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pool: pool.into_iter().map(Into::into).collect(),
            courts,
        }
    }
}

impl Default for RandomBracket {
    fn default() -> Self {
        Self::new(BRACKET_POOL, BRACKET_COURTS)
    }
}

impl PairingStrategy for RandomBracket {
    fn pairings(&self, rng: &mut DeterministicRng) -> Vec<Pairing> {
        let drawn = rng.sample(&self.pool, self.courts * 2);
        drawn
            .chunks_exact(2)
            .map(|pair| Pairing::new(pair[0].clone(), pair[1].clone()))
            .collect()
    }

    fn name(&self) -> &'static str {
        "bracket"
    }
}

/// Deployment mode selecting a built-in strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingMode {
    /// Five courts from [`FIXED_ROSTER`].
    #[default]
    Fixed,
    /// Eight courts sampled from [`BRACKET_POOL`].
    Bracket,
}

impl PairingMode {
    /// Build the strategy for this mode.
    pub fn strategy(self) -> Box<dyn PairingStrategy> {
        match self {
            PairingMode::Fixed => Box::new(FixedPairs::default()),
            PairingMode::Bracket => Box::new(RandomBracket::default()),
        }
    }
}

impl FromStr for PairingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(PairingMode::Fixed),
            "bracket" => Ok(PairingMode::Bracket),
            other => Err(format!("unknown pairing mode '{}'", other)),
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingMode::Fixed => write!(f, "fixed"),
            PairingMode::Bracket => write!(f, "bracket"),
        }
    }
}
