//! Seeded Randomness
//!
//! Xorshift128+ generator. Every match draws from its own stream, derived
//! from the server's master seed and the court id, so a court's score never
//! depends on how many values another court consumed.

use sha2::{Sha256, Digest};

/// Domain tag mixed into every per-match seed.
const MATCH_SEED_DOMAIN: &[u8] = b"LIVE_SCORE_MATCH_SEED_V1";

/// Xorshift128+ generator with a SplitMix64-expanded seed.
///
/// ```
/// use live_score::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(7);
/// let mut b = DeterministicRng::new(7);
/// assert_eq!(a.next_int(100), b.next_int(100));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterministicRng {
    s0: u64,
    s1: u64,
}

impl DeterministicRng {
    /// Seed a generator. Any seed is valid, including zero.
    pub fn new(seed: u64) -> Self {
        let mut cursor = seed;
        let s0 = splitmix64(&mut cursor);
        let s1 = splitmix64(&mut cursor);

        // An all-zero state would only ever emit zeros.
        if (s0 | s1) == 0 {
            return Self { s0: 1, s1: 1 };
        }
        Self { s0, s1 }
    }

    /// Raw 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        let (a, b) = (self.s0, self.s1);
        let out = a.wrapping_add(b);

        let mixed = a ^ b;
        self.s0 = a.rotate_left(24) ^ mixed ^ (mixed << 16);
        self.s1 = mixed.rotate_left(37);

        out
    }

    /// Uniform integer in `0..bound`. A zero bound yields 0.
    pub fn next_int(&mut self, bound: u32) -> u32 {
        match bound {
            0 => 0,
            n => (self.next_u64() % u64::from(n)) as u32,
        }
    }

    /// Uniform integer in `lo..=hi`. Returns `lo` when the range is empty.
    pub fn next_int_range(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_int(hi - lo + 1)
    }

    /// Uniform float in `[0, 1)`, 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (1u64 << 53) as f64;
        (self.next_u64() >> 11) as f64 * SCALE
    }

    /// Uniform float in `[lo, hi)`.
    pub fn next_f64_range(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_f64() * (hi - lo)
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// A uniformly chosen element, or `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_int(items.len() as u32) as usize)
    }

    /// Draw up to `count` distinct elements in random order.
    pub fn sample<T: Clone>(&mut self, items: &[T], count: usize) -> Vec<T> {
        let mut pool = items.to_vec();
        let take = count.min(pool.len());

        // Partial Fisher-Yates: only the first `take` slots are settled.
        for i in 0..take {
            let j = i + self.next_int((pool.len() - i) as u32) as usize;
            pool.swap(i, j);
        }
        pool.truncate(take);
        pool
    }
}

fn splitmix64(cursor: &mut u64) -> u64 {
    *cursor = cursor.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *cursor;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for court `match_id` under `master_seed`: the first eight bytes of
/// SHA-256 over the domain tag and both values, little-endian.
pub fn derive_match_seed(master_seed: u64, match_id: u32) -> u64 {
    let digest = Sha256::new()
        .chain_update(MATCH_SEED_DOMAIN)
        .chain_update(master_seed.to_le_bytes())
        .chain_update(match_id.to_le_bytes())
        .finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Seed from the wall clock and pid, for runs without a configured seed.
pub fn entropy_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut cursor = (nanos as u64) ^ ((nanos >> 64) as u64) ^ u64::from(std::process::id());
    splitmix64(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut left = DeterministicRng::new(99);
        let mut right = DeterministicRng::new(99);
        let a: Vec<u64> = (0..256).map(|_| left.next_u64()).collect();
        let b: Vec<u64> = (0..256).map(|_| right.next_u64()).collect();
        assert_eq!(a, b);

        assert_ne!(DeterministicRng::new(99).next_u64(), DeterministicRng::new(100).next_u64());
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = DeterministicRng::new(0);
        assert!((0..8).any(|_| rng.next_u64() != 0));
    }

    #[test]
    fn test_degenerate_bounds() {
        let mut rng = DeterministicRng::new(3);
        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
        assert_eq!(rng.next_int_range(5, 5), 5);
        assert_eq!(rng.next_int_range(6, 2), 6);
        assert_eq!(rng.next_f64_range(0.5, 0.5), 0.5);
        assert!(rng.choose::<u8>(&[]).is_none());
    }

    #[test]
    fn test_gate_range_hits_both_values() {
        let mut rng = DeterministicRng::new(5678);
        let draws: Vec<u32> = (0..200).map(|_| rng.next_int_range(1, 2)).collect();
        assert!(draws.contains(&1));
        assert!(draws.contains(&2));
        assert!(draws.iter().all(|d| *d == 1 || *d == 2));
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = DeterministicRng::new(31);
        assert!((0..100).all(|_| !rng.chance(0.0)));
        assert!((0..100).all(|_| rng.chance(1.0)));
    }

    #[test]
    fn test_sample_is_distinct() {
        let mut rng = DeterministicRng::new(2024);
        let pool: Vec<u32> = (0..24).collect();

        let mut picked = rng.sample(&pool, 16);
        assert_eq!(picked.len(), 16);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 16);

        assert_eq!(rng.sample(&pool[..3], 10).len(), 3);
    }

    #[test]
    fn test_match_seeds_are_independent() {
        assert_eq!(derive_match_seed(7, 0), derive_match_seed(7, 0));
        assert_ne!(derive_match_seed(7, 0), derive_match_seed(7, 1));
        assert_ne!(derive_match_seed(7, 0), derive_match_seed(8, 0));
    }

    proptest! {
        #[test]
        fn prop_next_int_in_bounds(seed in any::<u64>(), bound in 1u32..1_000) {
            let mut rng = DeterministicRng::new(seed);
            for _ in 0..32 {
                prop_assert!(rng.next_int(bound) < bound);
            }
        }

        #[test]
        fn prop_f64_range_in_bounds(seed in any::<u64>()) {
            let mut rng = DeterministicRng::new(seed);
            for _ in 0..32 {
                let unit = rng.next_f64();
                prop_assert!((0.0..1.0).contains(&unit));
                let strength = rng.next_f64_range(0.4, 0.6);
                prop_assert!((0.4..=0.6).contains(&strength));
            }
        }
    }
}
