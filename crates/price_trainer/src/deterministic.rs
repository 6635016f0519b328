//! Deterministic utilities for reproducible training
//!
//! Provides an LCG-based RNG, deterministic hashing for per-tree seeds, and
//! tie-breaking logic so the same seed yields the same forest on every
//! platform and under any thread scheduling.

use std::num::Wrapping;

/// 64-bit linear congruential generator (Knuth MMIX constants).
///
/// Draws come from the high 32 bits of the state; the low bits of a
/// power-of-two LCG have short periods.
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 6_364_136_223_846_793_005;
    const INCREMENT: u64 = 1_442_695_040_888_963_407;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: Wrapping(seed),
        };
        // decorrelate small adjacent seeds
        rng.next_u32();
        rng
    }

    /// Next 32 random bits
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        (self.state.0 >> 32) as u32
    }

    /// Uniform value in `[0, max)`, 0 when `max == 0`.
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        ((self.next_u32() as u64 * max as u64) >> 32) as usize
    }
}

/// Fisher-Yates shuffle driven by `rng`
pub fn shuffle<T>(items: &mut [T], rng: &mut LcgRng) {
    for i in (1..items.len()).rev() {
        let j = rng.next_range(i + 1);
        items.swap(i, j);
    }
}

/// Deterministic xxhash64-like hash in pure i64 arithmetic
pub fn xxhash64_i64(data: &[i64], seed: i64) -> i64 {
    const PRIME1: i64 = 0x9E3779B185EBCA87_u64 as i64;
    const PRIME2: i64 = 0xC2B2AE3D27D4EB4F_u64 as i64;
    const PRIME3: i64 = 0x165667B19E3779F9_u64 as i64;
    const PRIME5: i64 = 0x85EBCA77C2B2AE63_u64 as i64;

    let mut h = seed.wrapping_add(PRIME5);

    for &val in data {
        h = h.wrapping_add(val.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// Seed of the bootstrap draw for tree `tree_idx`
pub fn tree_seed(seed: u64, tree_idx: usize) -> u64 {
    xxhash64_i64(&[tree_idx as i64], seed as i64) as u64
}

/// Deterministic tie-breaker for split selection
/// Orders equal-gain candidates by (feature_idx, threshold, node_id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            node_id,
        }
    }
}
