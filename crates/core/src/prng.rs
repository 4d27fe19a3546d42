//! Seedable Xorshift64 generator driving particle placement and respawn.
//!
//! The simulation never touches a global RNG: every random draw comes from a
//! generator owned by the component that needs it, so a session seeded with
//! the same value replays the same particle history.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Xorshift64 PRNG with shifts (13, 7, 17).
///
/// A zero seed is replaced by a fixed non-zero constant, since zero is the
/// one state xorshift can never leave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    const ZERO_SEED_REPLACEMENT: u64 = 0x5EED_DEAD_BEEF_CAFE;

    /// Creates a generator from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 {
                Self::ZERO_SEED_REPLACEMENT
            } else {
                seed
            },
        }
    }

    /// Advances the state and returns it.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform f64 in [0, 1) built from the top 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform f64 in [min, max).
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Returns `true` with probability `p`. `p <= 0` never fires.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform point in the centred square `[-bounds/2, bounds/2)²`.
    pub fn point_in_square(&mut self, bounds: f64) -> DVec2 {
        let x = (self.next_f64() - 0.5) * bounds;
        let y = (self.next_f64() - 0.5) * bounds;
        DVec2::new(x, y)
    }
}
