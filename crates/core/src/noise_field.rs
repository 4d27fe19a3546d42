//! Perlin gradient-noise flow source.
//!
//! A [`FlowSource`] maps a world position and a time value to a 2D vector.
//! [`NoiseField`] is the base source of every session: two samples of one 3D
//! Perlin field, the second shifted along X by [`CHANNEL_OFFSET`], with time
//! as the third axis so the field evolves without discontinuities.

use glam::DVec2;
use noise::{NoiseFn, Perlin};

/// Offset between the X and Y channel lookups in noise space.
pub const CHANNEL_OFFSET: f64 = 100.0;

/// A source of 2D vectors over world space and time.
///
/// Implementations must be deterministic: the same inputs give the same output.
pub trait FlowSource: Send + Sync {
    /// Vector at world position `(x, y)` at time `time`.
    fn sample(&self, x: f64, y: f64, time: f64) -> DVec2;
}

/// Deterministic Perlin noise sampler.
///
/// The permutation table is built once from the seed; afterwards `sample` is a
/// pure function of `(x, y, t)` and the current scale.
pub struct NoiseField {
    noise: Perlin,
    scale: f64,
}

impl NoiseField {
    /// Creates a noise field with the given spatial scale.
    pub fn new(seed: u32, scale: f64) -> Self {
        Self {
            noise: Perlin::new(seed),
            scale,
        }
    }

    /// Spatial frequency applied to world coordinates.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Replaces the spatial scale. The simulation calls this at the top of
    /// every tick with the value read from the configuration.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }
}

impl FlowSource for NoiseField {
    /// Output components lie approximately in [-1, 1].
    fn sample(&self, x: f64, y: f64, time: f64) -> DVec2 {
        let sx = x * self.scale;
        let sy = y * self.scale;
        DVec2::new(
            self.noise.get([sx, sy, time]),
            self.noise.get([sx + CHANNEL_OFFSET, sy, time]),
        )
    }
}
