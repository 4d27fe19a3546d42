//! Trail persistence: a ping-pong pair of colour buffers with decay.
//!
//! Each tick, strictly in order:
//!
//! 1. `read` holds last tick's composite; `write` is the other buffer.
//! 2. `write = decay(read)`, then the particles are splatted additively on top.
//! 3. The presented image is `decay(write)` ([`PresentMode::DoubleDecay`]) or
//!    `write` itself ([`PresentMode::Direct`]).
//! 4. Roles swap.
//!
//! A buffer is never read and written in the same pass. Stored history is
//! decayed exactly once per tick in both present modes.

use crate::error::FlowError;
use crate::ping_pong::PingPong;
use serde::{Deserialize, Serialize};

/// Fade factor lost per unit of `trail_decay`.
pub const FADE_RATE: f64 = 0.001;
/// Subtractive floor of the fade curve; guarantees extinction.
pub const FADE_FLOOR: f64 = 0.003;
/// Linear decay amount per unit of `trail_decay`.
pub const LINEAR_RATE: f64 = 0.0001;

/// Shape of the per-pixel decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayCurve {
    /// Multiplicative fade with a subtractive floor.
    #[default]
    Fade,
    /// Constant subtraction.
    Linear,
}

impl DecayCurve {
    pub fn name(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Linear => "linear",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fade" => Some(Self::Fade),
            "linear" => Some(Self::Linear),
            _ => None,
        }
    }
}

/// What reaches the screen each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentMode {
    /// Present `decay(write)`.
    #[default]
    DoubleDecay,
    /// Present `write` unchanged.
    Direct,
}

impl PresentMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::DoubleDecay => "double_decay",
            Self::Direct => "direct",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "double_decay" => Some(Self::DoubleDecay),
            "direct" => Some(Self::Direct),
            _ => None,
        }
    }
}

/// `v ↦ max(v·factor − epsilon, 0)`, applied per channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decay {
    pub factor: f32,
    pub epsilon: f32,
}

impl Decay {
    /// `factor` is clamped to [0, 1] and `epsilon` to be non-negative, which
    /// keeps the map monotone and non-increasing.
    pub fn new(factor: f32, epsilon: f32) -> Self {
        Self {
            factor: factor.clamp(0.0, 1.0),
            epsilon: epsilon.max(0.0),
        }
    }

    /// Maps the user-facing decay strength onto a curve.
    pub fn from_curve(curve: DecayCurve, trail_decay: f64) -> Self {
        match curve {
            DecayCurve::Fade => Self::new((1.0 - trail_decay * FADE_RATE) as f32, FADE_FLOOR as f32),
            DecayCurve::Linear => Self::new(1.0, (trail_decay * LINEAR_RATE) as f32),
        }
    }

    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        (v * self.factor - self.epsilon).max(0.0)
    }

    /// Upper bound on ticks for `v0` in [0, 1] to reach exactly zero, or
    /// `None` without a subtractive floor.
    ///
    /// Each tick removes at least `epsilon`; the bound allows half of that to
    /// be lost to f32 rounding.
    pub fn extinction_bound(&self, v0: f32) -> Option<u32> {
        if v0 <= 0.0 {
            return Some(0);
        }
        if self.epsilon <= 0.0 {
            return None;
        }
        Some((2.0 * v0 / self.epsilon).ceil() as u32)
    }
}

/// A full-screen RGB buffer of linear floats, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailBuffer {
    width: usize,
    height: usize,
    data: Vec<[f32; 3]>,
}

impl TrailBuffer {
    /// Creates a black buffer.
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        let len = width
            .checked_mul(height)
            .ok_or(FlowError::InvalidDimensions)?;
        Ok(Self {
            width,
            height,
            data: vec![[0.0; 3]; len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, rgb: [f32; 3]) {
        self.data[y * self.width + x] = rgb;
    }

    pub fn clear(&mut self) {
        self.data.fill([0.0; 3]);
    }

    fn check_same_size(&self, other: &TrailBuffer) -> Result<(), FlowError> {
        if self.width != other.width || self.height != other.height {
            return Err(FlowError::DimensionMismatch {
                lhs_w: self.width,
                lhs_h: self.height,
                rhs_w: other.width,
                rhs_h: other.height,
            });
        }
        Ok(())
    }

    /// Full-screen decay pass: every pixel becomes `decay(src)`.
    pub fn decay_from(&mut self, src: &TrailBuffer, decay: Decay) -> Result<(), FlowError> {
        self.check_same_size(src)?;
        for (dst, s) in self.data.iter_mut().zip(&src.data) {
            *dst = [decay.apply(s[0]), decay.apply(s[1]), decay.apply(s[2])];
        }
        Ok(())
    }

    pub fn copy_from(&mut self, src: &TrailBuffer) -> Result<(), FlowError> {
        self.check_same_size(src)?;
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Adds a soft disc centred at pixel coordinates `(cx, cy)`.
    ///
    /// Coverage falls off as `1 − (d/r)²`; the sum saturates at 1.
    pub fn splat(&mut self, cx: f64, cy: f64, radius: f64, color: [f32; 3], opacity: f32) {
        let r = radius.max(0.75);
        let x0 = (cx - r).floor().max(0.0) as usize;
        let y0 = (cy - r).floor().max(0.0) as usize;
        let x1 = ((cx + r).ceil() as isize).min(self.width as isize);
        let y1 = ((cy + r).ceil() as isize).min(self.height as isize);
        if x1 <= 0 || y1 <= 0 {
            return;
        }
        let inv_r2 = 1.0 / (r * r);
        for y in y0..y1 as usize {
            let dy = y as f64 + 0.5 - cy;
            for x in x0..x1 as usize {
                let dx = x as f64 + 0.5 - cx;
                let falloff = 1.0 - (dx * dx + dy * dy) * inv_r2;
                if falloff <= 0.0 {
                    continue;
                }
                let a = opacity * falloff as f32;
                let p = &mut self.data[y * self.width + x];
                for c in 0..3 {
                    p[c] = (p[c] + color[c] * a).min(1.0);
                }
            }
        }
    }
}

/// CPU trail compositor.
#[derive(Debug, Clone)]
pub struct TrailCompositor {
    buffers: [TrailBuffer; 2],
    presented: TrailBuffer,
    roles: PingPong,
}

impl TrailCompositor {
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        Ok(Self {
            buffers: [TrailBuffer::new(width, height)?, TrailBuffer::new(width, height)?],
            presented: TrailBuffer::new(width, height)?,
            roles: PingPong::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.presented.width()
    }

    pub fn height(&self) -> usize {
        self.presented.height()
    }

    /// Recreates every buffer at the new size. Trail history is discarded.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), FlowError> {
        *self = Self::new(width, height)?;
        log::debug!("trail buffers recreated at {width}x{height}");
        Ok(())
    }

    /// Runs one tick of the protocol. `draw` renders this tick's particles
    /// onto the decayed history.
    pub fn composite(
        &mut self,
        decay: Decay,
        present: PresentMode,
        draw: impl FnOnce(&mut TrailBuffer),
    ) -> Result<(), FlowError> {
        let (read, write) = self.roles.split(&mut self.buffers);
        write.decay_from(read, decay)?;
        draw(write);
        match present {
            PresentMode::DoubleDecay => self.presented.decay_from(write, decay)?,
            PresentMode::Direct => self.presented.copy_from(write)?,
        }
        self.roles.swap();
        Ok(())
    }

    /// The image shown this tick.
    pub fn presented(&self) -> &TrailBuffer {
        &self.presented
    }

    /// Last tick's stored composite, the input of the next decay pass.
    pub fn history(&self) -> &TrailBuffer {
        &self.buffers[self.roles.read_index()]
    }
}
