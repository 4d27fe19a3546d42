//! Continuous sampling of the analysis raster in world space.
//!
//! World coordinates live in the square `[-bounds/2, bounds/2]²` with Y up;
//! the raster has row 0 at the top. [`FieldSampler`] maps between the two and
//! bilinearly interpolates the four surrounding texels.

use crate::raster::LowResField;
use glam::DVec2;

/// Maps world positions onto a [`LowResField`] and interpolates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSampler {
    /// Side length of the square world domain.
    pub bounds: f64,
    /// Mirror the column lookup and negate X (mirrored camera correction).
    pub flip_x: bool,
    /// Map world Y-up onto raster rows counted from the top.
    pub flip_y: bool,
}

impl FieldSampler {
    /// A sampler with the usual orientation: no X mirror, Y flipped.
    pub fn new(bounds: f64) -> Self {
        Self {
            bounds,
            flip_x: false,
            flip_y: true,
        }
    }

    /// Continuous raster coordinates for a world position.
    pub fn raster_coords(&self, field: &LowResField, x: f64, y: f64) -> (f64, f64) {
        let half = self.bounds / 2.0;
        let mut nx = (x + half) / self.bounds;
        let mut ny = (y + half) / self.bounds;
        if self.flip_x {
            nx = 1.0 - nx;
        }
        if self.flip_y {
            ny = 1.0 - ny;
        }
        (nx * field.width() as f64, ny * field.height() as f64)
    }

    /// Interpolated vector at world `(x, y)`.
    ///
    /// Returns zero when `field` is absent, when the bounds are degenerate, or
    /// when the position maps outside `[0, W) × [0, H)`.
    pub fn sample(&self, field: Option<&LowResField>, x: f64, y: f64) -> DVec2 {
        let Some(field) = field else {
            return DVec2::ZERO;
        };
        if !(self.bounds > 0.0) {
            return DVec2::ZERO;
        }

        let (vx, vy) = self.raster_coords(field, x, y);
        let (w, h) = (field.width(), field.height());
        let fx0 = vx.floor();
        let fy0 = vy.floor();
        if !(fx0 >= 0.0 && fx0 < w as f64 && fy0 >= 0.0 && fy0 < h as f64) {
            return DVec2::ZERO;
        }

        let x0 = fx0 as usize;
        let y0 = fy0 as usize;
        let x1 = (x0 + 1).min(w - 1);
        let y1 = (y0 + 1).min(h - 1);
        let fx = vx - fx0;
        let fy = vy - fy0;

        let v00 = field.get(x0, y0);
        let v10 = field.get(x1, y0);
        let v01 = field.get(x0, y1);
        let v11 = field.get(x1, y1);

        let v = v00.lerp(v10, fx).lerp(v01.lerp(v11, fx), fy);
        if self.flip_x {
            DVec2::new(-v.x, v.y)
        } else {
            v
        }
    }
}
