//! Debug overlay: the vector field sampled on a coarse screen grid.

use glam::DVec2;

/// Screen-space distance between samples, in pixels.
pub const DEFAULT_STRIDE: usize = 50;
/// Length of a unit-magnitude arrow, in pixels.
pub const DEFAULT_MAX_LENGTH: f64 = 30.0;

/// One sampled vector, positioned in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub origin: DVec2,
    /// Unit direction.
    pub direction: DVec2,
    pub magnitude: f64,
}

impl Glyph {
    /// Line segment `(tail, head)` centred on the sample point, for a unit
    /// arrow of `max_length`. Magnitudes above 1 draw at full length.
    pub fn segment(&self, max_length: f64) -> (DVec2, DVec2) {
        let half = self.direction * (self.magnitude.min(1.0) * max_length / 2.0);
        (self.origin - half, self.origin + half)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorFieldOverlay {
    pub stride: usize,
    pub max_length: f64,
}

impl Default for VectorFieldOverlay {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl VectorFieldOverlay {
    /// Samples `field` at every `stride` pixels over `0..=width × 0..=height`
    /// and keeps vectors longer than `threshold`.
    pub fn glyphs(
        &self,
        width: usize,
        height: usize,
        threshold: f64,
        field: impl Fn(f64, f64) -> DVec2,
    ) -> Vec<Glyph> {
        let stride = self.stride.max(1);
        let (hw, hh) = (width as f64 / 2.0, height as f64 / 2.0);
        let mut out = Vec::new();
        for sy in (0..=height).step_by(stride) {
            for sx in (0..=width).step_by(stride) {
                let origin = DVec2::new(sx as f64 - hw, hh - sy as f64);
                let v = field(origin.x, origin.y);
                let magnitude = v.length();
                if magnitude > threshold {
                    out.push(Glyph {
                        origin,
                        direction: v / magnitude,
                        magnitude,
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_viewport_inclusive() {
        let overlay = VectorFieldOverlay::default();
        let glyphs = overlay.glyphs(100, 50, 0.0, |_, _| DVec2::new(1.0, 0.0));
        // x: 0, 50, 100; y: 0, 50.
        assert_eq!(glyphs.len(), 6);
        assert_eq!(glyphs[0].origin, DVec2::new(-50.0, 25.0));
        assert_eq!(glyphs[5].origin, DVec2::new(50.0, -25.0));
    }

    #[test]
    fn weak_vectors_are_suppressed() {
        let overlay = VectorFieldOverlay::default();
        let glyphs = overlay.glyphs(200, 200, 0.1, |x, _| {
            if x < 0.0 {
                DVec2::new(0.05, 0.0)
            } else {
                DVec2::new(0.0, 0.5)
            }
        });
        assert!(!glyphs.is_empty());
        assert!(glyphs.iter().all(|g| g.origin.x >= 0.0));
        assert!(glyphs.iter().all(|g| (g.direction - DVec2::Y).length() < 1e-12));
    }

    #[test]
    fn absent_field_yields_no_glyphs() {
        let overlay = VectorFieldOverlay::default();
        assert!(overlay.glyphs(640, 480, 0.01, |_, _| DVec2::ZERO).is_empty());
    }

    #[test]
    fn segment_scales_with_magnitude_and_caps() {
        let g = Glyph {
            origin: DVec2::new(1.0, 2.0),
            direction: DVec2::X,
            magnitude: 0.5,
        };
        assert_eq!(
            g.segment(30.0),
            (DVec2::new(-6.5, 2.0), DVec2::new(8.5, 2.0))
        );
        let strong = Glyph { magnitude: 4.0, ..g };
        assert_eq!(
            strong.segment(30.0),
            (DVec2::new(-14.0, 2.0), DVec2::new(16.0, 2.0))
        );
    }

    #[test]
    fn segment_is_centred_on_the_sample_point() {
        let g = Glyph {
            origin: DVec2::new(-40.0, 25.0),
            direction: DVec2::new(0.6, -0.8),
            magnitude: 0.75,
        };
        let (tail, head) = g.segment(30.0);
        assert!(((tail + head) / 2.0 - g.origin).length() < 1e-12);
        assert!(((head - tail).length() - 22.5).abs() < 1e-12);
        assert!(((head - tail).normalize() - g.direction).length() < 1e-12);
    }
}
