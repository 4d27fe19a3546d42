//! Procedural video scenes.
//!
//! Each scene repaints one 640×480 RGB8 frame per `frame()` call, so a
//! scene's clock is the number of frames pulled from it.

use flowtrail_core::analysis::{SourceStatus, VideoFrame, VideoSource};
use flowtrail_core::error::FlowError;
use flowtrail_core::prng::Xorshift64;
use std::f64::consts::TAU;

pub const FRAME_WIDTH: usize = 640;
pub const FRAME_HEIGHT: usize = 480;

const BACKGROUND: [u8; 3] = [12, 14, 20];
const FOREGROUND: [u8; 3] = [235, 235, 225];

/// Frame storage and release state shared by the animated scenes.
struct Canvas {
    frame: VideoFrame,
    tick: u64,
    released: bool,
}

impl Canvas {
    fn new() -> Result<Self, FlowError> {
        Ok(Self {
            frame: VideoFrame::solid(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND)?,
            tick: 0,
            released: false,
        })
    }

    fn status(&self) -> SourceStatus {
        if self.released {
            SourceStatus::Unavailable("scene released".into())
        } else {
            SourceStatus::Ready
        }
    }

    /// Paints pixel `(x, y)` as `shade(x, y)` ∈ [0, 1] between background
    /// and foreground, then advances the clock.
    fn paint(&mut self, shade: impl Fn(f64, f64) -> f64) -> Option<&VideoFrame> {
        if self.released {
            return None;
        }
        let w = self.frame.width();
        for (i, px) in self.frame.as_bytes_mut().chunks_exact_mut(3).enumerate() {
            let (x, y) = ((i % w) as f64 + 0.5, (i / w) as f64 + 0.5);
            let t = shade(x, y).clamp(0.0, 1.0);
            for c in 0..3 {
                let (bg, fg) = (BACKGROUND[c] as f64, FOREGROUND[c] as f64);
                px[c] = (bg + (fg - bg) * t).round() as u8;
            }
        }
        self.tick += 1;
        Some(&self.frame)
    }
}

/// Antialiased step: 1 inside `edge`, 0 beyond `edge + 1`.
fn coverage(distance: f64, edge: f64) -> f64 {
    (edge + 1.0 - distance).clamp(0.0, 1.0)
}

/// A bright disc circling the frame centre.
pub struct Orbit {
    canvas: Canvas,
    phase: f64,
}

impl Orbit {
    pub const DISC_RADIUS: f64 = 40.0;
    pub const ORBIT_RADIUS: f64 = 150.0;
    /// Radians per frame.
    pub const ANGULAR_SPEED: f64 = 0.05;

    pub fn new(seed: u64) -> Result<Self, FlowError> {
        let phase = Xorshift64::new(seed).next_range(0.0, TAU);
        Ok(Self {
            canvas: Canvas::new()?,
            phase,
        })
    }

    /// Disc centre in frame pixels for a given tick.
    pub fn centre(&self, tick: u64) -> (f64, f64) {
        let a = self.phase + tick as f64 * Self::ANGULAR_SPEED;
        (
            FRAME_WIDTH as f64 / 2.0 + Self::ORBIT_RADIUS * a.cos(),
            FRAME_HEIGHT as f64 / 2.0 + Self::ORBIT_RADIUS * a.sin(),
        )
    }
}

impl VideoSource for Orbit {
    fn status(&mut self) -> SourceStatus {
        self.canvas.status()
    }

    fn frame(&mut self) -> Option<&VideoFrame> {
        let (cx, cy) = self.centre(self.canvas.tick);
        self.canvas
            .paint(|x, y| coverage((x - cx).hypot(y - cy), Self::DISC_RADIUS))
    }

    fn release(&mut self) {
        self.canvas.released = true;
    }
}

/// A vertical bar sweeping left to right, wrapping at the frame edge.
pub struct Sweep {
    canvas: Canvas,
    offset: f64,
}

impl Sweep {
    pub const BAR_WIDTH: f64 = 24.0;
    /// Pixels per frame.
    pub const SPEED: f64 = 8.0;

    pub fn new(seed: u64) -> Result<Self, FlowError> {
        let offset = Xorshift64::new(seed).next_range(0.0, FRAME_WIDTH as f64);
        Ok(Self {
            canvas: Canvas::new()?,
            offset,
        })
    }

    /// Left edge of the bar for a given tick.
    pub fn left(&self, tick: u64) -> f64 {
        (self.offset + tick as f64 * Self::SPEED).rem_euclid(FRAME_WIDTH as f64)
    }
}

impl VideoSource for Sweep {
    fn status(&mut self) -> SourceStatus {
        self.canvas.status()
    }

    fn frame(&mut self) -> Option<&VideoFrame> {
        let left = self.left(self.canvas.tick);
        let half = Self::BAR_WIDTH / 2.0;
        let centre = left + half;
        let w = FRAME_WIDTH as f64;
        self.canvas.paint(|x, _| {
            let d = (x - centre).rem_euclid(w);
            coverage(d.min(w - d), half)
        })
    }

    fn release(&mut self) {
        self.canvas.released = true;
    }
}

/// Static diagonal stripes, for edge mode.
pub struct Stripes {
    canvas: Canvas,
    shift: f64,
}

impl Stripes {
    /// Stripe period along the diagonal, in pixels.
    pub const PERIOD: f64 = 64.0;

    pub fn new(seed: u64) -> Result<Self, FlowError> {
        let shift = Xorshift64::new(seed).next_range(0.0, Self::PERIOD);
        Ok(Self {
            canvas: Canvas::new()?,
            shift,
        })
    }
}

impl VideoSource for Stripes {
    fn status(&mut self) -> SourceStatus {
        self.canvas.status()
    }

    fn frame(&mut self) -> Option<&VideoFrame> {
        let shift = self.shift;
        self.canvas.paint(|x, y| {
            let d = (x + y + shift).rem_euclid(Self::PERIOD);
            if d < Self::PERIOD / 2.0 {
                1.0
            } else {
                0.0
            }
        })
    }

    fn release(&mut self) {
        self.canvas.released = true;
    }
}

/// A camera that was never granted.
pub struct Denied {
    reason: String,
}

impl Denied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl VideoSource for Denied {
    fn status(&mut self) -> SourceStatus {
        SourceStatus::Unavailable(self.reason.clone())
    }

    fn frame(&mut self) -> Option<&VideoFrame> {
        None
    }

    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brightness_at(frame: &VideoFrame, x: isize, y: isize) -> u8 {
        frame.pixel(x, y)[0]
    }

    #[test]
    fn orbit_disc_is_bright_at_its_centre() {
        let mut orbit = Orbit::new(1).unwrap();
        let (cx, cy) = orbit.centre(0);
        let frame = orbit.frame().unwrap();
        assert_eq!(frame.width(), FRAME_WIDTH);
        assert_eq!(frame.height(), FRAME_HEIGHT);
        assert_eq!(brightness_at(frame, cx as isize, cy as isize), FOREGROUND[0]);
        assert_eq!(brightness_at(frame, 0, 0), BACKGROUND[0]);
    }

    #[test]
    fn orbit_moves_between_frames() {
        let mut orbit = Orbit::new(1).unwrap();
        let a = orbit.frame().unwrap().as_bytes().to_vec();
        let b = orbit.frame().unwrap().as_bytes().to_vec();
        assert_ne!(a, b);
        assert_ne!(orbit.centre(0), orbit.centre(1));
    }

    #[test]
    fn sweep_bar_advances_and_wraps() {
        let sweep = Sweep::new(3).unwrap();
        let l0 = sweep.left(0);
        let l1 = sweep.left(1);
        assert!(((l1 - l0).rem_euclid(FRAME_WIDTH as f64) - Sweep::SPEED).abs() < 1e-9);
        let lap = (FRAME_WIDTH as f64 / Sweep::SPEED) as u64;
        assert!((sweep.left(lap) - l0).abs() < 1e-9);
    }

    #[test]
    fn sweep_paints_bar_columns_only() {
        let mut sweep = Sweep::new(3).unwrap();
        let centre =
            ((sweep.left(0) + Sweep::BAR_WIDTH / 2.0) as isize).rem_euclid(FRAME_WIDTH as isize);
        let frame = sweep.frame().unwrap();
        assert_eq!(brightness_at(frame, centre, 10), FOREGROUND[0]);
        assert_eq!(brightness_at(frame, centre, 470), FOREGROUND[0]);
        let far = (centre + FRAME_WIDTH as isize / 2).rem_euclid(FRAME_WIDTH as isize);
        assert_eq!(brightness_at(frame, far, 10), BACKGROUND[0]);
    }

    #[test]
    fn stripes_are_static() {
        let mut stripes = Stripes::new(9).unwrap();
        let a = stripes.frame().unwrap().as_bytes().to_vec();
        let b = stripes.frame().unwrap().as_bytes().to_vec();
        assert_eq!(a, b);
        assert!(a.contains(&FOREGROUND[0]) && a.contains(&BACKGROUND[0]));
    }

    #[test]
    fn released_scene_stops_producing_frames() {
        let mut orbit = Orbit::new(1).unwrap();
        assert_eq!(orbit.status(), SourceStatus::Ready);
        orbit.release();
        assert!(orbit.frame().is_none());
        assert!(matches!(orbit.status(), SourceStatus::Unavailable(_)));
    }

    #[test]
    fn denied_is_never_ready() {
        let mut denied = Denied::new("permission denied");
        assert_eq!(
            denied.status(),
            SourceStatus::Unavailable("permission denied".into())
        );
        assert!(denied.frame().is_none());
    }

    #[test]
    fn same_seed_same_frames() {
        let mut a = Sweep::new(77).unwrap();
        let mut b = Sweep::new(77).unwrap();
        for _ in 0..3 {
            assert_eq!(a.frame().unwrap().as_bytes(), b.frame().unwrap().as_bytes());
        }
    }
}
