//! Per-position force combining the noise flow with the camera field.
//!
//! `force = noise · 2 + video · influence`. In edge mode the video vector is
//! rotated a quarter turn so particles travel along detected edges instead
//! of across them. A [`ForceField`] is rebuilt every tick from the current
//! configuration and borrows the tick's analysis output.

use crate::analysis::AnalysisMode;
use crate::noise_field::{FlowSource, NoiseField};
use crate::raster::LowResField;
use crate::sampler::FieldSampler;
use glam::DVec2;

/// Gain applied to raw noise before the camera term is added.
pub const NOISE_GAIN: f64 = 2.0;

/// The camera contribution for one tick.
#[derive(Debug, Clone, Copy)]
pub struct CameraForce<'a> {
    /// `None` when no field was published this tick.
    pub field: Option<&'a LowResField>,
    pub sampler: FieldSampler,
    pub influence: f64,
    pub mode: AnalysisMode,
}

impl CameraForce<'_> {
    /// Oriented video vector at `(x, y)`, before influence scaling.
    pub fn video(&self, x: f64, y: f64) -> DVec2 {
        let v = self.sampler.sample(self.field, x, y);
        match self.mode {
            AnalysisMode::Motion => v,
            AnalysisMode::Edges => v.perp(),
        }
    }
}

/// Noise plus an optional camera term.
pub struct ForceField<'a> {
    noise: &'a NoiseField,
    camera: Option<CameraForce<'a>>,
}

impl<'a> ForceField<'a> {
    /// Pure noise flow.
    pub fn new(noise: &'a NoiseField) -> Self {
        Self {
            noise,
            camera: None,
        }
    }

    /// Adds a camera term.
    pub fn with_camera(mut self, camera: CameraForce<'a>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn camera(&self) -> Option<&CameraForce<'a>> {
        self.camera.as_ref()
    }

    /// Force at world `(x, y)` and time `t`.
    pub fn force(&self, x: f64, y: f64, t: f64) -> DVec2 {
        let noise = self.noise.sample(x, y, t) * NOISE_GAIN;
        match &self.camera {
            Some(cam) if cam.influence != 0.0 => noise + cam.video(x, y) * cam.influence,
            _ => noise,
        }
    }

    /// Video vector at `(x, y)`; zero without a camera term.
    pub fn video(&self, x: f64, y: f64) -> DVec2 {
        self.camera
            .as_ref()
            .map_or(DVec2::ZERO, |cam| cam.video(x, y))
    }
}

impl FlowSource for ForceField<'_> {
    fn sample(&self, x: f64, y: f64, time: f64) -> DVec2 {
        self.force(x, y, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(field: Option<&LowResField>, influence: f64, mode: AnalysisMode) -> CameraForce<'_> {
        CameraForce {
            field,
            sampler: FieldSampler::new(500.0),
            influence,
            mode,
        }
    }

    #[test]
    fn pure_noise_is_doubled_noise() {
        let noise = NoiseField::new(3, 0.007);
        let ff = ForceField::new(&noise);
        let n = noise.sample(12.0, -40.0, 0.3);
        assert_eq!(ff.force(12.0, -40.0, 0.3), n * 2.0);
        assert_eq!(ff.video(12.0, -40.0), DVec2::ZERO);
    }

    #[test]
    fn camera_term_adds_scaled_video() {
        let noise = NoiseField::new(3, 0.007);
        let field = LowResField::uniform(80, 60, DVec2::new(1.0, 0.0)).unwrap();
        let ff = ForceField::new(&noise).with_camera(camera(Some(&field), 3.0, AnalysisMode::Motion));
        let base = noise.sample(0.0, 0.0, 0.1) * 2.0;
        let f = ff.force(0.0, 0.0, 0.1);
        assert!((f.x - base.x - 3.0).abs() < 1e-9, "{f} vs {base}");
        assert_eq!(f.y, base.y);
    }

    #[test]
    fn edge_mode_rotates_video_a_quarter_turn() {
        let noise = NoiseField::new(3, 0.007);
        let field = LowResField::uniform(80, 60, DVec2::new(1.0, 0.0)).unwrap();
        let cam = camera(Some(&field), 1.0, AnalysisMode::Edges);
        let v = cam.video(0.0, 0.0);
        assert_eq!(v, DVec2::new(0.0, 1.0));
        let ff = ForceField::new(&noise).with_camera(cam);
        assert_eq!(ff.video(0.0, 0.0), v);
    }

    #[test]
    fn absent_field_contributes_nothing() {
        let noise = NoiseField::new(9, 0.007);
        let plain = ForceField::new(&noise);
        let cam = ForceField::new(&noise).with_camera(camera(None, 5.0, AnalysisMode::Motion));
        assert_eq!(plain.force(100.0, 50.0, 2.0), cam.force(100.0, 50.0, 2.0));
    }

    #[test]
    fn flow_source_impl_matches_force() {
        let noise = NoiseField::new(1, 0.005);
        let ff = ForceField::new(&noise);
        let src: &dyn FlowSource = &ff;
        assert_eq!(src.sample(5.0, 6.0, 7.0), ff.force(5.0, 6.0, 7.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn zero_influence_ignores_video_state(
                x in -300.0_f64..300.0,
                y in -300.0_f64..300.0,
                t in 0.0_f64..50.0,
                vx in -1.0_f64..1.0,
                vy in -1.0_f64..1.0,
                edges: bool,
            ) {
                let noise = NoiseField::new(21, 0.007);
                let field = LowResField::uniform(80, 60, DVec2::new(vx, vy)).unwrap();
                let mode = if edges { AnalysisMode::Edges } else { AnalysisMode::Motion };
                let disconnected = ForceField::new(&noise);
                let idle = ForceField::new(&noise).with_camera(camera(Some(&field), 0.0, mode));
                let absent = ForceField::new(&noise).with_camera(camera(None, 0.0, mode));
                let expected = disconnected.force(x, y, t);
                prop_assert_eq!(idle.force(x, y, t), expected);
                prop_assert_eq!(absent.force(x, y, t), expected);
            }
        }
    }
}
