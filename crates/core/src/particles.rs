//! The particle population and its per-tick update.
//!
//! Particles are independent points in the world square
//! `[-bounds/2, bounds/2]²`. Each tick every particle, in order:
//!
//! 1. respawns at a uniform random point with a small fixed probability,
//! 2. moves by `force · flow_speed · DISPLACEMENT_SCALE` (force is used as a
//!    displacement directly, no velocity state),
//! 3. teleports to a fresh random point if it left the square.
//!
//! The population size never changes. Positions and colours are mirrored into
//! flat [`ParticleBuffers`] that a renderer consumes.

use crate::error::FlowError;
use crate::force::ForceField;
use crate::prng::Xorshift64;
use crate::trail::TrailBuffer;
use glam::DVec2;

/// World units moved per unit force per unit flow speed.
pub const DISPLACEMENT_SCALE: f64 = 0.01;
/// Per-particle, per-tick respawn probability.
pub const RESPAWN_PROBABILITY: f64 = 0.002;
/// Colour camera-reactive particles shift toward in strong video regions.
pub const HIGHLIGHT_COLOR: [f32; 3] = [1.0, 0.45, 0.15];
/// Video magnitude to highlight weight.
pub const HIGHLIGHT_GAIN: f64 = 0.5;
/// Per-splat opacity when drawing.
pub const SPLAT_OPACITY: f32 = 0.7;

/// One point. Size and base colour are fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: DVec2,
    pub size: f64,
    pub base_color: [f32; 3],
}

impl Particle {
    /// Random size in [0.5, 2.5) with a brightness-matched blue-white tint.
    pub fn random(rng: &mut Xorshift64, bounds: f64) -> Self {
        let position = rng.point_in_square(bounds);
        let size = 0.5 + rng.next_f64() * 2.0;
        let b = ((size - 0.5) / 2.0).powi(2) as f32;
        Self {
            position,
            size,
            base_color: [0.05 + 0.25 * b, 0.15 + 0.35 * b, 0.40 + 0.45 * b],
        }
    }
}

/// Flat per-particle arrays in renderer layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffers {
    pub positions: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 3]>,
    pub sizes: Vec<f32>,
}

/// The particle population.
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: Xorshift64,
    bounds: f64,
    respawn_probability: f64,
    buffers: ParticleBuffers,
}

impl ParticleSystem {
    /// Creates `count` particles uniformly spread over the bounds square.
    ///
    /// Returns `FlowError::InvalidDimensions` for an empty population or
    /// non-positive bounds.
    pub fn new(count: usize, bounds: f64, seed: u64) -> Result<Self, FlowError> {
        if count == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        let mut rng = Xorshift64::new(seed);
        let particles = (0..count)
            .map(|_| Particle::random(&mut rng, bounds))
            .collect();
        Self::from_particles(particles, bounds, rng)
    }

    /// Wraps an explicit population.
    pub fn from_particles(
        particles: Vec<Particle>,
        bounds: f64,
        rng: Xorshift64,
    ) -> Result<Self, FlowError> {
        if particles.is_empty() || !(bounds > 0.0) {
            return Err(FlowError::InvalidDimensions);
        }
        let mut system = Self {
            particles,
            rng,
            bounds,
            respawn_probability: RESPAWN_PROBABILITY,
            buffers: ParticleBuffers::default(),
        };
        let bases: Vec<_> = system.particles.iter().map(|p| p.base_color).collect();
        system.buffers.colors = bases;
        system.sync_positions();
        Ok(system)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn buffers(&self) -> &ParticleBuffers {
        &self.buffers
    }

    pub fn bounds(&self) -> f64 {
        self.bounds
    }

    /// Changes the world square, e.g. after a viewport resize. Particles
    /// outside the new square are teleported on the next step.
    pub fn set_bounds(&mut self, bounds: f64) {
        self.bounds = bounds;
    }

    /// Overrides the respawn probability; `0.0` disables respawn.
    pub fn set_respawn_probability(&mut self, p: f64) {
        self.respawn_probability = p.clamp(0.0, 1.0);
    }

    /// Advances every particle one tick through `forces` at `time`.
    ///
    /// When `forces` carries a camera term, rendered colours are blended
    /// toward [`HIGHLIGHT_COLOR`] by local video magnitude; otherwise they are
    /// the base colours.
    pub fn step(&mut self, forces: &ForceField<'_>, time: f64, flow_speed: f64) {
        let half = self.bounds / 2.0;
        let gain = flow_speed * DISPLACEMENT_SCALE;
        let tint = forces.camera().is_some();

        for (p, color) in self.particles.iter_mut().zip(self.buffers.colors.iter_mut()) {
            if self.rng.chance(self.respawn_probability) {
                p.position = self.rng.point_in_square(self.bounds);
            }

            let f = forces.force(p.position.x, p.position.y, time);
            p.position += f * gain;

            if p.position.x.abs() > half || p.position.y.abs() > half {
                p.position = self.rng.point_in_square(self.bounds);
            }

            *color = if tint {
                let v = forces.video(p.position.x, p.position.y);
                let w = (v.length() * HIGHLIGHT_GAIN).min(1.0) as f32;
                lerp_rgb(p.base_color, HIGHLIGHT_COLOR, w)
            } else {
                p.base_color
            };
        }
        self.sync_positions();
    }

    fn sync_positions(&mut self) {
        self.buffers.positions.clear();
        self.buffers.positions.extend(
            self.particles
                .iter()
                .map(|p| [p.position.x as f32, p.position.y as f32]),
        );
        self.buffers.sizes.clear();
        self.buffers
            .sizes
            .extend(self.particles.iter().map(|p| p.size as f32));
    }

    /// Splats every particle into `target` as a soft disc of radius
    /// `0.5 · particle_size · size` pixels. World origin maps to the buffer
    /// centre, world Y up.
    pub fn draw(&self, target: &mut TrailBuffer, particle_size: f64) {
        let cx = target.width() as f64 / 2.0;
        let cy = target.height() as f64 / 2.0;
        for (p, color) in self.particles.iter().zip(&self.buffers.colors) {
            target.splat(
                cx + p.position.x,
                cy - p.position.y,
                0.5 * particle_size * p.size,
                *color,
                SPLAT_OPACITY,
            );
        }
    }
}

fn lerp_rgb(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisMode;
    use crate::force::CameraForce;
    use crate::noise_field::NoiseField;
    use crate::raster::LowResField;
    use crate::sampler::FieldSampler;

    fn single(position: DVec2, bounds: f64) -> ParticleSystem {
        let p = Particle {
            position,
            size: 1.0,
            base_color: [0.1, 0.2, 0.3],
        };
        ParticleSystem::from_particles(vec![p], bounds, Xorshift64::new(5)).unwrap()
    }

    #[test]
    fn new_rejects_empty_population() {
        assert!(matches!(
            ParticleSystem::new(0, 500.0, 1),
            Err(FlowError::InvalidDimensions)
        ));
    }

    #[test]
    fn new_places_particles_in_bounds_with_valid_sizes() {
        let ps = ParticleSystem::new(2000, 500.0, 42).unwrap();
        assert_eq!(ps.len(), 2000);
        for p in ps.particles() {
            assert!(p.position.x.abs() <= 250.0 && p.position.y.abs() <= 250.0);
            assert!((0.5..2.5).contains(&p.size));
        }
        assert_eq!(ps.buffers().positions.len(), 2000);
        assert_eq!(ps.buffers().colors.len(), 2000);
    }

    #[test]
    fn same_seed_same_population() {
        let a = ParticleSystem::new(100, 500.0, 9).unwrap();
        let b = ParticleSystem::new(100, 500.0, 9).unwrap();
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn larger_particles_are_brighter() {
        let mut rng = Xorshift64::new(3);
        let mut ps: Vec<_> = (0..200).map(|_| Particle::random(&mut rng, 100.0)).collect();
        ps.sort_by(|a, b| a.size.total_cmp(&b.size));
        let (small, large) = (ps[0], ps[199]);
        assert!(large.base_color[2] > small.base_color[2]);
    }

    #[test]
    fn no_flow_means_no_motion() {
        let noise = NoiseField::new(1, 0.007);
        let mut ps = single(DVec2::ZERO, 500.0);
        ps.set_respawn_probability(0.0);
        for tick in 0..100 {
            let forces = ForceField::new(&noise);
            ps.step(&forces, tick as f64 * 0.005, 0.0);
            assert_eq!(ps.particles()[0].position, DVec2::ZERO, "moved at tick {tick}");
        }
    }

    #[test]
    fn displacement_is_force_times_speed_times_scale() {
        let noise = NoiseField::new(1, 0.007);
        let start = DVec2::new(10.0, -20.0);
        let mut ps = single(start, 500.0);
        ps.set_respawn_probability(0.0);
        let forces = ForceField::new(&noise);
        let expected = start + forces.force(start.x, start.y, 0.5) * 20.0 * DISPLACEMENT_SCALE;
        ps.step(&forces, 0.5, 20.0);
        assert!((ps.particles()[0].position - expected).length() < 1e-12);
    }

    #[test]
    fn just_past_boundary_teleports_inside() {
        let noise = NoiseField::new(1, 0.007);
        let bounds = 500.0;
        let outside = DVec2::new(bounds / 2.0 + 1.0, 0.0);
        let mut ps = single(outside, bounds);
        ps.set_respawn_probability(0.0);
        ps.step(&ForceField::new(&noise), 0.0, 0.0);
        let p = ps.particles()[0].position;
        assert!(p.x.abs() <= bounds / 2.0 && p.y.abs() <= bounds / 2.0, "{p}");
        assert_ne!(p, outside);
    }

    #[test]
    fn respawn_probability_one_moves_everyone() {
        let noise = NoiseField::new(1, 0.007);
        let mut ps = single(DVec2::new(3.0, 4.0), 500.0);
        ps.set_respawn_probability(1.0);
        ps.step(&ForceField::new(&noise), 0.0, 0.0);
        assert_ne!(ps.particles()[0].position, DVec2::new(3.0, 4.0));
    }

    #[test]
    fn shrinking_bounds_teleports_stragglers() {
        let noise = NoiseField::new(1, 0.007);
        let mut ps = single(DVec2::new(200.0, 0.0), 500.0);
        ps.set_respawn_probability(0.0);
        ps.set_bounds(100.0);
        ps.step(&ForceField::new(&noise), 0.0, 0.0);
        assert!(ps.particles()[0].position.x.abs() <= 50.0);
    }

    #[test]
    fn colours_follow_camera_variant() {
        let noise = NoiseField::new(1, 0.007);
        let field = LowResField::uniform(80, 60, DVec2::new(1.0, 1.0)).unwrap();
        let mut ps = single(DVec2::ZERO, 500.0);
        ps.set_respawn_probability(0.0);

        ps.step(&ForceField::new(&noise), 0.0, 0.0);
        assert_eq!(ps.buffers().colors[0], [0.1, 0.2, 0.3]);

        let forces = ForceField::new(&noise).with_camera(CameraForce {
            field: Some(&field),
            sampler: FieldSampler::new(500.0),
            influence: 0.0,
            mode: AnalysisMode::Motion,
        });
        ps.step(&forces, 0.0, 0.0);
        // |(1, 1)| · 0.5 ≈ 0.707 of the way to the highlight.
        let c = ps.buffers().colors[0];
        assert!(c[0] > 0.6 && c[0] < 0.8, "{c:?}");
    }

    #[test]
    fn draw_maps_world_origin_to_buffer_centre() {
        let ps = single(DVec2::ZERO, 500.0);
        let mut target = TrailBuffer::new(20, 10).unwrap();
        ps.draw(&mut target, 2.0);
        assert!(target.pixel(10, 5)[2] > 0.0);
        assert_eq!(target.pixel(0, 0), [0.0; 3]);
    }

    #[test]
    fn draw_flips_world_y() {
        let ps = single(DVec2::new(0.0, 4.0), 500.0);
        let mut target = TrailBuffer::new(20, 20).unwrap();
        ps.draw(&mut target, 1.0);
        assert!(target.pixel(10, 5)[2] > 0.0, "particle above centre lands in upper rows");
        assert_eq!(target.pixel(10, 15), [0.0; 3]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn positions_stay_in_bounds_every_tick(
                seed: u64,
                bounds in 50.0_f64..2000.0,
                flow_speed in 0.0_f64..40.0,
            ) {
                let noise = NoiseField::new(seed as u32, 0.007);
                let mut ps = ParticleSystem::new(200, bounds, seed).unwrap();
                let half = bounds / 2.0;
                for tick in 0..50 {
                    let forces = ForceField::new(&noise);
                    ps.step(&forces, tick as f64 * 0.005, flow_speed);
                    for p in ps.particles() {
                        prop_assert!(p.position.x.abs() <= half && p.position.y.abs() <= half,
                            "{} escaped bounds {} at tick {}", p.position, bounds, tick);
                    }
                }
                prop_assert_eq!(ps.len(), 200);
            }
        }
    }
}
