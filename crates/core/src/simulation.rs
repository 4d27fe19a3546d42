//! The simulation context: owns every buffer of a session and runs ticks.
//!
//! Per [`Simulation::tick`], strictly in order:
//!
//! 1. drain queued configuration updates,
//! 2. analyze the next video frame (camera sessions with a ready source),
//!    reading the field back only if arrows are shown or influence is non-zero,
//! 3. advance time by [`TIME_STEP`],
//! 4. step particles through a force field built from the fresh config,
//! 5. composite trails,
//! 6. sample overlay glyphs when arrows are shown.
//!
//! Step 5 runs on the CPU [`TrailCompositor`]. A host that composites on the
//! GPU turns it off with [`Simulation::set_cpu_compositing`] and feeds
//! [`Simulation::decay`] and the particle buffers to its own compositor after
//! each tick.
//!
//! No tick blocks on the video source. A source that turns out unavailable
//! is reported once through [`Simulation::notice`] and the session continues
//! on the noise flow alone.

use crate::analysis::{AnalysisStage, SourceStatus, VideoAnalyzer, VideoSource};
use crate::config::{Controls, FlowConfig, UpdateQueue};
use crate::error::FlowError;
use crate::force::{CameraForce, ForceField};
use crate::noise_field::NoiseField;
use crate::overlay::{Glyph, VectorFieldOverlay};
use crate::particles::ParticleSystem;
use crate::raster::LowResField;
use crate::sampler::FieldSampler;
use crate::trail::{Decay, TrailBuffer, TrailCompositor};

/// Noise time advanced per tick.
pub const TIME_STEP: f64 = 0.005;

/// A running visualization session.
pub struct Simulation {
    config: FlowConfig,
    updates: UpdateQueue,
    noise: NoiseField,
    particles: ParticleSystem,
    analyzer: Option<VideoAnalyzer>,
    source: Option<Box<dyn VideoSource>>,
    source_live: bool,
    notice: Option<String>,
    trails: TrailCompositor,
    cpu_compositing: bool,
    overlay: VectorFieldOverlay,
    glyphs: Vec<Glyph>,
    time: f64,
}

impl Simulation {
    /// Starts a session for a `viewport_w × viewport_h` surface.
    ///
    /// Returns the simulation and the [`Controls`] handle through which the
    /// configuration may be changed between ticks.
    pub fn new(
        config: FlowConfig,
        viewport_w: usize,
        viewport_h: usize,
        seed: u64,
    ) -> Result<(Self, Controls), FlowError> {
        let trails = TrailCompositor::new(viewport_w, viewport_h)?;
        let bounds = viewport_w.max(viewport_h) as f64;
        let particles = ParticleSystem::new(config.particle_count, bounds, seed)?;
        let analyzer = config
            .camera
            .as_ref()
            .map(|cam| VideoAnalyzer::new(cam.analysis_width, cam.analysis_height))
            .transpose()?;
        let noise = NoiseField::new((seed ^ (seed >> 32)) as u32, config.noise_scale);
        let (controls, updates) = Controls::channel();

        log::info!(
            "session started: {} particles, {viewport_w}x{viewport_h}, camera {}",
            config.particle_count,
            if config.camera.is_some() { "on" } else { "off" }
        );

        Ok((
            Self {
                config,
                updates,
                noise,
                particles,
                analyzer,
                source: None,
                source_live: false,
                notice: None,
                trails,
                cpu_compositing: true,
                overlay: VectorFieldOverlay::default(),
                glyphs: Vec::new(),
                time: 0.0,
            },
            controls,
        ))
    }

    /// Replaces the analysis stage, e.g. with a GPU stage. No-op without a
    /// camera configuration.
    pub fn set_analysis_stage(&mut self, stage: Box<dyn AnalysisStage>) -> Result<(), FlowError> {
        if let Some(cam) = &self.config.camera {
            self.analyzer = Some(VideoAnalyzer::with_stage(
                cam.analysis_width,
                cam.analysis_height,
                stage,
            )?);
        }
        Ok(())
    }

    /// Hands the session its video source. A previously attached source is
    /// released first. Sessions without a camera release it immediately.
    pub fn attach_source(&mut self, mut source: Box<dyn VideoSource>) {
        self.release_source();
        if self.config.camera.is_none() {
            log::info!("camera disabled in configuration; releasing video source");
            source.release();
            return;
        }
        self.source_live = false;
        self.source = Some(source);
    }

    /// Runs one tick.
    pub fn tick(&mut self) -> Result<(), FlowError> {
        self.updates.drain_into(&mut self.config);
        self.noise.set_scale(self.config.noise_scale);

        self.analyze_video();
        self.time += TIME_STEP;

        let bounds = self.particles.bounds();
        let field = self.analyzer.as_ref().and_then(VideoAnalyzer::field);
        let mut forces = ForceField::new(&self.noise);
        if let Some(cam) = &self.config.camera {
            forces = forces.with_camera(CameraForce {
                field,
                sampler: FieldSampler::new(bounds),
                influence: cam.influence,
                mode: cam.mode,
            });
        }
        self.particles
            .step(&forces, self.time, self.config.flow_speed);

        if self.cpu_compositing {
            let decay = self.decay();
            let particle_size = self.config.particle_size;
            let particles = &self.particles;
            self.trails.composite(decay, self.config.present, |buffer| {
                particles.draw(buffer, particle_size)
            })?;
        }

        self.glyphs.clear();
        if self.config.show_arrows {
            let camera = self.config.camera.is_some();
            let time = self.time;
            self.glyphs = self.overlay.glyphs(
                self.trails.width(),
                self.trails.height(),
                self.config.overlay_threshold(),
                |x, y| {
                    if camera {
                        forces.video(x, y)
                    } else {
                        forces.force(x, y, time)
                    }
                },
            );
        }
        Ok(())
    }

    fn analyze_video(&mut self) {
        let (Some(cam), Some(analyzer)) = (&self.config.camera, self.analyzer.as_mut()) else {
            return;
        };
        let Some(source) = self.source.as_mut() else {
            analyzer.clear();
            return;
        };

        match source.status() {
            SourceStatus::Ready => {
                if !self.source_live {
                    log::info!("video source ready");
                    self.source_live = true;
                }
                let read_back = self.config.show_arrows || cam.influence != 0.0;
                let params = cam.kernel_params();
                match source.frame() {
                    Some(frame) => {
                        if let Err(e) = analyzer.analyze(frame, &params, read_back) {
                            log::warn!("video analysis failed, using noise flow this tick: {e}");
                            analyzer.clear();
                        }
                    }
                    None => analyzer.clear(),
                }
            }
            SourceStatus::Pending => analyzer.clear(),
            SourceStatus::Unavailable(reason) => {
                analyzer.clear();
                if self.notice.is_none() {
                    log::warn!("camera unavailable, continuing with noise flow only: {reason}");
                    self.notice = Some(format!("Camera unavailable: {reason}"));
                }
            }
        }
    }

    /// Enables or disables the CPU trail pass. While disabled, [`presented`]
    /// keeps the last CPU frame and the host composites from
    /// [`ParticleSystem::buffers`].
    ///
    /// [`presented`]: Simulation::presented
    pub fn set_cpu_compositing(&mut self, enabled: bool) {
        self.cpu_compositing = enabled;
    }

    pub fn cpu_compositing(&self) -> bool {
        self.cpu_compositing
    }

    /// Trail decay for the current configuration.
    pub fn decay(&self) -> Decay {
        Decay::from_curve(self.config.decay_curve, self.config.trail_decay)
    }

    /// Recreates the trail buffers for a new viewport and updates bounds.
    pub fn resize(&mut self, viewport_w: usize, viewport_h: usize) -> Result<(), FlowError> {
        self.trails.resize(viewport_w, viewport_h)?;
        self.particles
            .set_bounds(viewport_w.max(viewport_h) as f64);
        self.glyphs.clear();
        log::debug!("viewport resized to {viewport_w}x{viewport_h}");
        Ok(())
    }

    fn release_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
            log::info!("video source released");
        }
    }

    /// Ends the session, releasing the video source. Also runs on drop;
    /// the source is released exactly once either way.
    pub fn shutdown(&mut self) {
        self.release_source();
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// One-time user-facing message, set when the camera proved unavailable.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// The image presented by the last tick.
    pub fn presented(&self) -> &TrailBuffer {
        self.trails.presented()
    }

    pub fn trails(&self) -> &TrailCompositor {
        &self.trails
    }

    /// Overlay glyphs from the last tick; empty while arrows are hidden.
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn overlay(&self) -> &VectorFieldOverlay {
        &self.overlay
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleSystem {
        &mut self.particles
    }

    /// The analysis field published this tick, if any.
    pub fn field(&self) -> Option<&LowResField> {
        self.analyzer.as_ref().and_then(VideoAnalyzer::field)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn bounds(&self) -> f64 {
        self.particles.bounds()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.release_source();
    }
}
