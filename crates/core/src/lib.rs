#![deny(unsafe_code)]
//! Core of the flowtrail visualizer.
//!
//! A population of particles drifts through a Perlin noise flow field,
//! optionally perturbed by a vector field derived from live video, and leaves
//! fading trails through a ping-pong compositing pipeline.
//!
//! Provides [`NoiseField`], the video analysis pipeline ([`VideoAnalyzer`],
//! [`LowResField`], [`FieldSampler`]), [`ForceField`], [`ParticleSystem`],
//! [`TrailCompositor`], the debug [`VectorFieldOverlay`], the session
//! configuration ([`FlowConfig`]) and the [`Simulation`] context tying them
//! together. The `render` feature adds OpenGL ES 3.0 implementations of the
//! analysis stage and the trail compositor.

pub mod analysis;
pub mod config;
pub mod error;
pub mod force;
pub mod noise_field;
pub mod overlay;
pub mod params;
pub mod particles;
pub mod ping_pong;
pub mod prng;
pub mod raster;
pub mod sampler;
pub mod simulation;
pub mod trail;

#[cfg(feature = "render")]
pub mod render;

pub use analysis::{
    AcquiringSource, AnalysisMode, AnalysisStage, CpuStage, KernelParams, SourceStatus,
    VideoAnalyzer, VideoFrame, VideoSource,
};
pub use config::{CameraConfig, ConfigUpdate, Controls, FlowConfig, ParamValue};
pub use error::FlowError;
pub use force::{CameraForce, ForceField};
pub use noise_field::{FlowSource, NoiseField};
pub use overlay::{Glyph, VectorFieldOverlay};
pub use particles::{Particle, ParticleBuffers, ParticleSystem};
pub use ping_pong::PingPong;
pub use prng::Xorshift64;
pub use raster::{LowResField, RgbRaster};
pub use sampler::FieldSampler;
pub use simulation::Simulation;
pub use trail::{Decay, DecayCurve, PresentMode, TrailBuffer, TrailCompositor};
