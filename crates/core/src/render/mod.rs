//! OpenGL ES 3.0 back end, enabled by the `render` feature.
//!
//! - [`GlAnalysisStage`] runs the motion and edge kernels on the GPU and
//!   plugs into [`crate::VideoAnalyzer`] through [`crate::AnalysisStage`].
//! - [`GlTrailCompositor`] keeps particle trails in a pair of render targets
//!   and presents them to the default framebuffer. Pair it with a
//!   [`crate::Simulation`] whose CPU pass is off
//!   ([`crate::Simulation::set_cpu_compositing`]) and feed it
//!   [`crate::Simulation::decay`] and the particle buffers after each tick.
//!
//! Everything else here is plumbing: context capabilities, shader programs,
//! textures and off-screen targets.

pub mod context;
pub mod gl_analysis;
pub mod gl_trail;
pub mod shader;
pub mod shaders;
pub mod target;
pub mod texture;

pub use context::GpuContext;
pub use gl_analysis::GlAnalysisStage;
pub use gl_trail::GlTrailCompositor;
pub use shader::{annotate_source, Program, ShaderError};
pub use target::RenderTarget;
pub use texture::{create_texture, TextureConfig};
