#![deny(unsafe_code)]
//! Scene registry: named synthetic video sources standing in for a camera,
//! plus CPU-side conversion and PNG snapshots of a simulation's output.
//!
//! Both the CLI and the tests pick scenes by name through [`SceneKind`].

pub mod pixel;
pub mod scene;

#[cfg(feature = "png")]
pub mod snapshot;

use flowtrail_core::analysis::{SourceStatus, VideoFrame, VideoSource};
use flowtrail_core::error::FlowError;
use scene::{Denied, Orbit, Stripes, Sweep};

/// All available scene names.
const SCENE_NAMES: &[&str] = &["none", "orbit", "sweep", "stripes"];

/// Every scene, dispatched by name.
pub enum SceneKind {
    /// No camera: permanently unavailable.
    None(Denied),
    Orbit(Orbit),
    Sweep(Sweep),
    Stripes(Stripes),
}

impl SceneKind {
    /// Builds a scene by name.
    ///
    /// Returns `FlowError::UnknownScene` if the name is not recognized.
    pub fn from_name(name: &str, seed: u64) -> Result<Self, FlowError> {
        match name {
            "none" => Ok(SceneKind::None(Denied::new("no camera attached"))),
            "orbit" => Ok(SceneKind::Orbit(Orbit::new(seed)?)),
            "sweep" => Ok(SceneKind::Sweep(Sweep::new(seed)?)),
            "stripes" => Ok(SceneKind::Stripes(Stripes::new(seed)?)),
            _ => Err(FlowError::UnknownScene(name.to_string())),
        }
    }

    pub fn list_scenes() -> &'static [&'static str] {
        SCENE_NAMES
    }

    fn source(&mut self) -> &mut dyn VideoSource {
        match self {
            SceneKind::None(s) => s,
            SceneKind::Orbit(s) => s,
            SceneKind::Sweep(s) => s,
            SceneKind::Stripes(s) => s,
        }
    }
}

impl VideoSource for SceneKind {
    fn status(&mut self) -> SourceStatus {
        self.source().status()
    }

    fn frame(&mut self) -> Option<&VideoFrame> {
        self.source().frame()
    }

    fn release(&mut self) {
        self.source().release()
    }
}
