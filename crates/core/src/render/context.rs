//! GPU context wrapper with capability detection.

use std::rc::Rc;

/// Shared `glow::Context` plus the capabilities the pipeline cares about.
///
/// Cloning is cheap; every GPU stage keeps its own handle so it can free its
/// resources on drop.
#[derive(Clone)]
pub struct GpuContext {
    gl: Rc<glow::Context>,
    float_targets: bool,
}

impl GpuContext {
    /// Wraps `gl` and probes for `EXT_color_buffer_float`.
    ///
    /// Without the extension, trail targets fall back to RGBA8. Long trails
    /// then band and die out sooner, but nothing else changes.
    pub fn new(gl: glow::Context) -> Self {
        use glow::HasContext;

        let float_targets = gl.supported_extensions().contains("EXT_color_buffer_float");
        if float_targets {
            log::info!("gpu: float render targets available");
        } else {
            log::warn!("gpu: EXT_color_buffer_float missing, trails use RGBA8");
        }

        Self {
            gl: Rc::new(gl),
            float_targets,
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub(crate) fn shared(&self) -> Rc<glow::Context> {
        Rc::clone(&self.gl)
    }

    /// Whether RGBA16F textures can be rendered to.
    pub fn supports_float_targets(&self) -> bool {
        self.float_targets
    }

    /// Internal format for trail accumulation targets.
    pub fn trail_format(&self) -> u32 {
        trail_format_for(self.float_targets)
    }
}

pub(crate) fn trail_format_for(float_targets: bool) -> u32 {
    if float_targets {
        glow::RGBA16F
    } else {
        glow::RGBA8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_context_api_compiles() {
        fn _assert_api(ctx: &GpuContext) {
            let _gl: &glow::Context = ctx.gl();
            let _flag: bool = ctx.supports_float_targets();
            let _fmt: u32 = ctx.trail_format();
            let _clone: GpuContext = ctx.clone();
        }
    }

    #[test]
    fn trail_format_falls_back_to_rgba8() {
        assert_eq!(trail_format_for(true), glow::RGBA16F);
        assert_eq!(trail_format_for(false), glow::RGBA8);
    }

    #[test]
    #[ignore = "requires GL context"]
    fn new_detects_float_extension() {
        // Would test: supports_float_targets() matches supported_extensions().
    }
}
