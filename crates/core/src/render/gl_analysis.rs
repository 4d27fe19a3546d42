//! GPU implementation of [`AnalysisStage`].
//!
//! Both frames are uploaded as RGB8 textures, one fullscreen pass writes the
//! encoded vectors into an RGBA8 target, and readback copies red and green.

use super::context::GpuContext;
use super::shader::Program;
use super::shaders::{FULLSCREEN_VERTEX, MOTION_FRAGMENT, SOBEL_FRAGMENT};
use super::target::RenderTarget;
use super::texture::{create_texture, upload_raster, TextureConfig};
use crate::analysis::{AnalysisMode, AnalysisStage, KernelParams};
use crate::error::FlowError;
use crate::raster::{LowResField, RgbRaster};
use glow::HasContext;
use std::rc::Rc;

pub struct GlAnalysisStage {
    gl: Rc<glow::Context>,
    motion: Program,
    sobel: Program,
    current: glow::Texture,
    previous: glow::Texture,
    target: RenderTarget,
    vao: glow::VertexArray,
    width: usize,
    height: usize,
    upload: Vec<u8>,
    readback: Vec<u8>,
}

impl GlAnalysisStage {
    #[allow(unsafe_code)]
    pub fn new(ctx: &GpuContext, width: usize, height: usize) -> Result<Self, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        let gl = ctx.shared();
        let motion = Program::new(&gl, FULLSCREEN_VERTEX, MOTION_FRAGMENT)?;
        let sobel = Program::new(&gl, FULLSCREEN_VERTEX, SOBEL_FRAGMENT)?;
        let frame = TextureConfig::rgb8(width as u32, height as u32);
        let current = create_texture(&gl, &frame)?;
        let previous = create_texture(&gl, &frame)?;
        let target = RenderTarget::new(&gl, TextureConfig::rgba8(width as u32, height as u32))?;
        // SAFETY: an empty VAO is all the fullscreen triangle needs.
        let vao = unsafe { gl.create_vertex_array().map_err(FlowError::Gpu)? };

        log::debug!("gpu analysis stage at {width}x{height}");
        Ok(Self {
            gl,
            motion,
            sobel,
            current,
            previous,
            target,
            vao,
            width,
            height,
            upload: Vec::new(),
            readback: Vec::new(),
        })
    }

    fn check(&self, raster: &RgbRaster) -> Result<(), FlowError> {
        if raster.width() == self.width && raster.height() == self.height {
            Ok(())
        } else {
            Err(FlowError::DimensionMismatch {
                lhs_w: raster.width(),
                lhs_h: raster.height(),
                rhs_w: self.width,
                rhs_h: self.height,
            })
        }
    }
}

impl AnalysisStage for GlAnalysisStage {
    #[allow(unsafe_code)]
    fn execute(
        &mut self,
        current: &RgbRaster,
        previous: &RgbRaster,
        params: &KernelParams,
    ) -> Result<(), FlowError> {
        self.check(current)?;
        self.check(previous)?;
        let gl = &*self.gl;

        upload_raster(gl, self.current, current, &mut self.upload);
        let program = match params.mode {
            AnalysisMode::Motion => {
                upload_raster(gl, self.previous, previous, &mut self.upload);
                &self.motion
            }
            AnalysisMode::Edges => &self.sobel,
        };

        self.target.bind(gl);
        program.use_program(gl);
        program.set_vec2(
            gl,
            "u_texel",
            1.0 / self.width as f32,
            1.0 / self.height as f32,
        );
        program.set_f32(gl, "u_threshold", params.threshold as f32);
        program.set_f32(gl, "u_edge_width", params.edge_width as f32);
        program.set_i32(gl, "u_mirror", params.mirror as i32);
        program.set_i32(gl, "u_current", 0);
        program.set_i32(gl, "u_previous", 1);

        // SAFETY: textures, VAO and target are owned by self and the program is current.
        unsafe {
            gl.disable(glow::BLEND);
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.current));
            gl.active_texture(glow::TEXTURE1);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.previous));
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, 3);
            gl.bind_vertex_array(None);
            gl.active_texture(glow::TEXTURE0);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        Ok(())
    }

    fn read_back(&mut self, out: &mut LowResField) -> Result<(), FlowError> {
        self.target.read_rg8(&self.gl, out, &mut self.readback)
    }
}

impl Drop for GlAnalysisStage {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        let gl = &*self.gl;
        self.motion.destroy(gl);
        self.sobel.destroy(gl);
        self.target.destroy(gl);
        // SAFETY: handles are owned by self and dropped with it.
        unsafe {
            gl.delete_texture(self.current);
            gl.delete_texture(self.previous);
            gl.delete_vertex_array(self.vao);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_stage_is_an_analysis_stage() {
        fn assert_stage<T: AnalysisStage>() {}
        assert_stage::<GlAnalysisStage>();
    }

    #[test]
    #[ignore = "requires GL context"]
    fn matches_cpu_stage_on_moving_bar() {
        // Would test: GlAnalysisStage and CpuStage agree within one code
        // step on every texel for the moving-bar fixture.
    }
}
