//! Off-screen render target: a framebuffer with one color texture.

use super::texture::{create_texture, TextureConfig};
use crate::error::FlowError;
use crate::raster::LowResField;
use glow::HasContext;

pub struct RenderTarget {
    fbo: glow::Framebuffer,
    texture: glow::Texture,
    config: TextureConfig,
}

impl RenderTarget {
    /// Allocates the texture and checks framebuffer completeness.
    ///
    /// # Errors
    ///
    /// `FlowError::Gpu` if allocation fails or the framebuffer is incomplete,
    /// for instance an RGBA16F target without `EXT_color_buffer_float`.
    #[allow(unsafe_code)]
    pub fn new(gl: &glow::Context, config: TextureConfig) -> Result<Self, FlowError> {
        let texture = create_texture(gl, &config)?;
        // SAFETY: `texture` was just created; both handles are deleted on failure.
        unsafe {
            let fbo = match gl.create_framebuffer() {
                Ok(fbo) => fbo,
                Err(e) => {
                    gl.delete_texture(texture);
                    return Err(FlowError::Gpu(e));
                }
            };
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(fbo);
                gl.delete_texture(texture);
                return Err(FlowError::Gpu(format!(
                    "framebuffer incomplete: status 0x{status:04X}"
                )));
            }
            Ok(Self {
                fbo,
                texture,
                config,
            })
        }
    }

    /// Makes this the draw target and matches the viewport to it.
    #[allow(unsafe_code)]
    pub fn bind(&self, gl: &glow::Context) {
        // SAFETY: `fbo` is a complete framebuffer owned by self.
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
            gl.viewport(0, 0, self.config.width as i32, self.config.height as i32);
        }
    }

    /// Clears to transparent black.
    #[allow(unsafe_code)]
    pub fn clear(&self, gl: &glow::Context) {
        self.bind(gl);
        // SAFETY: the target is bound above.
        unsafe {
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    pub fn texture(&self) -> glow::Texture {
        self.texture
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Reads the red and green bytes of an RGBA8 target into `out`.
    /// `scratch` is reused between calls.
    #[allow(unsafe_code)]
    pub fn read_rg8(
        &self,
        gl: &glow::Context,
        out: &mut LowResField,
        scratch: &mut Vec<u8>,
    ) -> Result<(), FlowError> {
        let (w, h) = (self.width() as usize, self.height() as usize);
        if out.width() != w || out.height() != h {
            return Err(FlowError::DimensionMismatch {
                lhs_w: out.width(),
                lhs_h: out.height(),
                rhs_w: w,
                rhs_h: h,
            });
        }
        scratch.resize(w * h * 4, 0);
        // SAFETY: `scratch` holds w·h RGBA bytes, the size of the target.
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            gl.read_pixels(
                0,
                0,
                w as i32,
                h as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(scratch.as_mut_slice())),
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        copy_rg(scratch, out.encoded_mut());
        Ok(())
    }

    /// Frees the framebuffer and texture. The handles are invalid afterwards.
    #[allow(unsafe_code)]
    pub fn destroy(&self, gl: &glow::Context) {
        // SAFETY: both handles are owned by self.
        unsafe {
            gl.delete_framebuffer(self.fbo);
            gl.delete_texture(self.texture);
        }
    }
}

fn copy_rg(rgba: &[u8], out: &mut [[u8; 2]]) {
    for (dst, src) in out.iter_mut().zip(rgba.chunks_exact(4)) {
        *dst = [src[0], src[1]];
    }
}
