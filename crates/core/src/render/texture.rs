//! Texture allocation and CPU-to-GPU uploads.

use crate::error::FlowError;
use crate::raster::RgbRaster;
use glow::HasContext;

/// Format and filtering for a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    pub width: u32,
    pub height: u32,
    pub internal_format: u32,
    pub filter: u32,
}

impl TextureConfig {
    /// Trail accumulation target: half-float, linear.
    pub fn rgba16f(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            internal_format: glow::RGBA16F,
            filter: glow::LINEAR,
        }
    }

    /// Analysis output: one byte per component, sampled texel-exact.
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            internal_format: glow::RGBA8,
            filter: glow::NEAREST,
        }
    }

    /// Downsampled video frame, filtered so edge sampling can land between texels.
    pub fn rgb8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            internal_format: glow::RGB8,
            filter: glow::LINEAR,
        }
    }

    pub fn with_format(self, internal_format: u32) -> Self {
        Self {
            internal_format,
            ..self
        }
    }

    /// `(format, type)` pair for uploads matching the internal format.
    pub fn transfer(&self) -> (u32, u32) {
        match self.internal_format {
            glow::RGBA16F => (glow::RGBA, glow::HALF_FLOAT),
            glow::RGBA32F => (glow::RGBA, glow::FLOAT),
            glow::RGB8 => (glow::RGB, glow::UNSIGNED_BYTE),
            _ => (glow::RGBA, glow::UNSIGNED_BYTE),
        }
    }
}

/// Allocates an uninitialised texture, clamped at the edges.
#[allow(unsafe_code)]
pub fn create_texture(gl: &glow::Context, config: &TextureConfig) -> Result<glow::Texture, FlowError> {
    let (format, ty) = config.transfer();
    // SAFETY: all enums come from `config`; the texture is unbound afterwards.
    unsafe {
        let texture = gl.create_texture().map_err(FlowError::Gpu)?;
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        for (pname, value) in [
            (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_MIN_FILTER, config.filter),
            (glow::TEXTURE_MAG_FILTER, config.filter),
        ] {
            gl.tex_parameter_i32(glow::TEXTURE_2D, pname, value as i32);
        }
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            config.internal_format as i32,
            config.width as i32,
            config.height as i32,
            0,
            format,
            ty,
            glow::PixelUnpackData::Slice(None),
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
        Ok(texture)
    }
}

/// Packs a raster as tightly packed RGB8, row 0 first.
pub fn pack_rgb8(raster: &RgbRaster, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(raster.pixels().len() * 3);
    for px in raster.pixels() {
        for c in px {
            out.push((c.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }
}

/// Replaces the contents of an [`TextureConfig::rgb8`] texture with `raster`.
/// `scratch` is reused between calls.
#[allow(unsafe_code)]
pub fn upload_raster(
    gl: &glow::Context,
    texture: glow::Texture,
    raster: &RgbRaster,
    scratch: &mut Vec<u8>,
) {
    pack_rgb8(raster, scratch);
    // SAFETY: `scratch` holds exactly width·height·3 bytes and the unpack
    // alignment is set to 1 so odd widths are read correctly.
    unsafe {
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_sub_image_2d(
            glow::TEXTURE_2D,
            0,
            0,
            0,
            raster.width() as i32,
            raster.height() as i32,
            glow::RGB,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(Some(scratch.as_slice())),
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
    }
}
