//! GPU trail compositor: the same decay, draw and present sequence as
//! [`crate::trail::TrailCompositor`], on a pair of render targets.

use super::context::GpuContext;
use super::shader::Program;
use super::shaders::{DECAY_FRAGMENT, FULLSCREEN_VERTEX, PARTICLE_FRAGMENT, PARTICLE_VERTEX};
use super::target::RenderTarget;
use super::texture::TextureConfig;
use crate::error::FlowError;
use crate::particles::{ParticleBuffers, SPLAT_OPACITY};
use crate::ping_pong::PingPong;
use crate::trail::{Decay, PresentMode};
use glow::HasContext;
use std::rc::Rc;

/// Floats per particle vertex: position, colour, size.
const VERTEX_FLOATS: usize = 6;

/// Spacing of stored values just below 1.0 in a trail target format.
/// Zero for formats fine enough that decay never rounds back up.
pub fn storage_step(format: u32) -> f32 {
    match format {
        glow::RGBA8 => 1.0 / 255.0,
        glow::RGBA16F => 1.0 / 2048.0,
        _ => 0.0,
    }
}

/// `decay` with its epsilon raised to at least one storage step, so every
/// pass lowers a non-zero stored value by at least one step and trails reach
/// exactly zero on quantized targets too.
pub fn quantized_decay(decay: Decay, format: u32) -> Decay {
    Decay::new(decay.factor, decay.epsilon.max(storage_step(format)))
}

pub struct GlTrailCompositor {
    gl: Rc<glow::Context>,
    format: u32,
    targets: [RenderTarget; 2],
    roles: PingPong,
    decay: Program,
    particles: Program,
    empty_vao: glow::VertexArray,
    points_vao: glow::VertexArray,
    points_vbo: glow::Buffer,
    vertices: Vec<u8>,
}

impl GlTrailCompositor {
    #[allow(unsafe_code)]
    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Result<Self, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        let gl = ctx.shared();
        let format = ctx.trail_format();
        let targets = Self::make_targets(&gl, format, width, height)?;
        let decay = Program::new(&gl, FULLSCREEN_VERTEX, DECAY_FRAGMENT)?;
        let particles = Program::new(&gl, PARTICLE_VERTEX, PARTICLE_FRAGMENT)?;

        // SAFETY: attribute layout matches PARTICLE_VERTEX locations 0..=2 and
        // the interleaved stride written by `fill_vertices`.
        let (empty_vao, points_vao, points_vbo) = unsafe {
            let empty_vao = gl.create_vertex_array().map_err(FlowError::Gpu)?;
            let points_vao = gl.create_vertex_array().map_err(FlowError::Gpu)?;
            let points_vbo = gl.create_buffer().map_err(FlowError::Gpu)?;
            gl.bind_vertex_array(Some(points_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(points_vbo));
            let stride = (VERTEX_FLOATS * 4) as i32;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 8);
            gl.enable_vertex_attrib_array(2);
            gl.vertex_attrib_pointer_f32(2, 1, glow::FLOAT, false, stride, 20);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            (empty_vao, points_vao, points_vbo)
        };

        Ok(Self {
            gl,
            format,
            targets,
            roles: PingPong::new(),
            decay,
            particles,
            empty_vao,
            points_vao,
            points_vbo,
            vertices: Vec::new(),
        })
    }

    fn make_targets(
        gl: &glow::Context,
        format: u32,
        width: u32,
        height: u32,
    ) -> Result<[RenderTarget; 2], FlowError> {
        let config = TextureConfig::rgba16f(width, height).with_format(format);
        let a = RenderTarget::new(gl, config)?;
        let b = match RenderTarget::new(gl, config) {
            Ok(b) => b,
            Err(e) => {
                a.destroy(gl);
                return Err(e);
            }
        };
        a.clear(gl);
        b.clear(gl);
        Ok([a, b])
    }

    pub fn width(&self) -> u32 {
        self.targets[0].width()
    }

    pub fn height(&self) -> u32 {
        self.targets[0].height()
    }

    /// Recreates both targets at the new size. Trail history is lost.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        if (width, height) == (self.width(), self.height()) {
            return Ok(());
        }
        let fresh = Self::make_targets(&self.gl, self.format, width, height)?;
        for old in std::mem::replace(&mut self.targets, fresh).iter() {
            old.destroy(&self.gl);
        }
        self.roles = PingPong::new();
        log::debug!("gpu trails resized to {width}x{height}");
        Ok(())
    }

    /// One tick: decay history into the write target, splat `particles`
    /// additively, present to the default framebuffer, swap.
    ///
    /// `decay` is adjusted by [`quantized_decay`] for the target format.
    #[allow(unsafe_code)]
    pub fn composite(
        &mut self,
        decay: Decay,
        present: PresentMode,
        particles: &ParticleBuffers,
        particle_size: f32,
    ) {
        let decay = quantized_decay(decay, self.format);
        let gl = &*self.gl;
        let read = &self.targets[self.roles.read_index()];
        let write = &self.targets[self.roles.write_index()];
        let (w, h) = (write.width(), write.height());

        write.bind(gl);
        self.draw_decay(gl, read.texture(), decay);

        let count = fill_vertices(particles, &mut self.vertices);
        self.particles.use_program(gl);
        self.particles
            .set_vec2(gl, "u_half_viewport", w as f32 / 2.0, h as f32 / 2.0);
        self.particles.set_f32(gl, "u_particle_size", particle_size);
        self.particles.set_f32(gl, "u_opacity", SPLAT_OPACITY);
        // SAFETY: `vertices` holds `count` interleaved vertices matching the VAO layout.
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.points_vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &self.vertices, glow::STREAM_DRAW);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.enable(glow::BLEND);
            gl.blend_func(glow::ONE, glow::ONE);
            gl.bind_vertex_array(Some(self.points_vao));
            gl.draw_arrays(glow::POINTS, 0, count as i32);
            gl.bind_vertex_array(None);
            gl.disable(glow::BLEND);

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(0, 0, w as i32, h as i32);
        }
        let present_decay = match present {
            PresentMode::DoubleDecay => decay,
            PresentMode::Direct => Decay::new(1.0, 0.0),
        };
        self.draw_decay(gl, write.texture(), present_decay);

        self.roles.swap();
    }

    #[allow(unsafe_code)]
    fn draw_decay(&self, gl: &glow::Context, source: glow::Texture, decay: Decay) {
        self.decay.use_program(gl);
        self.decay.set_i32(gl, "u_source", 0);
        self.decay.set_f32(gl, "u_factor", decay.factor);
        self.decay.set_f32(gl, "u_epsilon", decay.epsilon);
        // SAFETY: `source` is a live texture and the decay program is current.
        unsafe {
            gl.disable(glow::BLEND);
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(source));
            gl.bind_vertex_array(Some(self.empty_vao));
            gl.draw_arrays(glow::TRIANGLES, 0, 3);
            gl.bind_vertex_array(None);
        }
    }
}

/// Interleaves particle attributes into native-endian bytes and returns the
/// vertex count.
fn fill_vertices(buffers: &ParticleBuffers, out: &mut Vec<u8>) -> usize {
    out.clear();
    let count = buffers
        .positions
        .len()
        .min(buffers.colors.len())
        .min(buffers.sizes.len());
    out.reserve(count * VERTEX_FLOATS * 4);
    for i in 0..count {
        let [x, y] = buffers.positions[i];
        let [r, g, b] = buffers.colors[i];
        for v in [x, y, r, g, b, buffers.sizes[i]] {
            out.extend_from_slice(&v.to_ne_bytes());
        }
    }
    count
}

impl Drop for GlTrailCompositor {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        let gl = &*self.gl;
        for t in &self.targets {
            t.destroy(gl);
        }
        self.decay.destroy(gl);
        self.particles.destroy(gl);
        // SAFETY: handles are owned by self and dropped with it.
        unsafe {
            gl.delete_vertex_array(self.empty_vao);
            gl.delete_vertex_array(self.points_vao);
            gl.delete_buffer(self.points_vbo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::DecayCurve;

    #[test]
    fn fill_vertices_interleaves_attributes() {
        let buffers = ParticleBuffers {
            positions: vec![[1.0, 2.0], [3.0, 4.0]],
            colors: vec![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]],
            sizes: vec![1.5, 2.5],
        };
        let mut out = Vec::new();
        assert_eq!(fill_vertices(&buffers, &mut out), 2);
        assert_eq!(out.len(), 2 * VERTEX_FLOATS * 4);

        let floats: Vec<f32> = out
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[..6], &[1.0, 2.0, 0.1, 0.2, 0.3, 1.5]);
        assert_eq!(&floats[6..], &[3.0, 4.0, 0.4, 0.5, 0.6, 2.5]);
    }

    #[test]
    fn fill_vertices_truncates_to_shortest_attribute() {
        let buffers = ParticleBuffers {
            positions: vec![[0.0, 0.0]; 3],
            colors: vec![[1.0; 3]; 2],
            sizes: vec![1.0; 3],
        };
        let mut out = vec![0xAA; 7];
        assert_eq!(fill_vertices(&buffers, &mut out), 2);
        assert_eq!(out.len(), 2 * VERTEX_FLOATS * 4);
    }

    /// Decays one stored 8-bit channel the way an RGBA8 target would.
    fn store_u8(v: f32) -> f32 {
        (v.clamp(0.0, 1.0) * 255.0).round() / 255.0
    }

    #[test]
    fn storage_step_tracks_format() {
        assert_eq!(storage_step(glow::RGBA8), 1.0 / 255.0);
        assert_eq!(storage_step(glow::RGBA16F), 1.0 / 2048.0);
        assert_eq!(storage_step(glow::RGBA32F), 0.0);
    }

    #[test]
    fn quantized_decay_keeps_larger_epsilon_and_factor() {
        let fade = Decay::from_curve(DecayCurve::Fade, 10.0);
        let q = quantized_decay(fade, glow::RGBA16F);
        assert_eq!(q, fade);
        let q8 = quantized_decay(fade, glow::RGBA8);
        assert_eq!(q8.factor, fade.factor);
        assert_eq!(q8.epsilon, 1.0 / 255.0);
    }

    #[test]
    fn linear_decay_reaches_zero_on_rgba8() {
        let linear = Decay::from_curve(DecayCurve::Linear, 10.0);
        // Unadjusted, a mid-grey pixel rounds back to itself forever.
        let stuck = store_u8(linear.apply(200.0 / 255.0));
        assert_eq!(stuck, 200.0 / 255.0);

        let decay = quantized_decay(linear, glow::RGBA8);
        let mut v = 200.0 / 255.0;
        let mut ticks = 0;
        while v > 0.0 {
            v = store_u8(decay.apply(v));
            ticks += 1;
            assert!(ticks <= 255, "still {v} after {ticks} ticks");
        }
    }

    #[test]
    fn slow_fade_reaches_zero_on_rgba8() {
        let decay = quantized_decay(Decay::from_curve(DecayCurve::Fade, 0.1), glow::RGBA8);
        let mut v = 1.0;
        for _ in 0..255 {
            v = store_u8(decay.apply(v));
        }
        assert_eq!(v, 0.0);
    }

    #[test]
    #[ignore = "requires GL context"]
    fn composite_matches_cpu_decay() {
        // Would test: a uniform 0.5 history decays to 0.5·f − e after one tick
        // with no particles, like TrailCompositor.
    }
}
