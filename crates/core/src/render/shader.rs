//! Shader compilation and the [`Program`] handle used by every pass.

use crate::error::FlowError;
use glow::HasContext;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: &'static str, log: String },
    #[error("program failed to link:\n{0}")]
    Link(String),
}

impl From<ShaderError> for FlowError {
    fn from(err: ShaderError) -> Self {
        FlowError::Gpu(err.to_string())
    }
}

/// Source listing with right-aligned line numbers, followed by the driver log.
pub fn annotate_source(source: &str, log: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let width = lines.len().max(1).to_string().len();
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        out.push_str(&format!("{:>width$}| {line}\n", i + 1));
    }
    if !log.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(log.trim_end());
    }
    out.trim_end().to_string()
}

fn stage_name(kind: u32) -> &'static str {
    match kind {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

#[allow(unsafe_code)]
fn compile(gl: &glow::Context, kind: u32, source: &str) -> Result<glow::Shader, ShaderError> {
    let stage = stage_name(kind);
    // SAFETY: `kind` is a shader-stage enum and the handle is deleted on failure.
    unsafe {
        let shader = gl
            .create_shader(kind)
            .map_err(|log| ShaderError::Compile { stage, log })?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            return Ok(shader);
        }
        let log = annotate_source(source, &gl.get_shader_info_log(shader));
        gl.delete_shader(shader);
        Err(ShaderError::Compile { stage, log })
    }
}

/// A linked vertex + fragment program.
pub struct Program {
    raw: glow::Program,
}

impl Program {
    #[allow(unsafe_code)]
    pub fn new(gl: &glow::Context, vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let vs = compile(gl, glow::VERTEX_SHADER, vertex)?;
        let fs = match compile(gl, glow::FRAGMENT_SHADER, fragment) {
            Ok(fs) => fs,
            Err(err) => {
                // SAFETY: `vs` was created above and is not attached anywhere.
                unsafe { gl.delete_shader(vs) };
                return Err(err);
            }
        };

        // SAFETY: both shaders are valid; they are detached and deleted
        // whether or not linking succeeds.
        unsafe {
            let raw = match gl.create_program() {
                Ok(raw) => raw,
                Err(log) => {
                    gl.delete_shader(vs);
                    gl.delete_shader(fs);
                    return Err(ShaderError::Link(log));
                }
            };
            gl.attach_shader(raw, vs);
            gl.attach_shader(raw, fs);
            gl.link_program(raw);
            gl.detach_shader(raw, vs);
            gl.detach_shader(raw, fs);
            gl.delete_shader(vs);
            gl.delete_shader(fs);

            if gl.get_program_link_status(raw) {
                Ok(Self { raw })
            } else {
                let log = gl.get_program_info_log(raw);
                gl.delete_program(raw);
                Err(ShaderError::Link(log))
            }
        }
    }

    #[allow(unsafe_code)]
    pub fn use_program(&self, gl: &glow::Context) {
        // SAFETY: `raw` is a linked program owned by self.
        unsafe { gl.use_program(Some(self.raw)) };
    }

    /// Uniform setters. Unknown names are ignored, as GL does for location -1.
    #[allow(unsafe_code)]
    pub fn set_f32(&self, gl: &glow::Context, name: &str, v: f32) {
        // SAFETY: the program is current; a missing location is a no-op.
        unsafe {
            let loc = gl.get_uniform_location(self.raw, name);
            gl.uniform_1_f32(loc.as_ref(), v);
        }
    }

    #[allow(unsafe_code)]
    pub fn set_vec2(&self, gl: &glow::Context, name: &str, x: f32, y: f32) {
        // SAFETY: as in `set_f32`.
        unsafe {
            let loc = gl.get_uniform_location(self.raw, name);
            gl.uniform_2_f32(loc.as_ref(), x, y);
        }
    }

    /// Also used for `bool` and sampler uniforms.
    #[allow(unsafe_code)]
    pub fn set_i32(&self, gl: &glow::Context, name: &str, v: i32) {
        // SAFETY: as in `set_f32`.
        unsafe {
            let loc = gl.get_uniform_location(self.raw, name);
            gl.uniform_1_i32(loc.as_ref(), v);
        }
    }

    #[allow(unsafe_code)]
    pub fn destroy(&self, gl: &glow::Context) {
        // SAFETY: `raw` is owned by self and not used after this call.
        unsafe { gl.delete_program(self.raw) };
    }
}
