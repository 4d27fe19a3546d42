//! Per-texel analysis kernels and the image-processing stage seam.
//!
//! An [`AnalysisStage`] runs one kernel over the low-resolution frame pair and
//! can copy its output into a host-side [`LowResField`]. [`CpuStage`] is the
//! reference implementation; the `render` feature adds a GPU stage running
//! the same kernels as fragment shaders.
//!
//! Stored vectors are in world orientation: +X right, +Y up.

use crate::error::FlowError;
use crate::raster::{LowResField, RgbRaster};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Motion vectors are halved after the 3×3 correlation.
pub const MOTION_GAIN: f64 = 0.5;

/// Sobel responses span [-4, 4] for luminance in [0, 1].
pub const SOBEL_NORMALIZATION: f64 = 4.0;

/// Which analysis the stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Frame difference against the previous tick.
    #[default]
    Motion,
    /// Sobel gradient of the current frame's luminance.
    Edges,
}

impl AnalysisMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Motion => "motion",
            Self::Edges => "edges",
        }
    }

    /// Parses `"motion"` or `"edges"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "motion" => Some(Self::Motion),
            "edges" => Some(Self::Edges),
            _ => None,
        }
    }
}

/// Scalar uniforms for one kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub mode: AnalysisMode,
    /// Vectors shorter than this are zeroed.
    pub threshold: f64,
    /// Sobel neighbour distance in texels.
    pub edge_width: f64,
    /// Mirror the X axis (front-facing camera).
    pub mirror: bool,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Motion,
            threshold: 0.1,
            edge_width: 1.0,
            mirror: true,
        }
    }
}

/// The image-processing stage: one kernel pass plus an optional readback.
pub trait AnalysisStage {
    /// Runs the kernel selected by `params.mode`. `previous` is ignored in
    /// edge mode. Both rasters must share the stage's resolution.
    fn execute(
        &mut self,
        current: &RgbRaster,
        previous: &RgbRaster,
        params: &KernelParams,
    ) -> Result<(), FlowError>;

    /// Copies the last kernel output into `out`.
    fn read_back(&mut self, out: &mut LowResField) -> Result<(), FlowError>;
}

fn threshold(v: DVec2, min: f64) -> DVec2 {
    if v.length() < min {
        DVec2::ZERO
    } else {
        v
    }
}

/// Frame-difference motion estimate at texel `(x, y)`.
///
/// Each of the 3×3 neighbours contributes its luminance change weighted by
/// its offset from the centre; the sum points toward where brightness grew.
pub fn motion_at(
    current: &RgbRaster,
    previous: &RgbRaster,
    x: usize,
    y: usize,
    params: &KernelParams,
) -> DVec2 {
    let (cx, cy) = (x as isize, y as isize);
    let mut m = DVec2::ZERO;
    for dy in -1..=1_isize {
        for dx in -1..=1_isize {
            let sx = if params.mirror {
                current.width() as isize - 1 - (cx + dx)
            } else {
                cx + dx
            };
            let diff = current.luminance(sx, cy + dy) - previous.luminance(sx, cy + dy);
            m += DVec2::new(dx as f64, dy as f64) * diff as f64;
        }
    }
    let m = threshold(m * MOTION_GAIN, params.threshold);
    // Rows grow downward.
    DVec2::new(m.x, -m.y)
}

/// Sobel luminance gradient at texel `(x, y)` with neighbours `edge_width`
/// texels away.
pub fn sobel_at(current: &RgbRaster, x: usize, y: usize, params: &KernelParams) -> DVec2 {
    let w = params.edge_width;
    let column = if params.mirror {
        (current.width() - 1 - x) as f64
    } else {
        x as f64
    };
    let (u, v) = (column + 0.5, y as f64 + 0.5);
    let lum = |dx: f64, dy: f64| {
        let [r, g, b] = current.sample_bilinear(u + dx * w, v + dy * w);
        ((r + g + b) / 3.0) as f64
    };

    let tl = lum(-1.0, -1.0);
    let t = lum(0.0, -1.0);
    let tr = lum(1.0, -1.0);
    let l = lum(-1.0, 0.0);
    let r = lum(1.0, 0.0);
    let bl = lum(-1.0, 1.0);
    let b = lum(0.0, 1.0);
    let br = lum(1.0, 1.0);

    let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
    let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
    let mut g = DVec2::new(gx, gy) / SOBEL_NORMALIZATION;
    if params.mirror {
        g.x = -g.x;
    }
    let g = threshold(g, params.threshold);
    DVec2::new(g.x, -g.y)
}

/// Host-side reference stage.
#[derive(Debug, Clone)]
pub struct CpuStage {
    output: LowResField,
}

impl CpuStage {
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        Ok(Self {
            output: LowResField::new(width, height)?,
        })
    }

    fn check(&self, raster: &RgbRaster) -> Result<(), FlowError> {
        if raster.width() != self.output.width() || raster.height() != self.output.height() {
            return Err(FlowError::DimensionMismatch {
                lhs_w: self.output.width(),
                lhs_h: self.output.height(),
                rhs_w: raster.width(),
                rhs_h: raster.height(),
            });
        }
        Ok(())
    }
}

impl AnalysisStage for CpuStage {
    fn execute(
        &mut self,
        current: &RgbRaster,
        previous: &RgbRaster,
        params: &KernelParams,
    ) -> Result<(), FlowError> {
        self.check(current)?;
        self.check(previous)?;
        let (w, h) = (self.output.width(), self.output.height());
        for y in 0..h {
            for x in 0..w {
                let v = match params.mode {
                    AnalysisMode::Motion => motion_at(current, previous, x, y, params),
                    AnalysisMode::Edges => sobel_at(current, x, y, params),
                };
                self.output.set(x, y, v);
            }
        }
        Ok(())
    }

    fn read_back(&mut self, out: &mut LowResField) -> Result<(), FlowError> {
        if out.width() != self.output.width() || out.height() != self.output.height() {
            return Err(FlowError::DimensionMismatch {
                lhs_w: self.output.width(),
                lhs_h: self.output.height(),
                rhs_w: out.width(),
                rhs_h: out.height(),
            });
        }
        out.encoded_mut().copy_from_slice(self.output.encoded());
        Ok(())
    }
}
