//! Raw RGB8 video frames and downsampling to the analysis resolution.

use crate::error::FlowError;
use crate::raster::RgbRaster;

/// One video frame, tightly packed RGB8, row 0 at the top.
///
/// Sources may deliver any resolution; the analyzer downsamples internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl VideoFrame {
    /// Wraps packed RGB8 bytes.
    ///
    /// Returns `FlowError::InvalidDimensions` for a zero dimension and
    /// `FlowError::DimensionMismatch` if `data.len() != width * height * 3`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or(FlowError::InvalidDimensions)?;
        if data.len() != expected {
            return Err(FlowError::DimensionMismatch {
                lhs_w: width,
                lhs_h: height,
                rhs_w: data.len() / 3,
                rhs_h: 1,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one colour.
    pub fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Result<Self, FlowError> {
        let len = width.saturating_mul(height);
        let data = rgb.iter().copied().cycle().take(len * 3).collect();
        Self::new(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable bytes, for sources that redraw a frame in place.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel at `(x, y)`, clamped to the frame edge.
    pub fn pixel(&self, x: isize, y: isize) -> [u8; 3] {
        let xi = x.clamp(0, self.width as isize - 1) as usize;
        let yi = y.clamp(0, self.height as isize - 1) as usize;
        let i = (yi * self.width + xi) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    fn texel(&self, x: isize, y: isize) -> [f32; 3] {
        let [r, g, b] = self.pixel(x, y);
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
    }

    /// Resamples into `target` with bilinear filtering at texel centres,
    /// the same lookup a linearly filtered texture performs.
    pub fn downsample_into(&self, target: &mut RgbRaster) {
        let tw = target.width();
        let sx = self.width as f64 / tw as f64;
        let sy = self.height as f64 / target.height() as f64;

        for (idx, out) in target.pixels_mut().iter_mut().enumerate() {
            let (i, j) = (idx % tw, idx / tw);
            let u = (i as f64 + 0.5) * sx - 0.5;
            let v = (j as f64 + 0.5) * sy - 0.5;
            let x0 = u.floor();
            let y0 = v.floor();
            let fx = (u - x0) as f32;
            let fy = (v - y0) as f32;
            let (x0, y0) = (x0 as isize, y0 as isize);

            let c00 = self.texel(x0, y0);
            let c10 = self.texel(x0 + 1, y0);
            let c01 = self.texel(x0, y0 + 1);
            let c11 = self.texel(x0 + 1, y0 + 1);
            for c in 0..3 {
                let top = c00[c] + (c10[c] - c00[c]) * fx;
                let bottom = c01[c] + (c11[c] - c01[c]) * fx;
                out[c] = top + (bottom - top) * fy;
            }
        }
    }
}
