//! Low-resolution rasters used by video analysis.
//!
//! [`RgbRaster`] holds a downsampled video frame as linear floats in [0, 1].
//! [`LowResField`] holds the analysis output: two 8-bit channels per texel
//! storing a vector in [-1, 1]². Byte 128 is exactly zero; bytes 0 and 255
//! are exactly -1 and +1. Row 0 is the top of the image in both.

use crate::error::FlowError;
use glam::DVec2;

/// Stored byte for a zero component.
pub const ZERO_CODE: u8 = 128;

/// Maps a vector component in [-1, 1] to its 8-bit stored form: 128 steps
/// below zero, 127 above. Values outside [-1, 1] saturate.
pub fn encode_component(v: f64) -> u8 {
    let v = v.clamp(-1.0, 1.0);
    let span = if v < 0.0 { 128.0 } else { 127.0 };
    (ZERO_CODE as f64 + (v * span).round()) as u8
}

/// Maps a stored 8-bit channel back to [-1, 1]. Inverse of
/// [`encode_component`] on every byte it produces.
pub fn decode_component(c: u8) -> f64 {
    let d = c as f64 - ZERO_CODE as f64;
    if d < 0.0 {
        d / 128.0
    } else {
        d / 127.0
    }
}

fn checked_len(width: usize, height: usize) -> Result<usize, FlowError> {
    if width == 0 || height == 0 {
        return Err(FlowError::InvalidDimensions);
    }
    width
        .checked_mul(height)
        .ok_or(FlowError::InvalidDimensions)
}

/// Two-channel (dx, dy) analysis raster, quantized to 8 bits per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LowResField {
    width: usize,
    height: usize,
    data: Vec<[u8; 2]>,
}

impl LowResField {
    /// Creates a field storing the zero vector everywhere.
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        Self::uniform(width, height, DVec2::ZERO)
    }

    /// Creates a field storing `v` at every texel.
    pub fn uniform(width: usize, height: usize, v: DVec2) -> Result<Self, FlowError> {
        let len = checked_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![[encode_component(v.x), encode_component(v.y)]; len],
        })
    }

    /// Builds a field from raw stored channel pairs, row-major.
    pub fn from_encoded(
        width: usize,
        height: usize,
        data: Vec<[u8; 2]>,
    ) -> Result<Self, FlowError> {
        let expected = checked_len(width, height)?;
        if data.len() != expected {
            return Err(FlowError::DimensionMismatch {
                lhs_w: width,
                lhs_h: height,
                rhs_w: data.len(),
                rhs_h: 1,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Stored channel pairs, row-major.
    pub fn encoded(&self) -> &[[u8; 2]] {
        &self.data
    }

    /// Mutable access for readback paths that fill the raster in place.
    pub fn encoded_mut(&mut self) -> &mut [[u8; 2]] {
        &mut self.data
    }

    /// Encodes and stores `v` at texel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the texel lies outside the raster.
    pub fn set(&mut self, x: usize, y: usize, v: DVec2) {
        let idx = y * self.width + x;
        self.data[idx] = [encode_component(v.x), encode_component(v.y)];
    }

    /// Decoded vector at texel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the texel lies outside the raster.
    pub fn get(&self, x: usize, y: usize) -> DVec2 {
        let [cx, cy] = self.data[y * self.width + x];
        DVec2::new(decode_component(cx), decode_component(cy))
    }
}

/// A small RGB image with float channels in [0, 1], row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbRaster {
    width: usize,
    height: usize,
    data: Vec<[f32; 3]>,
}

impl RgbRaster {
    /// Creates a black raster.
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        let len = checked_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![[0.0; 3]; len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [[f32; 3]] {
        &mut self.data
    }

    /// Pixel at signed coordinates, clamped to the last row/column.
    pub fn get_clamped(&self, x: isize, y: isize) -> [f32; 3] {
        let xi = x.clamp(0, self.width as isize - 1) as usize;
        let yi = y.clamp(0, self.height as isize - 1) as usize;
        self.data[yi * self.width + xi]
    }

    /// Mean of the three channels at clamped coordinates.
    pub fn luminance(&self, x: isize, y: isize) -> f32 {
        let [r, g, b] = self.get_clamped(x, y);
        (r + g + b) / 3.0
    }

    /// Bilinear sample at continuous texel coordinates, where texel `i` has
    /// its centre at `i + 0.5`. Coordinates outside the raster clamp to edge.
    pub fn sample_bilinear(&self, u: f64, v: f64) -> [f32; 3] {
        let px = u - 0.5;
        let py = v - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = (px - x0) as f32;
        let fy = (py - y0) as f32;
        let (x0, y0) = (x0 as isize, y0 as isize);

        let c00 = self.get_clamped(x0, y0);
        let c10 = self.get_clamped(x0 + 1, y0);
        let c01 = self.get_clamped(x0, y0 + 1);
        let c11 = self.get_clamped(x0 + 1, y0 + 1);

        let mut out = [0.0_f32; 3];
        for (c, o) in out.iter_mut().enumerate() {
            let top = c00[c] + (c10[c] - c00[c]) * fx;
            let bottom = c01[c] + (c11[c] - c01[c]) * fx;
            *o = top + (bottom - top) * fy;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_maps_unit_range_onto_bytes() {
        assert_eq!(encode_component(-1.0), 0);
        assert_eq!(encode_component(1.0), 255);
        assert_eq!(encode_component(0.0), 128);
    }

    #[test]
    fn encode_saturates_out_of_range_values() {
        assert_eq!(encode_component(-7.0), 0);
        assert_eq!(encode_component(3.5), 255);
    }

    #[test]
    fn decode_endpoints_are_exact() {
        assert_eq!(decode_component(0), -1.0);
        assert_eq!(decode_component(255), 1.0);
    }

    #[test]
    fn zero_survives_storage_exactly() {
        assert_eq!(decode_component(encode_component(0.0)), 0.0);
        assert_eq!(decode_component(encode_component(-0.0)), 0.0);
        let f = LowResField::new(3, 2).unwrap();
        assert!((0..2).all(|y| (0..3).all(|x| f.get(x, y) == DVec2::ZERO)));
    }

    #[test]
    fn every_byte_round_trips() {
        for c in 0..=255u8 {
            assert_eq!(encode_component(decode_component(c)), c, "byte {c}");
        }
    }

    #[test]
    fn decode_of_encode_is_within_one_quantization_step() {
        for i in -100..=100 {
            let v = i as f64 / 100.0;
            let back = decode_component(encode_component(v));
            assert!((back - v).abs() <= 1.0 / 255.0 + 1e-12, "{v} -> {back}");
        }
    }

    #[test]
    fn new_field_rejects_zero_dimensions() {
        assert!(matches!(
            LowResField::new(0, 60),
            Err(FlowError::InvalidDimensions)
        ));
        assert!(LowResField::new(80, 0).is_err());
    }

    #[test]
    fn uniform_field_stores_encoded_value_everywhere() {
        let f = LowResField::uniform(4, 3, DVec2::new(1.0, 0.0)).unwrap();
        assert_eq!(f.encoded().len(), 12);
        assert!(f.encoded().iter().all(|&c| c == [255, 128]));
    }

    #[test]
    fn from_encoded_validates_length() {
        let err = LowResField::from_encoded(4, 4, vec![[128, 128]; 15]).unwrap_err();
        assert!(matches!(err, FlowError::DimensionMismatch { .. }));
        assert!(LowResField::from_encoded(4, 4, vec![[128, 128]; 16]).is_ok());
    }

    #[test]
    fn set_then_get_round_trips_through_quantization() {
        let mut f = LowResField::new(8, 8).unwrap();
        f.set(3, 5, DVec2::new(-0.5, 0.25));
        let v = f.get(3, 5);
        assert!((v.x + 0.5).abs() <= 1.0 / 255.0 + 1e-12);
        assert!((v.y - 0.25).abs() <= 1.0 / 255.0 + 1e-12);
    }

    #[test]
    fn rgb_get_clamped_never_wraps() {
        let mut r = RgbRaster::new(3, 2).unwrap();
        r.pixels_mut()[2] = [1.0, 0.0, 0.0];
        assert_eq!(r.get_clamped(10, -4), [1.0, 0.0, 0.0]);
        assert_eq!(r.get_clamped(-1, 0), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn luminance_is_channel_mean() {
        let mut r = RgbRaster::new(1, 1).unwrap();
        r.pixels_mut()[0] = [0.3, 0.6, 0.9];
        assert!((r.luminance(0, 0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn bilinear_sample_at_texel_centre_is_exact() {
        let mut r = RgbRaster::new(2, 2).unwrap();
        r.pixels_mut()[1] = [1.0, 1.0, 1.0];
        assert_eq!(r.sample_bilinear(1.5, 0.5), [1.0, 1.0, 1.0]);
        assert_eq!(r.sample_bilinear(0.5, 0.5), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn bilinear_sample_between_centres_blends() {
        let mut r = RgbRaster::new(2, 1).unwrap();
        r.pixels_mut()[1] = [1.0, 0.0, 0.5];
        let mid = r.sample_bilinear(1.0, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
        assert!((mid[2] - 0.25).abs() < 1e-6);
    }
}
