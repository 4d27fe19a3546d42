//! PNG snapshots of a running simulation.
//!
//! Feature-gated behind `png` (default on) so embedders that only need raw
//! pixels avoid the `image` dependency.

use flowtrail_core::error::FlowError;
use flowtrail_core::Simulation;
use std::path::Path;

use crate::pixel::frame_to_rgba;

/// Writes the presented frame, overlay included, as a PNG.
///
/// Returns `FlowError::InvalidDimensions` if the viewport overflows `u32`,
/// or `FlowError::Io` on write failure.
pub fn write_png(sim: &Simulation, path: &Path) -> Result<(), FlowError> {
    let trail = sim.presented();
    let w = u32::try_from(trail.width()).map_err(|_| FlowError::InvalidDimensions)?;
    let h = u32::try_from(trail.height()).map_err(|_| FlowError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, frame_to_rgba(sim))
        .ok_or_else(|| FlowError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| FlowError::Io(e.to_string()))?;
    log::debug!("snapshot written to {}", path.display());
    Ok(())
}
