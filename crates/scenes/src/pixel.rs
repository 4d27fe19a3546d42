//! Pure-computation RGBA8 conversion of the presented trail frame, with the
//! optional vector-field overlay drawn on top.
//!
//! Always available (no feature gate) so hosts that blit raw pixels and the
//! `png` snapshot path share one conversion.

use flowtrail_core::overlay::Glyph;
use flowtrail_core::trail::TrailBuffer;
use flowtrail_core::Simulation;

/// Overlay arrow colour.
pub const GLYPH_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Converts a trail buffer to RGBA8, alpha always 255.
pub fn trail_to_rgba(trail: &TrailBuffer) -> Vec<u8> {
    trail
        .pixels()
        .iter()
        .flat_map(|px| {
            let [r, g, b] = px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
            [r, g, b, 255u8]
        })
        .collect()
}

/// Draws each glyph as a one-pixel line centred on its origin. World
/// coordinates have the origin at the image centre with Y up.
pub fn draw_glyphs(rgba: &mut [u8], width: usize, height: usize, glyphs: &[Glyph], max_length: f64) {
    let (hw, hh) = (width as f64 / 2.0, height as f64 / 2.0);
    for glyph in glyphs {
        let (a, b) = glyph.segment(max_length);
        let from = ((hw + a.x).round() as i64, (hh - a.y).round() as i64);
        let to = ((hw + b.x).round() as i64, (hh - b.y).round() as i64);
        line(from, to, |x, y| {
            if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                let i = (y as usize * width + x as usize) * 4;
                rgba[i..i + 4].copy_from_slice(&GLYPH_COLOR);
            }
        });
    }
}

/// Bresenham, both endpoints inclusive.
fn line((mut x0, mut y0): (i64, i64), (x1, y1): (i64, i64), mut plot: impl FnMut(i64, i64)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let (sx, sy) = ((x1 - x0).signum(), (y1 - y0).signum());
    let mut err = dx + dy;
    loop {
        plot(x0, y0);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// The frame a viewer would see: presented trails plus any overlay glyphs.
pub fn frame_to_rgba(sim: &Simulation) -> Vec<u8> {
    let trail = sim.presented();
    let mut rgba = trail_to_rgba(trail);
    draw_glyphs(
        &mut rgba,
        trail.width(),
        trail.height(),
        sim.glyphs(),
        sim.overlay().max_length,
    );
    rgba
}
