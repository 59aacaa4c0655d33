//! Tolerance-based flood fill over the surface's flat RGBA buffer.
//!
//! Runs a DFS over a `Vec<u32>` stack of packed flat indices; the byte mask
//! doubles as the visited set. Matching tolerances are asymmetric on purpose:
//! paint must not bleed across region borders (tight, alpha included), while
//! erase must take a stroke's soft anti-aliased fringe along with its core
//! (wide, alpha ignored).

use crate::surface::Surface;

/// Per-channel tolerance when filling with color.
const FILL_TOLERANCE: i16 = 8;
/// Per-channel tolerance when erase-filling.
const ERASE_TOLERANCE: i16 = 90;
/// Erase tolerance when the start pixel is mostly opaque.
const ERASE_TOLERANCE_OPAQUE: i16 = 120;

/// Flood-fill the 4-connected region around `(start_x, start_y)`.
///
/// Paint mode writes `(color, opacity)` verbatim; erase mode clears pixels to
/// transparent. No-ops (returning `None`) when the start pixel already has
/// the exact fill color, is already transparent in erase mode, or lies out
/// of bounds. Otherwise returns the filled bounding box
/// `(min_x, min_y, max_x, max_y)`.
pub fn flood_fill(
    surface: &mut Surface,
    start_x: u32,
    start_y: u32,
    color: [u8; 3],
    opacity: f32,
    is_erase: bool,
) -> Option<(u32, u32, u32, u32)> {
    let width = surface.width();
    let height = surface.height();
    if start_x >= width || start_y >= height {
        return None;
    }

    let wu = width as usize;
    let fill_a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let start = *surface.get_pixel(start_x, start_y);

    // Nothing to do: exact color already present / already transparent
    if !is_erase
        && start[0] == color[0]
        && start[1] == color[1]
        && start[2] == color[2]
        && start[3] == fill_a
    {
        return None;
    }
    if is_erase && start[3] == 0 {
        return None;
    }

    let erase_tolerance = if start[3] > 180 { ERASE_TOLERANCE_OPAQUE } else { ERASE_TOLERANCE };

    // Inline pixel fetch from the flat RGBA buffer
    #[inline(always)]
    fn pix(flat: &[u8], idx: usize) -> [u8; 4] {
        let o = idx * 4;
        [flat[o], flat[o + 1], flat[o + 2], flat[o + 3]]
    }

    #[inline(always)]
    fn diff(a: u8, b: u8) -> i16 {
        (a as i16 - b as i16).abs()
    }

    let matches = |p: [u8; 4]| -> bool {
        if is_erase {
            // Alpha ignored so soft edges go with the stroke
            p[3] > 0
                && diff(p[0], start[0]) <= erase_tolerance
                && diff(p[1], start[1]) <= erase_tolerance
                && diff(p[2], start[2]) <= erase_tolerance
        } else {
            diff(p[0], start[0]) <= FILL_TOLERANCE
                && diff(p[1], start[1]) <= FILL_TOLERANCE
                && diff(p[2], start[2]) <= FILL_TOLERANCE
                && diff(p[3], start[3]) <= FILL_TOLERANCE
        }
    };

    let mut visited = vec![0u8; wu * height as usize];
    let mut min_x = start_x;
    let mut min_y = start_y;
    let mut max_x = start_x;
    let mut max_y = start_y;

    // DFS stack of packed flat indices (y * width + x)
    let seed = start_y as usize * wu + start_x as usize;
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    visited[seed] = 1;
    stack.push(seed as u32);

    #[inline(always)]
    fn write(flat: &mut [u8], idx: usize, rgba: [u8; 4]) {
        let o = idx * 4;
        flat[o..o + 4].copy_from_slice(&rgba);
    }

    let fill_rgba =
        if is_erase { [0, 0, 0, 0] } else { [color[0], color[1], color[2], fill_a] };
    let flat = surface.as_raw_mut();

    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        let x = (idx % wu) as u32;
        let y = (idx / wu) as u32;

        write(flat, idx, fill_rgba);

        if x < min_x {
            min_x = x;
        }
        if x > max_x {
            max_x = x;
        }
        if y < min_y {
            min_y = y;
        }
        if y > max_y {
            max_y = y;
        }

        // Left
        if x > 0 {
            let ni = idx - 1;
            if visited[ni] == 0 && matches(pix(flat, ni)) {
                visited[ni] = 1;
                stack.push(ni as u32);
            }
        }
        // Right
        if x + 1 < width {
            let ni = idx + 1;
            if visited[ni] == 0 && matches(pix(flat, ni)) {
                visited[ni] = 1;
                stack.push(ni as u32);
            }
        }
        // Up
        if y > 0 {
            let ni = idx - wu;
            if visited[ni] == 0 && matches(pix(flat, ni)) {
                visited[ni] = 1;
                stack.push(ni as u32);
            }
        }
        // Down
        if y + 1 < height {
            let ni = idx + wu;
            if visited[ni] == 0 && matches(pix(flat, ni)) {
                visited[ni] = 1;
                stack.push(ni as u32);
            }
        }
    }

    Some((min_x, min_y, max_x, max_y))
}
