//! Brush and eraser stroke rasterization.
//!
//! Strokes are stamped as axis-aligned squares at unit intervals along the
//! segment, with no anti-aliasing: hard pixel edges are the intended look.

use image::Rgba;

use crate::surface::Surface;

/// Stamp squares of side `size` along the segment from `(x1, y1)` to
/// `(x2, y2)`. The step count is `ceil(distance)` (min 1) so strokes stay
/// gap-free regardless of how sparsely the pointer was sampled.
///
/// Paint mode composites source-over with `opacity`; erase mode clears alpha
/// (destination-out), with `opacity` controlling how strongly it erases.
pub fn stroke_segment(
    surface: &mut Surface,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    size: u32,
    color: [u8; 3],
    opacity: f32,
    is_erase: bool,
) {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let distance = (dx * dx + dy * dy).sqrt();

    let steps = (distance.ceil() as u32).max(1);
    let x_inc = dx / steps as f32;
    let y_inc = dy / steps as f32;

    for i in 0..=steps {
        let cx = x1 + x_inc * i as f32;
        let cy = y1 + y_inc * i as f32;
        stamp_square(surface, cx, cy, size, color, opacity, is_erase);
    }
}

/// One hard-edged square stamp centered on `(cx, cy)`.
fn stamp_square(
    surface: &mut Surface,
    cx: f32,
    cy: f32,
    size: u32,
    color: [u8; 3],
    opacity: f32,
    is_erase: bool,
) {
    let half = size as f32 / 2.0;
    let left = (cx - half).round() as i64;
    let top = (cy - half).round() as i64;
    let opacity = opacity.clamp(0.0, 1.0);

    for py in top..top + size as i64 {
        if py < 0 || py as u32 >= surface.height() {
            continue;
        }
        for px in left..left + size as i64 {
            if px < 0 || px as u32 >= surface.width() {
                continue;
            }
            let (x, y) = (px as u32, py as u32);
            let dst = *surface.get_pixel(x, y);
            let out = if is_erase {
                erase_pixel(dst, opacity)
            } else {
                blend_source_over(dst, color, opacity)
            };
            surface.put_pixel(x, y, out);
        }
    }
}

/// Destination-out: remaining alpha = dst.a * (1 - strength).
fn erase_pixel(dst: Rgba<u8>, strength: f32) -> Rgba<u8> {
    let alpha = (dst[3] as f32 * (1.0 - strength)).round() as u8;
    if alpha == 0 {
        Rgba([0, 0, 0, 0])
    } else {
        Rgba([dst[0], dst[1], dst[2], alpha])
    }
}

/// Straight-alpha source-over blend of an opaque brush color at `opacity`.
fn blend_source_over(dst: Rgba<u8>, color: [u8; 3], opacity: f32) -> Rgba<u8> {
    if opacity >= 1.0 {
        return Rgba([color[0], color[1], color[2], 255]);
    }
    let src_a = opacity;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| -> u8 {
        let s = s as f32;
        let d = d as f32;
        let out = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        out.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(color[0], dst[0]),
        channel(color[1], dst[1]),
        channel(color[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}
