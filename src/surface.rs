//! Drawing surface raster storage.
//!
//! A surface is a plain flat RGBA8 buffer. Surfaces here are one screen at a
//! fixed 2× backing ratio and get snapshotted whole for undo/history, so
//! there is no sparse/tiled storage — the buffer is small enough that a flat
//! `RgbaImage` is the simplest thing that works.

use image::{Rgba, RgbaImage};

/// Backing-buffer resolution multiplier between CSS-equivalent size and
/// raster size.
pub const BACKING_RATIO: u32 = 2;

/// A pixel with zero alpha, returned by reference for out-of-bounds reads.
static TRANSPARENT_PIXEL: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Create an empty (fully transparent) surface.
    pub fn new(width: u32, height: u32) -> Self {
        // Sanity: clamp dimensions to prevent overflow (max ~64 megapixels)
        let (width, height) = {
            let total = (width as u64) * (height as u64);
            if total > 64_000_000 || width == 0 || height == 0 {
                eprintln!(
                    "Surface::new: dimensions {}×{} out of range, clamped to 1×1",
                    width, height
                );
                (1, 1)
            } else {
                (width, height)
            }
        };
        Self { pixels: RgbaImage::new(width, height) }
    }

    /// Fill the entire surface with `color`.
    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let mut surface = Self::new(width, height);
        if color[3] > 0 {
            surface.fill(color);
        }
        surface
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self { pixels: image }
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        self.pixels.clone()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Read a pixel (returns `&TRANSPARENT_PIXEL` out of bounds).
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> &Rgba<u8> {
        if x >= self.width() || y >= self.height() {
            return &TRANSPARENT_PIXEL;
        }
        self.pixels.get_pixel(x, y)
    }

    /// Write a pixel (out-of-bounds writes are dropped).
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        self.pixels.put_pixel(x, y, pixel);
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    /// Make the surface fully transparent.
    pub fn clear(&mut self) {
        self.fill(Rgba([0, 0, 0, 0]));
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        self.pixels.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let surface = Surface::new(8, 8);
        assert!(surface.is_blank());
        assert_eq!(*surface.get_pixel(3, 3), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut surface = Surface::new(4, 4);
        surface.put_pixel(10, 10, Rgba([255, 0, 0, 255])); // dropped
        assert!(surface.is_blank());
        assert_eq!(*surface.get_pixel(10, 10), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_degenerate_dimensions_clamp() {
        let surface = Surface::new(0, 100);
        assert_eq!((surface.width(), surface.height()), (1, 1));
    }

    #[test]
    fn test_fill_and_clear() {
        let mut surface = Surface::new_filled(4, 4, Rgba([10, 20, 30, 255]));
        assert!(!surface.is_blank());
        assert_eq!(*surface.get_pixel(0, 3), Rgba([10, 20, 30, 255]));
        surface.clear();
        assert!(surface.is_blank());
    }
}
