//! Snapshot codec: drawing surfaces travel through the key/value store as
//! self-describing `data:image/png;base64,` payloads, the same format used
//! for archive entries and file export.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage, imageops};
use std::path::Path;

use crate::error::{PadError, Result};
use crate::surface::Surface;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a surface as a PNG data URL.
pub fn encode_surface(surface: &Surface) -> Result<String> {
    let mut png = Vec::new();
    let encoder = PngEncoder::new(&mut png);
    encoder.write_image(surface.as_raw(), surface.width(), surface.height(), ColorType::Rgba8)?;
    Ok(format!("{}{}", DATA_URL_PREFIX, BASE64.encode(&png)))
}

/// Decode a data-URL payload back into a surface.
///
/// Decoding is all-or-nothing: any failure returns Err with no partially
/// written raster, so the caller's previous surface state stays intact.
pub fn decode_payload(payload: &str) -> Result<Surface> {
    let (header, body) = payload
        .split_once(',')
        .ok_or_else(|| PadError::Snapshot("payload is not a data URL".to_string()))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(PadError::Snapshot(format!("unsupported payload header: {}", header)));
    }

    let bytes = BASE64
        .decode(body)
        .map_err(|e| PadError::Snapshot(format!("invalid base64 payload: {}", e)))?;
    let decoded = image::load_from_memory(&bytes)?;
    Ok(Surface::from_rgba_image(decoded.to_rgba8()))
}

/// Decode a payload and scale it to the given raster size. Nearest-neighbour
/// resampling keeps the hard pixel edges.
pub fn decode_payload_scaled(payload: &str, width: u32, height: u32) -> Result<Surface> {
    let decoded = decode_payload(payload)?;
    if decoded.width() == width && decoded.height() == height {
        return Ok(decoded);
    }
    let scaled: RgbaImage =
        imageops::resize(&decoded.to_rgba_image(), width, height, imageops::FilterType::Nearest);
    Ok(Surface::from_rgba_image(scaled))
}

/// Write a surface to a PNG file (archive download / CLI export).
pub fn export_png(surface: &Surface, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let image = surface.to_rgba_image();
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_decode_round_trip() {
        let mut surface = Surface::new(8, 6);
        surface.put_pixel(3, 2, Rgba([200, 10, 60, 255]));
        surface.put_pixel(7, 5, Rgba([0, 0, 0, 128]));

        let payload = encode_surface(&surface).unwrap();
        assert!(payload.starts_with("data:image/png;base64,"));

        let decoded = decode_payload(&payload).unwrap();
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 6);
        assert_eq!(decoded.as_raw(), surface.as_raw());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_payload("not a data url").is_err());
        assert!(decode_payload("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_payload("data:image/png;base64,!!!not-base64!!!").is_err());
        // Valid base64, invalid PNG
        assert!(decode_payload("data:image/png;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_decode_scaled_changes_dimensions() {
        let surface = Surface::new_filled(4, 4, Rgba([9, 9, 9, 255]));
        let payload = encode_surface(&surface).unwrap();
        let scaled = decode_payload_scaled(&payload, 8, 8).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (8, 8));
        assert_eq!(*scaled.get_pixel(7, 7), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn test_export_png_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("drawing.png");
        let surface = Surface::new_filled(4, 4, Rgba([1, 2, 3, 255]));
        export_png(&surface, &path).unwrap();
        assert!(path.exists());
    }
}
