//! # Still-Image Decoding
//!
//! One-shot QR decoding for uploaded photos of a label.
//!
//! ```text
//! bytes ──► image (PNG/JPEG) ──► luma ──► rqrr grids ──► first decodable text
//! ```
//!
//! CPU-bound: callers on the async runtime run it under `spawn_blocking`.

use rqrr::PreparedImage;
use tracing::debug;

use crate::error::{ScanError, ScanResult};

/// Decodes the first readable QR symbol in an encoded image.
///
/// ## Errors
/// * [`ScanError::InvalidImage`] - bytes are not a PNG or JPEG
/// * [`ScanError::SymbolNotFound`] - no grid decodes
pub fn decode_image(bytes: &[u8]) -> ScanResult<String> {
    let luma = image::load_from_memory(bytes)
        .map_err(|e| ScanError::InvalidImage(e.to_string()))?
        .to_luma8();

    let (width, height) = luma.dimensions();
    debug!(width, height, "Decoding still image");

    let mut prepared =
        PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            luma.get_pixel(x as u32, y as u32).0[0]
        });

    let grids = prepared.detect_grids();
    debug!(candidates = grids.len(), "QR grids detected");

    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => return Ok(content),
            Err(e) => debug!(error = %e, "Grid failed to decode"),
        }
    }

    Err(ScanError::SymbolNotFound)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use qrcode::{Color, QrCode};
    use std::io::Cursor;

    /// Renders `payload` as a PNG QR symbol with a four-module quiet zone.
    pub(crate) fn qr_png(payload: &str) -> Vec<u8> {
        const SCALE: u32 = 8;
        const QUIET: u32 = 4;

        let code = QrCode::new(payload.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + 2 * QUIET) * SCALE;

        let img = GrayImage::from_fn(side, side, |x, y| {
            let (mx, my) = (x / SCALE, y / SCALE);
            let inside = (QUIET..QUIET + modules).contains(&mx)
                && (QUIET..QUIET + modules).contains(&my);
            if inside {
                let idx = ((my - QUIET) * modules + (mx - QUIET)) as usize;
                if colors[idx] == Color::Dark {
                    return Luma([0u8]);
                }
            }
            Luma([255u8])
        });

        png(img)
    }

    pub(crate) fn blank_png() -> Vec<u8> {
        png(GrayImage::from_pixel(64, 64, Luma([255u8])))
    }

    fn png(img: GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_decodes_generated_label() {
        let payload = "AGRI-v1|F001|Jane Doe|Maize,Rice";
        assert_eq!(decode_image(&qr_png(payload)).unwrap(), payload);
    }

    #[test]
    fn test_blank_image_has_no_symbol() {
        assert_eq!(decode_image(&blank_png()), Err(ScanError::SymbolNotFound));
    }

    #[test]
    fn test_garbage_bytes_are_invalid_image() {
        assert!(matches!(
            decode_image(b"definitely not a png"),
            Err(ScanError::InvalidImage(_))
        ));
    }
}
