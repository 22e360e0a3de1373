//! Payload encoding: raw bytes or rendered pages → base64 [`Payload`].
//!
//! Rendered PDF pages are sent as JPEG rather than PNG: a receipt rendered
//! at 2× is mostly white paper, and JPEG at quality 80 keeps the request
//! small while text stays readable for the model.

use crate::pipeline::input::MediaType;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// An inline attachment ready for the inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Standard base64, no `data:` prefix.
    pub data: String,
    /// Never [`MediaType::Pdf`]; PDFs are rasterised first.
    pub media_type: MediaType,
}

impl Payload {
    pub fn mime_type(&self) -> &'static str {
        self.media_type.mime()
    }
}

/// Wrap already-rasterisable image bytes unchanged.
pub fn encode_bytes(bytes: &[u8], media_type: MediaType) -> Payload {
    debug_assert!(!media_type.is_pdf(), "PDFs must be rasterised first");
    let data = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), data.len());
    Payload { data, media_type }
}

/// Encode a rendered page as a base64 JPEG.
///
/// JPEG has no alpha channel, so the page is flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Payload, image::ImageError> {
    let mut buf = Vec::new();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;

    let data = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} page as JPEG q{} → {} bytes base64",
        img.width(),
        img.height(),
        quality,
        data.len()
    );
    Ok(Payload {
        data,
        media_type: MediaType::Jpeg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_rgba_page_as_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 128])));
        let payload = encode_jpeg(&img, 80).expect("encode should succeed");
        assert_eq!(payload.mime_type(), "image/jpeg");

        let decoded = STANDARD.decode(&payload.data).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        }));
        let hi = encode_jpeg(&img, 95).unwrap();
        let lo = encode_jpeg(&img, 10).unwrap();
        assert!(lo.data.len() <= hi.data.len());
    }

    #[test]
    fn bytes_pass_through_with_their_mime() {
        let payload = encode_bytes(b"\x89PNG\r\n\x1a\n", MediaType::Png);
        assert_eq!(payload.mime_type(), "image/png");
        assert_eq!(STANDARD.decode(&payload.data).unwrap(), b"\x89PNG\r\n\x1a\n");
    }
}
