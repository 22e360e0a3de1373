//! File normalisation: any accepted file → base64 image [`Payload`].
//!
//! Images are passed through byte-for-byte. PDFs are rasterised: only the
//! first page is rendered, so a document whose totals appear on a later
//! page will not be read correctly. That is a known limitation.

use crate::error::NormalizeError;
use crate::pipeline::encode::{encode_bytes, encode_jpeg, Payload};
use crate::pipeline::input::SourceFile;
use crate::pipeline::render::PageRasterizer;
use std::sync::Arc;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Readers accept the header anywhere in the first KiB.
const PDF_HEADER_WINDOW: usize = 1024;

/// Turns [`SourceFile`]s into inference payloads.
#[derive(Clone)]
pub struct Normalizer {
    rasterizer: Arc<dyn PageRasterizer>,
    scale: f32,
    jpeg_quality: u8,
}

impl Normalizer {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, scale: f32, jpeg_quality: u8) -> Self {
        Self {
            rasterizer,
            scale,
            jpeg_quality,
        }
    }

    pub async fn normalize(&self, file: &SourceFile) -> Result<Payload, NormalizeError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|source| NormalizeError::Read {
                path: file.path.clone(),
                source,
            })?;

        if !file.media_type.is_pdf() {
            return Ok(encode_bytes(&bytes, file.media_type));
        }

        if !has_pdf_header(&bytes) {
            return Err(NormalizeError::PdfConversion {
                path: file.path.clone(),
                detail: "missing %PDF header".to_string(),
            });
        }

        let rasterizer = Arc::clone(&self.rasterizer);
        let scale = self.scale;
        let rendered = tokio::task::spawn_blocking(move || rasterizer.render_page(&bytes, 0, scale))
            .await
            .map_err(|e| NormalizeError::PdfConversion {
                path: file.path.clone(),
                detail: format!("render task panicked: {e}"),
            })?
            .map_err(|detail| NormalizeError::PdfConversion {
                path: file.path.clone(),
                detail,
            })?;

        debug!(
            "{}: first page rendered at {}x{}",
            file.filename,
            rendered.width(),
            rendered.height()
        );
        Ok(encode_jpeg(&rendered, self.jpeg_quality)?)
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(PDF_HEADER_WINDOW)]
        .windows(PDF_MAGIC.len())
        .any(|w| w == PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::MediaType;
    use image::{DynamicImage, RgbImage};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRasterizer {
        calls: Mutex<Vec<(u16, f32)>>,
    }

    impl PageRasterizer for FakeRasterizer {
        fn render_page(&self, _pdf: &[u8], page_index: u16, scale: f32) -> Result<DynamicImage, String> {
            self.calls.lock().unwrap().push((page_index, scale));
            Ok(DynamicImage::ImageRgb8(RgbImage::new(20, 30)))
        }
    }

    struct FailingRasterizer;

    impl PageRasterizer for FailingRasterizer {
        fn render_page(&self, _pdf: &[u8], _page_index: u16, _scale: f32) -> Result<DynamicImage, String> {
            Err("xref table corrupt".into())
        }
    }

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> SourceFile {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        SourceFile::from_path(path).unwrap()
    }

    #[tokio::test]
    async fn pdf_renders_first_page_only_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "invoice.pdf", b"%PDF-1.7 three pages");
        let fake = Arc::new(FakeRasterizer::default());
        let normalizer = Normalizer::new(fake.clone(), 2.0, 80);

        let payload = normalizer.normalize(&file).await.unwrap();
        assert_eq!(payload.media_type, MediaType::Jpeg);
        assert!(!payload.data.is_empty());
        assert_eq!(*fake.calls.lock().unwrap(), [(0u16, 2.0f32)]);
    }

    #[tokio::test]
    async fn image_passes_through_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "receipt.webp", b"RIFF....WEBP");
        let fake = Arc::new(FakeRasterizer::default());
        let normalizer = Normalizer::new(fake.clone(), 2.0, 80);

        let payload = normalizer.normalize(&file).await.unwrap();
        assert_eq!(payload.mime_type(), "image/webp");
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pdf_without_header_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "broken.pdf", b"not a pdf at all");
        let normalizer = Normalizer::new(Arc::new(FakeRasterizer::default()), 2.0, 80);

        let err = normalizer.normalize(&file).await.unwrap_err();
        assert!(matches!(err, NormalizeError::PdfConversion { .. }));
    }

    #[tokio::test]
    async fn leading_bytes_before_header_are_left_to_the_rasterizer() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"\r\n\x00junk from a mail gateway\n".to_vec();
        bytes.extend_from_slice(b"%PDF-1.5 body");
        let file = write(&dir, "scanned.pdf", &bytes);
        let fake = Arc::new(FakeRasterizer::default());
        let normalizer = Normalizer::new(fake.clone(), 2.0, 80);

        normalizer.normalize(&file).await.unwrap();
        assert_eq!(fake.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn header_must_appear_in_first_kib() {
        assert!(has_pdf_header(b"%PDF-1.4"));
        assert!(!has_pdf_header(b"%PD"));
        let mut late = vec![b' '; PDF_HEADER_WINDOW];
        late.extend_from_slice(b"%PDF-1.4");
        assert!(!has_pdf_header(&late));
    }

    #[test]
    fn rasterizer_failure_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "bad.pdf", b"%PDF-1.4 garbage");
        let normalizer = Normalizer::new(Arc::new(FailingRasterizer), 2.0, 80);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt.block_on(normalizer.normalize(&file)).unwrap_err();
        match err {
            NormalizeError::PdfConversion { detail, .. } => assert!(detail.contains("xref")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreadable_file_is_read_error() {
        let file = SourceFile::from_path("/definitely/missing/x.png").unwrap();
        let normalizer = Normalizer::new(Arc::new(FakeRasterizer::default()), 2.0, 80);
        let err = tokio_test::block_on(normalizer.normalize(&file)).unwrap_err();
        assert!(matches!(err, NormalizeError::Read { .. }));
    }
}
