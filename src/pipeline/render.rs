//! PDF rasterisation: render one page to a `DynamicImage` via pdfium.
//!
//! Rendering sits behind [`PageRasterizer`] so the batch can be driven
//! with a different backend (or a fake in tests). The pdfium
//! implementation is synchronous; callers run it inside
//! `tokio::task::spawn_blocking`.
//!
//! Scaling is relative to the page's native size rather than a DPI or a
//! pixel cap: receipts are small and a 2× render keeps fine print legible
//! for the model.

use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Renders a single page of an in-memory PDF.
pub trait PageRasterizer: Send + Sync {
    /// Render page `page_index` (0-based) at `scale` × the native page size.
    ///
    /// The error string carries the backend's diagnostic; the caller wraps it
    /// with the file path.
    fn render_page(&self, pdf: &[u8], page_index: u16, scale: f32)
        -> Result<DynamicImage, String>;
}

/// [`PageRasterizer`] backed by the pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    lib_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// `lib_dir` is the directory holding libpdfium. When `None`, the
    /// working directory is tried first, then the system library path.
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match &self.lib_dir {
            Some(dir) => {
                let dir = dir.to_string_lossy().into_owned();
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    dir.as_str(),
                ))
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| {
            format!(
                "pdfium library unavailable ({:?}); set PDFIUM_LIB_PATH to the directory containing libpdfium",
                e
            )
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_page(
        &self,
        pdf: &[u8],
        page_index: u16,
        scale: f32,
    ) -> Result<DynamicImage, String> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| format!("cannot open PDF: {:?}", e))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        if page_index as usize >= total {
            return Err(format!(
                "page {} out of range (document has {} pages)",
                page_index + 1,
                total
            ));
        }

        let page = pages
            .get(page_index)
            .map_err(|e| format!("cannot load page {}: {:?}", page_index + 1, e))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("cannot render page {}: {:?}", page_index + 1, e))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {}/{} at {}x → {}x{} px",
            page_index + 1,
            total,
            scale,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_an_error_not_a_panic() {
        let r = PdfiumRasterizer::new(Some(PathBuf::from("/definitely/not/a/pdfium/dir")));
        let err = r.render_page(b"%PDF-1.4", 0, 2.0).unwrap_err();
        assert!(err.contains("pdfium library unavailable"), "got: {err}");
    }
}
