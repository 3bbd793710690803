//! PDF Rendering Module
//!
//! Converts PDF pages to JPEG images for the OCR pass over scanned documents.
//! Rendering needs the `pdfium` feature and a pdfium library on the system:
//! On macOS: brew install pdfium
//! On Linux: apt install libpdfium-dev
//! Without it, scanned PDFs cannot be rendered and their OCR pass fails.

use crate::error::OcrError;

/// Target DPI for PDF rendering (150 = good balance of quality and size)
#[cfg_attr(not(feature = "pdfium"), allow(dead_code))]
const RENDER_DPI: f32 = 150.0;

/// Maximum page dimension in pixels
#[cfg_attr(not(feature = "pdfium"), allow(dead_code))]
const MAX_PAGE_DIMENSION: u32 = 1600;

/// PDF page renderer
#[derive(Debug, Clone, Copy)]
pub struct PdfRenderer {
    pdfium_available: bool,
}

impl PdfRenderer {
    /// Create a new PDF renderer, detecting available backends
    pub fn new() -> Self {
        let pdfium_available = Self::check_pdfium_available();

        if pdfium_available {
            tracing::info!("[PdfRenderer] Using pdfium backend");
        } else {
            tracing::warn!("[PdfRenderer] pdfium not available, scanned PDFs cannot be rendered");
        }

        Self { pdfium_available }
    }

    fn check_pdfium_available() -> bool {
        #[cfg(feature = "pdfium")]
        {
            pdfium_render::prelude::Pdfium::bind_to_system_library().is_ok()
        }
        #[cfg(not(feature = "pdfium"))]
        {
            false
        }
    }

    /// Render every page of a PDF to JPEG
    pub async fn render_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<Vec<u8>>, OcrError> {
        if !self.pdfium_available {
            return Err(OcrError::Render(
                "pdfium is not available for rendering PDF pages".to_string(),
            ));
        }

        let bytes = pdf_bytes.to_vec();

        // Run in blocking task since PDF rendering is CPU-intensive
        tokio::task::spawn_blocking(move || Self::render_pages_blocking(&bytes))
            .await
            .map_err(|e| OcrError::Render(format!("Task failed: {}", e)))?
    }

    #[cfg(feature = "pdfium")]
    fn render_pages_blocking(bytes: &[u8]) -> Result<Vec<Vec<u8>>, OcrError> {
        use image::ImageFormat;
        use pdfium_render::prelude::*;
        use std::io::Cursor;

        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| OcrError::Render(format!("Failed to initialize pdfium: {}", e)))?;
        let pdfium = Pdfium::new(bindings);

        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| OcrError::Render(format!("Failed to load PDF: {}", e)))?;

        let mut rendered = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let page_width = page.width().value;
            let page_height = page.height().value;
            let scale = (MAX_PAGE_DIMENSION as f32 / page_width.max(page_height))
                .min(RENDER_DPI / 72.0);

            let config = PdfRenderConfig::new()
                .set_target_width((page_width * scale) as i32)
                .set_target_height((page_height * scale) as i32)
                .render_form_data(true)
                .render_annotations(true);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| OcrError::Render(format!("Failed to render page {}: {}", index, e)))?;

            let image = image::DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
            let mut buffer = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
                .map_err(|e| OcrError::Render(format!("Failed to encode page {}: {}", index, e)))?;

            rendered.push(buffer);
        }

        if rendered.is_empty() {
            return Err(OcrError::Render("PDF has no pages".to_string()));
        }

        tracing::debug!("[PdfRenderer] Rendered {} pages", rendered.len());
        Ok(rendered)
    }

    #[cfg(not(feature = "pdfium"))]
    fn render_pages_blocking(_bytes: &[u8]) -> Result<Vec<Vec<u8>>, OcrError> {
        Err(OcrError::Render(
            "built without the pdfium feature".to_string(),
        ))
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_creation() {
        // Creating a renderer should not panic
        let _renderer = PdfRenderer::new();
    }

    #[cfg(not(feature = "pdfium"))]
    #[tokio::test]
    async fn test_render_without_pdfium_fails() {
        let renderer = PdfRenderer::new();
        let result = renderer.render_pages(b"%PDF-1.4").await;
        assert!(matches!(result, Err(OcrError::Render(_))));
    }
}
