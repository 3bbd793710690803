//! OCR fallback
//!
//! Turns a file into page images (the image itself, or rendered PDF pages) and
//! runs each page through a [`PageRecognizer`], reporting progress as pages
//! complete.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::pdf_renderer::PdfRenderer;
use super::progress::ProgressSink;
use super::types::SourceFile;
use super::validator::{normalize_mime, MIME_PDF};
use super::vision::{is_image_type, prepare_image_for_vision};
use crate::error::OcrError;

/// OCR/rendering backend: raw file + progress sink in, recognized text out
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Whether this backend can produce pages for the file at all
    fn supports(&self, file: &SourceFile) -> bool;

    async fn recognize(
        &self,
        file: &SourceFile,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, OcrError>;
}

/// Recognizes the text on one prepared JPEG page
#[async_trait]
pub trait PageRecognizer: Send + Sync {
    async fn recognize_page(
        &self,
        image_jpeg: &[u8],
        page_number: usize,
        file_name: &str,
    ) -> Result<String, OcrError>;
}

/// Page-by-page OCR over a vision model
pub struct VisionOcr {
    renderer: PdfRenderer,
    recognizer: Arc<dyn PageRecognizer>,
}

impl VisionOcr {
    pub fn new(recognizer: Arc<dyn PageRecognizer>) -> Self {
        Self::with_renderer(PdfRenderer::new(), recognizer)
    }

    pub fn with_renderer(renderer: PdfRenderer, recognizer: Arc<dyn PageRecognizer>) -> Self {
        Self {
            renderer,
            recognizer,
        }
    }

    async fn pages(&self, file: &SourceFile) -> Result<Vec<Vec<u8>>, OcrError> {
        if is_image_type(&file.mime_type) {
            let bytes = Arc::clone(&file.bytes);
            let page = tokio::task::spawn_blocking(move || prepare_image_for_vision(&bytes))
                .await
                .map_err(|e| OcrError::Image(format!("Task failed: {}", e)))??;
            return Ok(vec![page]);
        }

        if normalize_mime(&file.mime_type) == MIME_PDF {
            return self.renderer.render_pages(&file.bytes).await;
        }

        Err(OcrError::Render(format!(
            "cannot produce page images for {}",
            file.mime_type
        )))
    }
}

#[async_trait]
impl OcrBackend for VisionOcr {
    fn supports(&self, file: &SourceFile) -> bool {
        is_image_type(&file.mime_type) || normalize_mime(&file.mime_type) == MIME_PDF
    }

    async fn recognize(
        &self,
        file: &SourceFile,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, OcrError> {
        progress.report(0);

        let pages = self.pages(file).await?;
        let total = pages.len();
        let mut texts = Vec::with_capacity(total);

        tracing::info!("[VisionOcr] Recognizing {} page(s) of {}", total, file.name);

        for (index, page) in pages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(OcrError::Cancelled);
            }

            let text = tokio::select! {
                _ = cancel.cancelled() => return Err(OcrError::Cancelled),
                result = self.recognizer.recognize_page(page, index + 1, &file.name) => result?,
            };

            let text = text.trim();
            if !text.is_empty() {
                texts.push(text.to_string());
            }

            progress.report_fraction(index + 1, total);
            tracing::debug!(
                "[VisionOcr] {} page {}/{}: {} chars",
                file.name,
                index + 1,
                total,
                text.len()
            );
        }

        Ok(texts.join("\n\n"))
    }
}
