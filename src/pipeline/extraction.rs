//! Text extraction engine
//!
//! ## Strategy
//! 1. Native extraction for PDF, DOCX and plain text (fast, pure Rust)
//! 2. OCR over rendered pages/images when native text is missing, too short
//!    or the type has no native extractor, if the caller allows it
//!
//! Every call ends in exactly one outcome: complete text with its source, or
//! an [`ExtractionError`]. Empty text is never a success.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::document_parser::{DocumentParser, NativeOutcome, NativeParser};
use super::ocr::OcrBackend;
use super::progress::{ProgressCallback, ProgressSink};
use super::types::{ExtractionSource, SourceFile, UnifiedExtractionResult};
use crate::error::{ExtractionError, OcrError};

/// Per-call extraction options
#[derive(Clone, Default)]
pub struct ExtractionOptions {
    pub fallback_to_ocr: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl ExtractionOptions {
    pub fn with_ocr() -> Self {
        Self {
            fallback_to_ocr: true,
            on_progress: None,
        }
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }
}

/// Native-first extraction with an optional OCR fallback
pub struct TextExtractionEngine {
    parser: Arc<dyn NativeParser>,
    ocr: Option<Arc<dyn OcrBackend>>,
}

impl TextExtractionEngine {
    pub fn new(parser: Arc<dyn NativeParser>, ocr: Option<Arc<dyn OcrBackend>>) -> Self {
        Self { parser, ocr }
    }

    /// Engine with the built-in parsers and no OCR backend
    pub fn native_only() -> Self {
        Self::new(Arc::new(DocumentParser::new()), None)
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrBackend>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub async fn extract(
        &self,
        file: &SourceFile,
        options: ExtractionOptions,
        cancel: &CancellationToken,
    ) -> Result<UnifiedExtractionResult, ExtractionError> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled {
                name: file.name.clone(),
            });
        }

        let sink = ProgressSink::new(options.on_progress);

        let parser = Arc::clone(&self.parser);
        let owned = file.clone();
        let outcome = tokio::task::spawn_blocking(move || parser.parse(&owned))
            .await
            .unwrap_or_else(|e| NativeOutcome::Failed(format!("Task failed: {}", e)));

        let reason = match outcome {
            NativeOutcome::Extracted(doc) => {
                tracing::info!(
                    "[TextExtraction] Native text for {}: {} chars, {} words",
                    file.name,
                    doc.text.len(),
                    doc.word_count
                );
                sink.complete();
                return Ok(UnifiedExtractionResult {
                    text: doc.text,
                    progress: 100,
                    source: ExtractionSource::Native,
                });
            }
            NativeOutcome::Insufficient { chars } => {
                format!("native text too short ({} chars)", chars)
            }
            NativeOutcome::Failed(e) => e,
            NativeOutcome::NoExtractor => "no native extractor".to_string(),
        };

        if !options.fallback_to_ocr {
            tracing::warn!(
                "[TextExtraction] {} has no usable native text ({}) and OCR is disabled",
                file.name,
                reason
            );
            return Err(ExtractionError::OcrDisabled {
                name: file.name.clone(),
            });
        }

        let ocr = match &self.ocr {
            Some(ocr) if ocr.supports(file) => ocr,
            _ => {
                return Err(ExtractionError::Unsupported {
                    name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                })
            }
        };

        tracing::info!(
            "[TextExtraction] Falling back to OCR for {} ({})",
            file.name,
            reason
        );

        let text = match ocr.recognize(file, &sink, cancel).await {
            Ok(text) => DocumentParser::truncate_text(&DocumentParser::clean_text(&text)),
            Err(OcrError::Cancelled) => {
                return Err(ExtractionError::Cancelled {
                    name: file.name.clone(),
                })
            }
            Err(e) => {
                tracing::error!("[TextExtraction] OCR FAILED for {}: {}", file.name, e);
                return Err(ExtractionError::Ocr {
                    name: file.name.clone(),
                    reason: e.to_string(),
                });
            }
        };

        if text.is_empty() {
            return Err(ExtractionError::NoText {
                name: file.name.clone(),
            });
        }

        sink.complete();
        tracing::info!(
            "[TextExtraction] OCR text for {}: {} chars",
            file.name,
            text.len()
        );

        Ok(UnifiedExtractionResult {
            text,
            progress: 100,
            source: ExtractionSource::Ocr,
        })
    }
}
