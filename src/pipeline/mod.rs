//! Document ingestion and analysis pipeline
//!
//! ## Flow
//! 1. **Ingest**: validate files, accepted ones become `validated` records
//! 2. **Extract**: native text first, OCR fallback, progress streamed to the store
//! 3. **Analyze**: clause + risk calls per file, results keyed by file name
//! 4. **Export**: plain-text or JSON summaries via [`aggregator`]
//!
//! ## Modules
//! - `validator`: MIME allow-list and size ceiling
//! - `encoder`: base64 payloads for binary uploads
//! - `document_parser`: native PDF/DOCX/text extraction
//! - `ocr`, `pdf_renderer`, `vision`, `client`: OCR fallback over a vision model
//! - `extraction`: native-then-OCR engine
//! - `record`: per-file state machine
//! - `store`: actor owning records and results
//! - `services`: clause/risk service contracts and HTTP client
//! - `orchestrator`: sequential batch analysis
//! - `aggregator`: export formatting

pub mod aggregator;
pub mod client;
pub mod document_parser;
pub mod encoder;
pub mod extraction;
pub mod http_client;
pub mod ocr;
pub mod orchestrator;
pub mod pdf_renderer;
pub mod progress;
pub mod record;
pub mod services;
pub mod store;
pub mod types;
pub mod utils;
pub mod validator;
pub mod vision;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use aggregator::{format_batch, format_summary, to_json};
pub use extraction::{ExtractionOptions, TextExtractionEngine};
pub use orchestrator::{resolve_content, AnalysisOrchestrator};
pub use record::{FileRecord, FileStatus};
pub use services::{AnalysisContent, ClauseExtractor, HttpAnalysisService, RiskAssessor};
pub use store::{BatchHandle, RecordEvent};
pub use types::{
    AnalysisResult, Clause, Degraded, ExtractionSource, Risk, Severity, SourceFile,
    UnifiedExtractionResult,
};

use crate::config::PipelineConfig;
use crate::error::{ExtractionError, StoreError, ValidationError};
use client::VisionClient;
use ocr::VisionOcr;
use progress::ProgressCallback;

/// Validator, extraction engine and orchestrator around one batch store.
///
/// Must be created inside a Tokio runtime: it spawns the store actor.
pub struct DocumentPipeline {
    store: BatchHandle,
    engine: Arc<TextExtractionEngine>,
    orchestrator: AnalysisOrchestrator,
    fallback_to_ocr: bool,
}

impl DocumentPipeline {
    pub fn new(engine: TextExtractionEngine, orchestrator: AnalysisOrchestrator, fallback_to_ocr: bool) -> Self {
        Self {
            store: BatchHandle::spawn(),
            engine: Arc::new(engine),
            orchestrator,
            fallback_to_ocr,
        }
    }

    /// Wire the HTTP analysis services and, if enabled, vision OCR
    pub fn from_config(config: &PipelineConfig) -> Self {
        let service = Arc::new(HttpAnalysisService::from_config(config));
        let orchestrator = AnalysisOrchestrator::new(service.clone(), service);

        let mut engine = TextExtractionEngine::native_only();
        if config.fallback_to_ocr {
            if config.ocr.api_key.is_none() {
                tracing::warn!("[Pipeline] OCR enabled but no API key set; OCR requests will fail");
            }
            let client = Arc::new(VisionClient::new(config.ocr.clone(), config.request_timeout));
            engine = engine.with_ocr(Arc::new(VisionOcr::new(client)));
        }

        Self::new(engine, orchestrator, config.fallback_to_ocr)
    }

    pub fn store(&self) -> &BatchHandle {
        &self.store
    }

    /// Validate files and add the accepted ones to the batch.
    /// Returns one error per rejected file; the rest of the batch is unaffected.
    pub async fn ingest(&self, files: Vec<SourceFile>) -> Result<Vec<ValidationError>, StoreError> {
        let (accepted, rejected) = validator::partition(files);

        for file in accepted {
            tracing::debug!("[Pipeline] Accepted {} ({})", file.name, file.mime_type);
            self.store.add(FileRecord::new(file)).await?;
        }

        Ok(rejected)
    }

    /// Extract text for the record at `index`.
    ///
    /// The record moves to `ready` or `error`; the extraction failure, if any,
    /// is also returned. The outer error is reserved for store failures.
    pub async fn extract(
        &self,
        index: usize,
        cancel: &CancellationToken,
    ) -> Result<Result<UnifiedExtractionResult, ExtractionError>, StoreError> {
        let record = self.store.update(index, FileRecord::begin_extraction).await?;

        let handle = self.store.clone();
        let on_progress: ProgressCallback = Arc::new(move |percent| handle.set_progress(index, percent));
        let options = ExtractionOptions {
            fallback_to_ocr: self.fallback_to_ocr,
            on_progress: Some(on_progress),
        };

        match self.engine.extract(&record.file, options, cancel).await {
            Ok(result) => {
                tracing::info!(
                    "[Pipeline] Extracted {} via {} ({} chars)",
                    record.name(),
                    result.source.as_str(),
                    result.text.len()
                );
                let stored = result.clone();
                self.store
                    .update(index, move |r| r.finish_extraction(stored))
                    .await?;
                Ok(Ok(result))
            }
            Err(e) => {
                let reason = e.to_string();
                self.store
                    .update(index, move |r| r.fail_extraction(reason))
                    .await?;
                Ok(Err(e))
            }
        }
    }

    /// Extract every `validated` record, in order. Returns the failures.
    pub async fn extract_all(&self, cancel: &CancellationToken) -> Result<Vec<ExtractionError>, StoreError> {
        let records = self.store.snapshot().await?;
        let mut failures = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if record.status != FileStatus::Validated {
                continue;
            }
            if let Err(e) = self.extract(index, cancel).await? {
                tracing::warn!("[Pipeline] Extraction failed: {}", e);
                failures.push(e);
            }
        }

        Ok(failures)
    }

    /// Replace the text sent for analysis with a user edit
    pub async fn edit_text(&self, index: usize, text: impl Into<String>) -> Result<FileRecord, StoreError> {
        let text = text.into();
        self.store.update(index, move |r| Ok(r.set_edited_text(text))).await
    }

    /// Analyze the whole batch. Never fails; see [`AnalysisOrchestrator::analyze_batch`].
    pub async fn analyze(&self, cancel: &CancellationToken) -> HashMap<String, AnalysisResult> {
        self.orchestrator.analyze_batch(&self.store, cancel).await
    }

    /// Remove a file and its stored result
    pub async fn remove(&self, index: usize) -> Result<FileRecord, StoreError> {
        self.store.remove(index).await
    }

    /// Every stored result, including those from earlier runs
    pub async fn results(&self) -> Result<HashMap<String, AnalysisResult>, StoreError> {
        self.store.results().await
    }
}
