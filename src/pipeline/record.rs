//! Per-file state machine
//!
//! A [`FileRecord`] is never mutated in place by the pipeline: every transition
//! consumes a snapshot and returns the next one, which the batch store then
//! swaps in atomically.
//!
//! ```text
//!  validated ──► extracting ──► ready ──► uploading ──► done
//!      │              │                       │
//!      │              └──────► error ◄────────┘
//!      └──────────────────────────► uploading
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{SourceFile, UnifiedExtractionResult};
use crate::error::TransitionError;

/// Status of a file in the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Accepted, nothing extracted yet
    Validated,
    /// Text extraction in progress
    Extracting,
    /// Extraction finished, waiting for analysis
    Ready,
    /// Analysis calls in flight
    Uploading,
    /// Analysis stored
    Done,
    /// Last attempt failed
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Extracting => "extracting",
            Self::Ready => "ready",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Collapsed view for consumers that only know a single idle state
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Validated | Self::Ready)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative state of one ingested file
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub file: SourceFile,
    pub status: FileStatus,
    pub extracted_text: Option<String>,
    pub edited_text: Option<String>,
    pub extraction_result: Option<UnifiedExtractionResult>,
    pub progress: Option<u8>,
    pub error: Option<String>,
}

impl FileRecord {
    /// Record for a file that passed validation
    pub fn new(file: SourceFile) -> Self {
        Self {
            file,
            status: FileStatus::Validated,
            extracted_text: None,
            edited_text: None,
            extraction_result: None,
            progress: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    fn illegal(&self, action: &'static str) -> TransitionError {
        TransitionError {
            from: self.status,
            action,
        }
    }

    /// validated → extracting. A failed extraction may be restarted by hand.
    pub fn begin_extraction(mut self) -> Result<Self, TransitionError> {
        match self.status {
            FileStatus::Validated => {}
            FileStatus::Error if self.extracted_text.is_none() => {}
            _ => return Err(self.illegal("begin extraction")),
        }

        self.status = FileStatus::Extracting;
        self.progress = Some(0);
        self.error = None;
        Ok(self)
    }

    /// Apply an OCR progress update; never moves backwards
    pub fn record_progress(mut self, percent: u8) -> Result<Self, TransitionError> {
        if self.status != FileStatus::Extracting {
            return Err(self.illegal("record progress"));
        }

        let percent = percent.min(100);
        self.progress = Some(self.progress.map_or(percent, |p| p.max(percent)));
        Ok(self)
    }

    /// extracting → ready
    pub fn finish_extraction(
        mut self,
        result: UnifiedExtractionResult,
    ) -> Result<Self, TransitionError> {
        if self.status != FileStatus::Extracting {
            return Err(self.illegal("finish extraction"));
        }

        if self.extracted_text.is_none() {
            self.extracted_text = Some(result.text.clone());
        }
        self.extraction_result = Some(result);
        self.status = FileStatus::Ready;
        self.progress = Some(100);
        Ok(self)
    }

    /// extracting → error
    pub fn fail_extraction(mut self, reason: impl Into<String>) -> Result<Self, TransitionError> {
        if self.status != FileStatus::Extracting {
            return Err(self.illegal("fail extraction"));
        }

        self.status = FileStatus::Error;
        self.progress = None;
        self.error = Some(reason.into());
        Ok(self)
    }

    /// Enter analysis. Only the orchestrator calls this.
    pub fn begin_upload(mut self) -> Result<Self, TransitionError> {
        if matches!(self.status, FileStatus::Extracting | FileStatus::Uploading) {
            return Err(self.illegal("begin upload"));
        }

        self.status = FileStatus::Uploading;
        self.progress = None;
        self.error = None;
        Ok(self)
    }

    /// uploading → done
    pub fn complete_analysis(mut self) -> Result<Self, TransitionError> {
        if self.status != FileStatus::Uploading {
            return Err(self.illegal("complete analysis"));
        }

        self.status = FileStatus::Done;
        Ok(self)
    }

    /// Analysis could not be stored for this file
    pub fn fail_analysis(mut self, reason: impl Into<String>) -> Result<Self, TransitionError> {
        if self.status == FileStatus::Extracting {
            return Err(self.illegal("fail analysis"));
        }

        self.status = FileStatus::Error;
        self.error = Some(reason.into());
        Ok(self)
    }

    /// User edit of the text to analyze; wins over extracted text
    pub fn set_edited_text(mut self, text: impl Into<String>) -> Self {
        self.edited_text = Some(text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::ExtractionSource;

    fn record() -> FileRecord {
        FileRecord::new(SourceFile::new("a.pdf", "application/pdf", vec![1, 2, 3]))
    }

    fn result(text: &str) -> UnifiedExtractionResult {
        UnifiedExtractionResult {
            text: text.to_string(),
            progress: 100,
            source: ExtractionSource::Ocr,
        }
    }

    #[test]
    fn test_successful_extraction_path() {
        let r = record().begin_extraction().unwrap();
        assert_eq!(r.status, FileStatus::Extracting);
        assert_eq!(r.progress, Some(0));
        assert!(r.extracted_text.is_none());

        let r = r.record_progress(40).unwrap().finish_extraction(result("text")).unwrap();
        assert_eq!(r.status, FileStatus::Ready);
        assert!(r.status.is_idle());
        assert_eq!(r.progress, Some(100));
        assert_eq!(r.extracted_text.as_deref(), Some("text"));
        assert_eq!(r.extraction_result.unwrap().source, ExtractionSource::Ocr);
    }

    #[test]
    fn test_failed_extraction_clears_progress() {
        let r = record()
            .begin_extraction()
            .unwrap()
            .record_progress(60)
            .unwrap()
            .fail_extraction("ocr down")
            .unwrap();

        assert_eq!(r.status, FileStatus::Error);
        assert_eq!(r.progress, None);
        assert!(r.extracted_text.is_none());
        assert_eq!(r.error.as_deref(), Some("ocr down"));
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let r = record().begin_extraction().unwrap();
        let r = r.record_progress(50).unwrap().record_progress(30).unwrap();
        assert_eq!(r.progress, Some(50));
        let r = r.record_progress(250).unwrap();
        assert_eq!(r.progress, Some(100));
    }

    #[test]
    fn test_progress_outside_extraction_is_rejected() {
        let err = record().record_progress(10).unwrap_err();
        assert_eq!(err.from, FileStatus::Validated);
    }

    #[test]
    fn test_extracted_text_is_never_overwritten() {
        let mut r = record()
            .begin_extraction()
            .unwrap()
            .finish_extraction(result("first"))
            .unwrap();

        // Only a failed, text-less record may restart extraction
        assert!(r.clone().begin_extraction().is_err());

        r.status = FileStatus::Extracting;
        let r = r.finish_extraction(result("second")).unwrap();
        assert_eq!(r.extracted_text.as_deref(), Some("first"));
    }

    #[test]
    fn test_upload_transitions() {
        let r = record().begin_upload().unwrap();
        assert_eq!(r.status, FileStatus::Uploading);
        assert!(r.clone().begin_upload().is_err());

        let done = r.clone().complete_analysis().unwrap();
        assert_eq!(done.status, FileStatus::Done);

        let failed = r.fail_analysis("boom").unwrap();
        assert_eq!(failed.status, FileStatus::Error);
    }

    #[test]
    fn test_cannot_upload_while_extracting() {
        let r = record().begin_extraction().unwrap();
        assert!(r.clone().begin_upload().is_err());
        assert!(r.fail_analysis("x").is_err());
    }

    #[test]
    fn test_edited_text_allowed_any_time() {
        let r = record().begin_extraction().unwrap().set_edited_text("mine");
        assert_eq!(r.edited_text.as_deref(), Some("mine"));
        assert_eq!(r.status, FileStatus::Extracting);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&FileStatus::Uploading).unwrap(), "\"uploading\"");
        assert!(!FileStatus::Extracting.is_idle());
    }
}
