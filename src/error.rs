//! Error types for the ingestion and analysis pipeline
//!
//! Each stage owns its error enum. Only validation and extraction errors ever
//! reach a caller; analysis call failures are absorbed into fallback values and
//! orchestration failures are recorded on the file instead of propagated.

use thiserror::Error;

use crate::pipeline::record::FileStatus;

/// Why a file was refused before entering the pipeline
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{name} is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("{name} has unsupported type '{mime_type}'")]
    UnsupportedType { name: String, mime_type: String },
}

impl ValidationError {
    /// File name the rejection refers to
    pub fn file_name(&self) -> &str {
        match self {
            Self::TooLarge { name, .. } | Self::UnsupportedType { name, .. } => name,
        }
    }
}

/// Terminal failure of a text extraction attempt
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no text extractor available for {name} ({mime_type})")]
    Unsupported { name: String, mime_type: String },

    #[error("no usable text found in {name} and OCR fallback is disabled")]
    OcrDisabled { name: String },

    #[error("OCR failed for {name}: {reason}")]
    Ocr { name: String, reason: String },

    #[error("OCR produced no text for {name}")]
    NoText { name: String },

    #[error("extraction of {name} was cancelled")]
    Cancelled { name: String },
}

impl ExtractionError {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Unsupported { name, .. }
            | Self::OcrDisabled { name }
            | Self::Ocr { name, .. }
            | Self::NoText { name }
            | Self::Cancelled { name } => name,
        }
    }
}

/// Failure inside an OCR backend, wrapped into [`ExtractionError::Ocr`] by the engine
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("image preparation failed: {0}")]
    Image(String),

    #[error("recognition request failed: {0}")]
    Recognition(String),

    #[error("cancelled")]
    Cancelled,
}

/// Failure of one remote analysis call
#[derive(Debug, Error)]
pub enum AnalysisCallError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed service response: {0}")]
    Malformed(String),

    #[error("service not configured: {0}")]
    NotConfigured(&'static str),
}

/// Unexpected failure while analyzing one file, outside the wrapped calls
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("{name} has no content to analyze")]
    EmptyContent { name: String },

    #[error("analysis of {name} was cancelled")]
    Cancelled { name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Illegal state machine transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {action} while {from}")]
pub struct TransitionError {
    pub from: FileStatus,
    pub action: &'static str,
}

/// Failure talking to the batch store actor
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no record at index {0}")]
    NotFound(usize),

    #[error("batch store has shut down")]
    Closed,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Invalid configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Top-level error for the command line runner
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to export results: {0}")]
    Export(#[from] serde_json::Error),

    #[error("no files to analyze")]
    NothingToDo,
}
