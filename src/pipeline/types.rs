//! Shared types for the ingestion and analysis pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A user-supplied file. Immutable once created; clones share the bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name, also the identity used to key analysis results
    pub name: String,
    /// Raw content
    pub bytes: Arc<[u8]>,
    /// Declared size in bytes
    pub size: u64,
    /// Declared MIME type
    pub mime_type: String,
}

impl SourceFile {
    /// Create a file whose declared size is the length of `bytes`
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            name: name.into(),
            bytes: bytes.into(),
            size,
            mime_type: mime_type.into(),
        }
    }

    /// Override the declared size (uploads report their size separately from the body)
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(Self::new(name, mime_type, bytes))
    }
}

/// Which strategy produced the extracted text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// Structured text read directly from the document
    Native,
    /// Recognized from rendered pages or images
    Ocr,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Ocr => "ocr",
        }
    }
}

/// Outcome of a successful extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnifiedExtractionResult {
    pub text: String,
    /// Always 100 on success
    pub progress: u8,
    pub source: ExtractionSource,
}

/// A flagged contractual provision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clause {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub reason: String,
}

/// Risk severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "low" | "minor" => Ok(Self::Low),
            "medium" | "moderate" => Ok(Self::Medium),
            "high" | "critical" | "severe" => Ok(Self::High),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flagged concern with a recommended remediation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub risk: String,
    pub severity: Severity,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub recommended_action: String,
}

/// Which half of an [`AnalysisResult`] is a fallback value
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Degraded {
    pub clauses: bool,
    pub risks: bool,
}

impl Degraded {
    pub fn any(&self) -> bool {
        self.clauses || self.risks
    }
}

/// Merged clause and risk analysis for one file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub clauses: Vec<Clause>,
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub degraded: Degraded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_is_lenient_on_case() {
        let risk: Risk = serde_json::from_str(
            r#"{"risk": "Auto renewal", "severity": "HIGH", "recommendedAction": "Add notice"}"#,
        )
        .unwrap();
        assert_eq!(risk.severity, Severity::High);
        assert_eq!(risk.recommended_action, "Add notice");
        assert!(risk.explanation.is_empty());
    }

    #[test]
    fn test_unknown_severity_is_rejected() {
        let parsed: Result<Risk, _> =
            serde_json::from_str(r#"{"risk": "x", "severity": "catastrophic"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"medium\"");
    }

    #[test]
    fn test_declared_size() {
        let file = SourceFile::new("Contract.PDF", "application/pdf", vec![1, 2, 3]);
        assert_eq!(file.size, 3);
        assert_eq!(file.with_declared_size(42).size, 42);
    }

    #[tokio::test]
    async fn test_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let file = SourceFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(file.size, 5);
    }
}
