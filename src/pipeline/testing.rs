//! Mock analysis and OCR backends for tests.
//!
//! Deterministic stand-ins for the remote services so orchestration and
//! end-to-end tests run without network access.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

use super::ocr::OcrBackend;
use super::progress::ProgressSink;
use super::services::{AnalysisContent, ClauseExtractor, RiskAssessor};
use super::types::{Clause, Risk, Severity, SourceFile};
use crate::error::{AnalysisCallError, OcrError};

/// Key used to match a request: the text itself, or the encoded file's name
pub fn content_key(content: &AnalysisContent) -> String {
    match content {
        AnalysisContent::Text { text } => text.clone(),
        AnalysisContent::File(payload) => payload.file_name.clone(),
    }
}

/// Record of a call made to the mock service
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Clauses(AnalysisContent),
    Risks(AnalysisContent),
}

/// Mock clause extractor and risk assessor.
#[derive(Default)]
pub struct MockAnalysisService {
    clauses: Vec<Clause>,
    risks: Vec<Risk>,
    failing_clauses: HashSet<String>,
    failing_risks: HashSet<String>,
    hang_clauses: bool,
    rendezvous: Option<Barrier>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockAnalysisService {
    pub fn new() -> Self {
        Self {
            clauses: vec![sample_clause()],
            risks: vec![sample_risk()],
            ..Default::default()
        }
    }

    /// Fail the clause call for content matching `key`
    pub fn fail_clauses_for(mut self, key: impl Into<String>) -> Self {
        self.failing_clauses.insert(key.into());
        self
    }

    /// Fail the risk call for content matching `key`
    pub fn fail_risks_for(mut self, key: impl Into<String>) -> Self {
        self.failing_risks.insert(key.into());
        self
    }

    /// Clause calls never complete
    pub fn hang_clauses(mut self) -> Self {
        self.hang_clauses = true;
        self
    }

    /// Both calls must be in flight at once before either returns
    pub fn require_concurrent_calls(mut self) -> Self {
        self.rendezvous = Some(Barrier::new(2));
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn meet(&self) {
        if let Some(ref barrier) = self.rendezvous {
            barrier.wait().await;
        }
    }
}

#[async_trait]
impl ClauseExtractor for MockAnalysisService {
    async fn extract_clauses(&self, content: &AnalysisContent) -> Result<Vec<Clause>, AnalysisCallError> {
        self.calls.lock().unwrap().push(MockCall::Clauses(content.clone()));
        self.meet().await;

        if self.hang_clauses {
            std::future::pending::<()>().await;
        }
        if self.failing_clauses.contains(&content_key(content)) {
            return Err(AnalysisCallError::Status {
                status: 500,
                body: "mock clause failure".to_string(),
            });
        }
        Ok(self.clauses.clone())
    }
}

#[async_trait]
impl RiskAssessor for MockAnalysisService {
    async fn assess_risks(&self, content: &AnalysisContent) -> Result<Vec<Risk>, AnalysisCallError> {
        self.calls.lock().unwrap().push(MockCall::Risks(content.clone()));
        self.meet().await;

        if self.failing_risks.contains(&content_key(content)) {
            return Err(AnalysisCallError::Malformed("mock risk failure".to_string()));
        }
        Ok(self.risks.clone())
    }
}

/// OCR backend returning canned text per file name, one progress step per page
#[derive(Default)]
pub struct MockOcr {
    pages: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, file_name: impl Into<String>, pages: &[&str]) -> Self {
        self.pages
            .insert(file_name.into(), pages.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrBackend for MockOcr {
    fn supports(&self, _file: &SourceFile) -> bool {
        true
    }

    async fn recognize(
        &self,
        file: &SourceFile,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, OcrError> {
        self.calls.lock().unwrap().push(file.name.clone());
        progress.report(0);

        let pages = self
            .pages
            .get(&file.name)
            .ok_or_else(|| OcrError::Recognition(format!("no canned pages for {}", file.name)))?;

        for (i, _) in pages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(OcrError::Cancelled);
            }
            tokio::task::yield_now().await;
            progress.report_fraction(i + 1, pages.len());
        }
        Ok(pages.join("\n\n"))
    }
}

pub fn sample_clause() -> Clause {
    Clause {
        title: "Automatic renewal".to_string(),
        snippet: "This agreement renews for successive one-year terms".to_string(),
        reason: "Renews without an explicit opt-in".to_string(),
    }
}

pub fn sample_risk() -> Risk {
    Risk {
        risk: "Uncapped liability".to_string(),
        severity: Severity::High,
        explanation: "No limitation of liability clause".to_string(),
        recommended_action: "Negotiate a liability cap".to_string(),
    }
}
