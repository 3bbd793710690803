//! Clause extraction and risk assessment services
//!
//! The orchestrator only sees the [`ClauseExtractor`] and [`RiskAssessor`]
//! traits. [`HttpAnalysisService`] implements both against two JSON endpoints
//! that take either the document text or the base64-encoded file.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::encoder::EncodedPayload;
use super::http_client::analysis_client;
use super::types::{Clause, Risk};
use super::utils::parse_list_response;
use crate::config::PipelineConfig;
use crate::error::AnalysisCallError;

/// The single representation of a file sent for analysis
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AnalysisContent {
    /// Edited or extracted text
    Text { text: String },
    /// Raw file, base64-encoded
    File(EncodedPayload),
}

impl AnalysisContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::File(_) => "file",
        }
    }
}

/// Extracts notable clauses from a document
#[async_trait]
pub trait ClauseExtractor: Send + Sync {
    async fn extract_clauses(&self, content: &AnalysisContent) -> Result<Vec<Clause>, AnalysisCallError>;
}

/// Assesses risks in a document
#[async_trait]
pub trait RiskAssessor: Send + Sync {
    async fn assess_risks(&self, content: &AnalysisContent) -> Result<Vec<Risk>, AnalysisCallError>;
}

/// HTTP client for the clause and risk endpoints
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    clause_url: Option<String>,
    risk_url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpAnalysisService {
    pub fn new(clause_url: Option<String>, risk_url: Option<String>, timeout: Duration) -> Self {
        Self {
            clause_url,
            risk_url,
            api_key: None,
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.clause_service_url.clone(),
            config.risk_service_url.clone(),
            config.request_timeout,
        )
        .with_api_key(config.analysis_api_key.clone())
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    async fn post(&self, url: &str, content: &AnalysisContent) -> Result<String, AnalysisCallError> {
        let mut request = analysis_client()
            .post(url)
            .timeout(self.timeout)
            .json(content);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AnalysisCallError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl ClauseExtractor for HttpAnalysisService {
    async fn extract_clauses(&self, content: &AnalysisContent) -> Result<Vec<Clause>, AnalysisCallError> {
        let url = self
            .clause_url
            .as_deref()
            .ok_or(AnalysisCallError::NotConfigured("clause service URL"))?;

        tracing::debug!("[AnalysisService] Extracting clauses from {} content", content.kind());
        let body = self.post(url, content).await?;
        parse_list_response(&body, "clauses").map_err(AnalysisCallError::Malformed)
    }
}

#[async_trait]
impl RiskAssessor for HttpAnalysisService {
    async fn assess_risks(&self, content: &AnalysisContent) -> Result<Vec<Risk>, AnalysisCallError> {
        let url = self
            .risk_url
            .as_deref()
            .ok_or(AnalysisCallError::NotConfigured("risk service URL"))?;

        tracing::debug!("[AnalysisService] Assessing risks of {} content", content.kind());
        let body = self.post(url, content).await?;
        parse_list_response(&body, "risks").map_err(AnalysisCallError::Malformed)
    }
}
