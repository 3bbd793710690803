//! Pipeline configuration
//!
//! Defaults mirror a local development setup. `from_env` loads a `.env` file
//! first (current directory, then parent) and lets environment variables
//! override every field.

use std::time::Duration;

use crate::error::ConfigError;

/// OCR vision endpoint settings
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// API key for the vision endpoint
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API (default: https://api.openai.com)
    pub base_url: String,

    /// Vision-capable model
    pub model: String,

    /// Rate limit: requests per second
    pub requests_per_second: f32,

    /// Rate limit: max concurrent requests
    pub max_concurrent_requests: usize,

    /// Retries on 429/transport errors
    pub max_retries: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            requests_per_second: 5.0,
            max_concurrent_requests: 4,
            max_retries: 3,
        }
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Endpoint of the clause-extraction service
    pub clause_service_url: Option<String>,

    /// Endpoint of the risk-assessment service
    pub risk_service_url: Option<String>,

    /// Bearer token sent to both analysis services
    pub analysis_api_key: Option<String>,

    /// Per-request timeout for analysis and OCR calls
    pub request_timeout: Duration,

    /// Run OCR when native extraction yields nothing
    pub fallback_to_ocr: bool,

    pub ocr: OcrConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clause_service_url: None,
            risk_service_url: None,
            analysis_api_key: None,
            request_timeout: Duration::from_secs(90),
            fallback_to_ocr: true,
            ocr: OcrConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load `.env` and read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_path("../.env");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.clause_service_url = get("CLAUSE_SERVICE_URL");
        config.risk_service_url = get("RISK_SERVICE_URL");
        config.analysis_api_key = get("ANALYSIS_API_KEY");

        if let Some(value) = get("REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse(&value, "REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = get("OCR_ENABLED") {
            config.fallback_to_ocr = parse_bool(&value, "OCR_ENABLED")?;
        }

        config.ocr.api_key = get("OCR_API_KEY").or_else(|| get("OPENAI_API_KEY"));
        if let Some(url) = get("OCR_BASE_URL") {
            config.ocr.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("OCR_MODEL") {
            config.ocr.model = model;
        }
        if let Some(value) = get("OCR_REQUESTS_PER_SECOND") {
            let rps: f32 = parse(&value, "OCR_REQUESTS_PER_SECOND")?;
            if !(rps > 0.0 && rps.is_finite()) {
                return Err(ConfigError::Invalid {
                    key: "OCR_REQUESTS_PER_SECOND",
                    value,
                });
            }
            config.ocr.requests_per_second = rps;
        }
        if let Some(value) = get("OCR_MAX_CONCURRENT") {
            let max: usize = parse(&value, "OCR_MAX_CONCURRENT")?;
            config.ocr.max_concurrent_requests = max.max(1);
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(value: &str, key: &'static str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
