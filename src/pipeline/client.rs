//! Vision API Client
//!
//! Sends rendered pages to an OpenAI-compatible chat completions endpoint and
//! returns the transcribed text. Handles:
//! - Rate limiting (concurrency cap + minimum interval)
//! - Retry with backoff on 429 and transport errors

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

use super::http_client::vision_client;
use super::ocr::PageRecognizer;
use super::vision::detect_image_mime;
use crate::config::OcrConfig;
use crate::error::OcrError;

const TRANSCRIBE_PROMPT: &str = "Transcribe all text on this document page exactly as written. \
Preserve reading order and paragraph breaks. Return only the transcribed text, with no \
commentary. If the page has no legible text, return an empty response.";

/// Vision OCR client with rate limiting
pub struct VisionClient {
    config: OcrConfig,
    timeout: Duration,
    rate_limiter: RateLimiter,
}

impl VisionClient {
    pub fn new(config: OcrConfig, timeout: Duration) -> Self {
        let rate_limiter =
            RateLimiter::new(config.max_concurrent_requests, config.requests_per_second);

        Self {
            config,
            timeout,
            rate_limiter,
        }
    }

    fn build_request(&self, image_jpeg: &[u8]) -> VisionChatRequest {
        let base64_image = base64::engine::general_purpose::STANDARD.encode(image_jpeg);
        let data_url = format!("data:{};base64,{}", detect_image_mime(image_jpeg), base64_image);

        VisionChatRequest {
            model: self.config.model.clone(),
            messages: vec![VisionMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: TRANSCRIBE_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrlContent {
                            url: data_url,
                            detail: "high".to_string(),
                        },
                    },
                ],
            }],
            max_tokens: 4000,
            temperature: 0.0,
        }
    }

    /// Send request with retry logic
    async fn send_request(&self, request: &VisionChatRequest) -> Result<VisionChatResponse, OcrError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| OcrError::Recognition("no OCR API key configured".to_string()))?;

        let mut retry_delay = Duration::from_secs(2);
        let max_retries = self.config.max_retries;

        for retry in 0..=max_retries {
            if retry > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let _permit = self.rate_limiter.acquire().await?;

            let resp = vision_client()
                .post(format!("{}/v1/chat/completions", self.config.base_url))
                .bearer_auth(api_key)
                .timeout(self.timeout)
                .json(request)
                .send()
                .await;

            match resp {
                Ok(r) if r.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    tracing::warn!("[VisionClient] Rate limited, retry {}/{}", retry + 1, max_retries);
                    continue;
                }
                Ok(r) if r.status().is_success() => {
                    return r
                        .json()
                        .await
                        .map_err(|e| OcrError::Recognition(format!("Failed to parse response: {}", e)));
                }
                Ok(r) => {
                    let status = r.status();
                    let text = r.text().await.unwrap_or_default();
                    return Err(OcrError::Recognition(format!("API error ({}): {}", status, text)));
                }
                Err(e) => {
                    if retry == max_retries {
                        return Err(OcrError::Recognition(format!(
                            "Request failed after retries: {}",
                            e
                        )));
                    }
                    tracing::warn!("[VisionClient] Request error, retrying: {}", e);
                }
            }
        }

        Err(OcrError::Recognition("Max retries exceeded".to_string()))
    }
}

#[async_trait]
impl PageRecognizer for VisionClient {
    async fn recognize_page(
        &self,
        image_jpeg: &[u8],
        page_number: usize,
        file_name: &str,
    ) -> Result<String, OcrError> {
        tracing::debug!("[VisionClient] Sending page {} of {}", page_number, file_name);

        let request = self.build_request(image_jpeg);
        let response = self.send_request(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OcrError::Recognition("No response from vision model".to_string()))?;

        Ok(strip_code_fence(&content))
    }
}

/// Models sometimes wrap transcriptions in a code fence
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
        return body.trim_end().trim_end_matches("```").trim().to_string();
    }
    trimmed.to_string()
}

/// Rate limiter for API requests
struct RateLimiter {
    semaphore: Semaphore,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(max_concurrent: usize, requests_per_second: f32) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrent.max(1)),
            min_interval: Duration::from_secs_f32(1.0 / requests_per_second.max(0.01)),
            last_request: Mutex::new(None),
        }
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, OcrError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| OcrError::Recognition("rate limiter closed".to_string()))?;

        let wait_time = {
            let mut last = self.last_request.lock().await;
            let now = Instant::now();
            let wait = last
                .map(|t| self.min_interval.saturating_sub(now.saturating_duration_since(t)))
                .unwrap_or(Duration::ZERO);
            *last = Some(now + wait);
            wait
        };

        if !wait_time.is_zero() {
            tokio::time::sleep(wait_time).await;
        }

        Ok(permit)
    }
}

// API request/response types

#[derive(Serialize)]
struct VisionChatRequest {
    model: String,
    messages: Vec<VisionMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct VisionMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrlContent },
}

#[derive(Serialize)]
struct ImageUrlContent {
    url: String,
    detail: String,
}

#[derive(Deserialize)]
struct VisionChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
