//! Shared HTTP Client Module
//!
//! Global, lazy-initialized HTTP clients with connection pooling, reused by the
//! analysis services and the OCR vision client. Per-request timeouts come from
//! [`crate::config::PipelineConfig`].

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Client for the clause and risk services
///
/// Both calls for a file run concurrently, so keep a couple of idle
/// connections per host.
pub static ANALYSIS_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .build()
        .expect("Failed to create analysis HTTP client")
});

/// Client for vision OCR requests (one request per rendered page)
pub static VISION_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .expect("Failed to create vision HTTP client")
});

#[inline]
pub fn analysis_client() -> &'static Client {
    &ANALYSIS_CLIENT
}

#[inline]
pub fn vision_client() -> &'static Client {
    &VISION_CLIENT
}
