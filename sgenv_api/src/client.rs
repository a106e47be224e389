//! HTTP client for the data.gov.sg real-time environment feeds.

use std::time::Duration;

use reqwest::header::{ACCEPT, RETRY_AFTER};
use url::Url;

use crate::Error;

/// Default per-request timeout used when callers do not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

const USER_AGENT: &str = concat!("sgenv/", env!("CARGO_PKG_VERSION"));

/// Thin JSON-over-HTTPS client.
///
/// Holds one pooled `reqwest::Client`; every call carries its own timeout so
/// feeds with different latency budgets can share the pool. No caching or
/// retrying happens here.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    /// Creates a new client with gzip and rustls enabled.
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::Build(e.to_string())
            })?;
        Ok(Self { http })
    }

    /// Issues a GET against an absolute URL and parses the body as JSON.
    ///
    /// Non-2xx responses are returned as [`Error::HttpStatus`] with the
    /// `Retry-After` header preserved so callers can schedule a retry.
    pub async fn get_json(&self, url: &str, timeout: Duration) -> Result<serde_json::Value, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;

        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string());
        let body = resp.text().await.map_err(classify)?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::debug!(status = status.as_u16(), "upstream returned {}", snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                retry_after,
                body: snippet,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!("Failed to parse body: {} | body: {}", e, truncate_body(&body));
            Error::Parse(e.to_string())
        })
    }
}

fn classify(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
