//! Error types for the transport client.

/// Errors that can occur when requesting an upstream feed.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The URL handed to the client could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
    /// The request did not complete within its timeout.
    #[error("Request timed out")]
    Timeout,
    /// Connection, TLS, or body transfer failure.
    #[error("Network error: {0}")]
    Network(String),
    /// The upstream returned a non-success status.
    ///
    /// `retry_after` holds the raw `Retry-After` header value when present.
    #[error("Request failed with status {status}")]
    HttpStatus {
        status: u16,
        retry_after: Option<String>,
        body: String,
    },
    /// The body was not valid JSON.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}
