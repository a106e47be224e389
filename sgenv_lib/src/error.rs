//! Error types for the library layer.

use thiserror::Error;

/// Why a single feed fetch failed.
///
/// `Clone` because one in-flight result is handed to every caller that
/// joined it. Every variant carries the human-readable feed label.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("{label}: device is offline")]
    Offline { label: String },
    #[error("{label}: request timed out")]
    Timeout { label: String },
    #[error("{label}: request failed with status {status}")]
    Http { label: String, status: u16 },
    #[error("{label}: rate limited (HTTP 429)")]
    RateLimited {
        label: String,
        retry_after: Option<String>,
    },
    #[error("{label}: payload is missing required fields")]
    EmptyPayload { label: String },
    #[error("{label}: malformed payload: {message}")]
    Malformed { label: String, message: String },
    #[error("{label}: network error: {message}")]
    Network { label: String, message: String },
    #[error("{label}: invalid URL: {message}")]
    InvalidUrl { label: String, message: String },
}

impl FetchError {
    pub(crate) fn from_api(label: &str, err: sgenv_api::Error) -> Self {
        let label = label.to_string();
        match err {
            sgenv_api::Error::HttpStatus {
                status: 429,
                retry_after,
                ..
            } => Self::RateLimited { label, retry_after },
            sgenv_api::Error::HttpStatus { status, .. } => Self::Http { label, status },
            sgenv_api::Error::Timeout => Self::Timeout { label },
            sgenv_api::Error::Parse(message) => Self::Malformed { label, message },
            sgenv_api::Error::InvalidUrl(message) => Self::InvalidUrl { label, message },
            sgenv_api::Error::Network(message) | sgenv_api::Error::Build(message) => {
                Self::Network { label, message }
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Offline { label }
            | Self::Timeout { label }
            | Self::Http { label, .. }
            | Self::RateLimited { label, .. }
            | Self::EmptyPayload { label }
            | Self::Malformed { label, .. }
            | Self::Network { label, .. }
            | Self::InvalidUrl { label, .. } => label,
        }
    }

    /// True for a 429, whether or not the single retry has been spent.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Http { status: 429, .. }
        )
    }
}

/// Errors raised while constructing or configuring the service.
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("HTTP client error: {0}")]
    Client(#[from] sgenv_api::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Invalid snapshot dataset: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("Failed to read snapshot file: {0}")]
    SnapshotIo(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_429_maps_to_rate_limited() {
        let err = FetchError::from_api(
            "Rainfall",
            sgenv_api::Error::HttpStatus {
                status: 429,
                retry_after: Some("3".to_string()),
                body: String::new(),
            },
        );
        assert_eq!(
            err,
            FetchError::RateLimited {
                label: "Rainfall".to_string(),
                retry_after: Some("3".to_string())
            }
        );
        assert!(err.is_rate_limited());
    }

    #[test]
    fn api_status_maps_to_http() {
        let err = FetchError::from_api(
            "PM2.5",
            sgenv_api::Error::HttpStatus {
                status: 503,
                retry_after: None,
                body: "down".to_string(),
            },
        );
        assert!(matches!(err, FetchError::Http { status: 503, .. }));
        assert!(!err.is_rate_limited());
        assert_eq!(err.label(), "PM2.5");
    }

    #[test]
    fn exhausted_429_still_counts_as_rate_limited() {
        let err = FetchError::Http {
            label: "Wind".to_string(),
            status: 429,
        };
        assert!(err.is_rate_limited());
    }

    #[test]
    fn display_includes_label() {
        let err = FetchError::Timeout {
            label: "Humidity".to_string(),
        };
        assert_eq!(err.to_string(), "Humidity: request timed out");
    }
}
