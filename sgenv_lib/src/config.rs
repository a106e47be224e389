//! Service configuration: upstream endpoints, per-feed TTLs, and timeouts.

use std::time::Duration;

use serde::Deserialize;

use crate::client::FetchOptions;
use crate::error::EnvError;
use crate::risk::FloodThresholds;

pub const DEFAULT_BASE_URL: &str = "https://api-open.data.gov.sg";

/// One upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Forecast,
    Rainfall,
    Pm25,
    WindSpeed,
    WindDirection,
    Humidity,
    Temperature,
}

impl FeedKind {
    pub const ALL: [FeedKind; 7] = [
        Self::Forecast,
        Self::Rainfall,
        Self::Pm25,
        Self::WindSpeed,
        Self::WindDirection,
        Self::Humidity,
        Self::Temperature,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Forecast => "/v2/real-time/api/two-hr-forecast",
            Self::Rainfall => "/v2/real-time/api/rainfall",
            Self::Pm25 => "/v2/real-time/api/pm25",
            Self::WindSpeed => "/v2/real-time/api/wind-speed",
            Self::WindDirection => "/v2/real-time/api/wind-direction",
            Self::Humidity => "/v2/real-time/api/relative-humidity",
            Self::Temperature => "/v2/real-time/api/air-temperature",
        }
    }

    /// Human-readable label used in logs and warning throttling.
    pub fn label(self) -> &'static str {
        match self {
            Self::Forecast => "2-hour forecast",
            Self::Rainfall => "Rainfall",
            Self::Pm25 => "PM2.5",
            Self::WindSpeed => "Wind speed",
            Self::WindDirection => "Wind direction",
            Self::Humidity => "Humidity",
            Self::Temperature => "Temperature",
        }
    }
}

/// Cache lifetime per feed, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedTtls {
    pub forecast: u64,
    pub rainfall: u64,
    pub pm25: u64,
    pub wind: u64,
    pub humidity: u64,
    pub temperature: u64,
}

impl Default for FeedTtls {
    fn default() -> Self {
        Self {
            forecast: 300,
            rainfall: 60,
            pm25: 300,
            wind: 60,
            humidity: 120,
            temperature: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub warn_window_secs: u64,
    pub ttl: FeedTtls,
    pub flood: FloodThresholds,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 8000,
            warn_window_secs: 60,
            ttl: FeedTtls::default(),
            flood: FloodThresholds::default(),
        }
    }
}

impl EnvConfig {
    /// Parses a TOML document; omitted keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, EnvError> {
        Ok(toml::from_str(content)?)
    }

    /// Points every feed at another host. Used for testing with wiremock.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn url(&self, feed: FeedKind) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), feed.path())
    }

    pub fn ttl(&self, feed: FeedKind) -> Duration {
        let secs = match feed {
            FeedKind::Forecast => self.ttl.forecast,
            FeedKind::Rainfall => self.ttl.rainfall,
            FeedKind::Pm25 => self.ttl.pm25,
            FeedKind::WindSpeed | FeedKind::WindDirection => self.ttl.wind,
            FeedKind::Humidity => self.ttl.humidity,
            FeedKind::Temperature => self.ttl.temperature,
        };
        Duration::from_secs(secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn warn_window(&self) -> Duration {
        Duration::from_secs(self.warn_window_secs)
    }

    pub fn fetch_options(&self, feed: FeedKind) -> FetchOptions {
        FetchOptions {
            ttl: self.ttl(feed),
            timeout: self.timeout(),
        }
    }
}
