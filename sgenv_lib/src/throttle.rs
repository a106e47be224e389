//! Per-label warning throttle so sustained outages do not flood the log.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::FetchError;

/// Default suppression window for repeated warnings with the same label.
pub const DEFAULT_WARN_WINDOW: Duration = Duration::from_secs(60);

pub struct WarnThrottle {
    window: Duration,
    last_emitted: DashMap<String, Instant>,
}

impl Default for WarnThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_WINDOW)
    }
}

impl WarnThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted: DashMap::new(),
        }
    }

    /// Records an emission for `label` and returns `true` unless one was
    /// already recorded within the window.
    pub fn allow(&self, label: &str) -> bool {
        let now = Instant::now();
        match self.last_emitted.entry(label.to_string()) {
            Entry::Occupied(mut seen) => {
                if now.duration_since(*seen.get()) < self.window {
                    false
                } else {
                    seen.insert(now);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Emits a throttled warning for a failed fetch. Returns whether it was logged.
    pub fn warn_fetch(&self, err: &FetchError) -> bool {
        if !self.allow(err.label()) {
            tracing::debug!(label = err.label(), "suppressed repeated warning: {}", err);
            return false;
        }
        if err.is_rate_limited() {
            tracing::warn!(label = err.label(), "rate-limited: {}", err);
        } else {
            tracing::warn!(label = err.label(), "fetch failed: {}", err);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_label_suppressed_within_window() {
        tokio::time::pause();
        let throttle = WarnThrottle::default();
        assert!(throttle.allow("Rainfall"));
        assert!(!throttle.allow("Rainfall"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!throttle.allow("Rainfall"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(throttle.allow("Rainfall"));
    }

    #[test]
    fn labels_are_independent() {
        let throttle = WarnThrottle::default();
        assert!(throttle.allow("Rainfall"));
        assert!(throttle.allow("PM2.5"));
    }

    #[test]
    fn warn_fetch_reports_suppression() {
        let throttle = WarnThrottle::default();
        let err = FetchError::RateLimited {
            label: "Wind".to_string(),
            retry_after: None,
        };
        assert!(throttle.warn_fetch(&err));
        assert!(!throttle.warn_fetch(&err));
        assert!(throttle.allow("Humidity"));
    }
}
