//! Caching, de-duplicating, rate-limit-aware wrapper around the HTTP client.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rand::Rng;
use serde_json::Value;
use sgenv_api::Client;

use crate::cache::MemoryCache;
use crate::error::FetchError;
use crate::inflight::InFlightRequests;
use crate::throttle::WarnThrottle;

/// Longest honoured `Retry-After` wait.
const MAX_RETRY_AFTER_MS: f64 = 2000.0;

type FetchResult = Result<Arc<Value>, FetchError>;

/// Per-call cache lifetime and network bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub ttl: Duration,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            timeout: sgenv_api::DEFAULT_TIMEOUT,
        }
    }
}

impl FetchOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Answers whether a network attempt is worth making at all.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Probe for hosts without a connectivity signal.
pub struct AssumeOnline;

impl ConnectivityProbe for AssumeOnline {
    fn is_online(&self) -> bool {
        true
    }
}

impl<F> ConnectivityProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_online(&self) -> bool {
        self()
    }
}

/// Wait before the single retry after a 429.
///
/// A numeric `Retry-After` (seconds) is honoured up to 2 s. An absent or
/// non-numeric header falls back to a random 800-1200 ms.
pub fn retry_after_delay(header: Option<&str>) -> Duration {
    let seconds = header
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite());
    match seconds {
        Some(secs) => {
            let ms = (secs * 1000.0).clamp(0.0, MAX_RETRY_AFTER_MS);
            Duration::from_millis(ms as u64)
        }
        None => Duration::from_millis(rand::thread_rng().gen_range(800..1200)),
    }
}

/// JSON fetch client shared by every feed.
///
/// Lookup order per URL: unexpired cache entry, then the pending call for
/// that URL if one exists, then a new network call. A 429 is retried once
/// after [`retry_after_delay`]; nothing else is retried. Cloning is cheap
/// and clones share cache and in-flight state.
#[derive(Clone)]
pub struct FetchClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    cache: MemoryCache<Arc<Value>>,
    in_flight: InFlightRequests<FetchResult>,
    probe: Arc<dyn ConnectivityProbe>,
    warnings: Arc<WarnThrottle>,
}

impl FetchClient {
    /// Creates a client that assumes connectivity and owns its warning throttle.
    pub fn new(http: Client) -> Self {
        Self::with_probe(http, Arc::new(AssumeOnline), Arc::new(WarnThrottle::default()))
    }

    pub fn with_probe(
        http: Client,
        probe: Arc<dyn ConnectivityProbe>,
        warnings: Arc<WarnThrottle>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                cache: MemoryCache::new(),
                in_flight: InFlightRequests::new(),
                probe,
                warnings,
            }),
        }
    }

    /// Fetches `url` as JSON, labelling log output with `label`.
    pub async fn fetch_json(&self, url: &str, label: &str, opts: FetchOptions) -> FetchResult {
        if let Some(hit) = self.inner.cache.get(url) {
            tracing::debug!(label, url, "cache hit");
            return Ok(hit);
        }

        let (call, started) = self.inner.in_flight.join_or_start(url, || {
            let inner = Arc::clone(&self.inner);
            let url = url.to_string();
            let label = label.to_string();
            // The call runs on its own task so it settles, warns, and clears its
            // in-flight entry even if every waiter is dropped.
            let task = tokio::spawn({
                let label = label.clone();
                async move {
                    let result = inner.fetch_uncached(&url, &label, opts).await;
                    inner.in_flight.complete(&url);
                    if let Err(err) = &result {
                        inner.warnings.warn_fetch(err);
                    }
                    result
                }
            });
            async move {
                task.await.unwrap_or_else(|err| {
                    Err(FetchError::Network {
                        label,
                        message: format!("fetch task failed: {}", err),
                    })
                })
            }
            .boxed()
        });
        if !started {
            tracing::debug!(label, url, "joined in-flight request");
        }

        call.await
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn warnings(&self) -> &Arc<WarnThrottle> {
        &self.inner.warnings
    }
}

impl Inner {
    async fn fetch_uncached(&self, url: &str, label: &str, opts: FetchOptions) -> FetchResult {
        // A call that finished between our cache miss and claiming the slot.
        if let Some(hit) = self.cache.get(url) {
            return Ok(hit);
        }
        if !self.probe.is_online() {
            return Err(FetchError::Offline {
                label: label.to_string(),
            });
        }

        let value = match self.request(url, label, opts.timeout).await {
            Err(FetchError::RateLimited { retry_after, .. }) => {
                let wait = retry_after_delay(retry_after.as_deref());
                tracing::debug!(
                    label,
                    url,
                    wait_ms = wait.as_millis() as u64,
                    "rate-limited, retrying once"
                );
                tokio::time::sleep(wait).await;
                self.request(url, label, opts.timeout)
                    .await
                    .map_err(|err| match err {
                        FetchError::RateLimited { label, .. } => FetchError::Http {
                            label,
                            status: 429,
                        },
                        other => other,
                    })?
            }
            other => other?,
        };

        let value = Arc::new(value);
        self.cache
            .set_with_ttl(url.to_string(), Arc::clone(&value), opts.ttl);
        Ok(value)
    }

    async fn request(&self, url: &str, label: &str, timeout: Duration) -> Result<Value, FetchError> {
        self.http
            .get_json(url, timeout)
            .await
            .map_err(|e| FetchError::from_api(label, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_is_capped() {
        assert_eq!(retry_after_delay(Some("5")), Duration::from_millis(2000));
        assert_eq!(retry_after_delay(Some("1.5")), Duration::from_millis(1500));
        assert_eq!(retry_after_delay(Some(" 1 ")), Duration::from_millis(1000));
    }

    #[test]
    fn negative_retry_after_means_no_wait() {
        assert_eq!(retry_after_delay(Some("-3")), Duration::ZERO);
        assert_eq!(retry_after_delay(Some("0")), Duration::ZERO);
    }

    #[test]
    fn missing_or_garbage_retry_after_is_jittered() {
        for header in [None, Some("soon"), Some("Wed, 21 Oct 2015 07:28:00 GMT"), Some("NaN")] {
            for _ in 0..50 {
                let wait = retry_after_delay(header);
                assert!(wait >= Duration::from_millis(800), "{:?}", wait);
                assert!(wait < Duration::from_millis(1200), "{:?}", wait);
            }
        }
    }

    #[test]
    fn default_options() {
        let opts = FetchOptions::default();
        assert_eq!(opts.ttl, Duration::from_secs(60));
        assert_eq!(opts.timeout, Duration::from_secs(8));
    }

    #[test]
    fn closure_probe() {
        let offline = || false;
        assert!(!offline.is_online());
        assert!(AssumeOnline.is_online());
    }
}
