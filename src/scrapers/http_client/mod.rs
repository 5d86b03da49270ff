//! HTTP fetch layer with retry, pacing, and proxy rotation.

mod headers;
mod user_agent;

pub use headers::HeaderProfile;
pub use user_agent::{random_user_agent, USER_AGENTS};

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Proxy};
use thiserror::Error;
use tracing::{error, warn};

use super::proxy::ProxyRotator;
use super::rate::{Pacing, RateGate};
use crate::config::FetchConfig;

/// Error from the fetch layer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to fetch {url} after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// Bounded-retry policy for one page fetch. No exponential backoff: the
/// delay between attempts is a flat sample from `delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Pacing,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_RETRIES,
            delay: Pacing::range_secs(1, 3),
        }
    }
}

/// HTTP client for page fetches.
///
/// Owns the proxy rotation and rate-gate state; no other component talks to
/// the network. Headers are rebuilt per request so the user agent varies.
pub struct HttpClient {
    client: Client,
    headers: HeaderProfile,
    proxies: ProxyRotator,
    gate: RateGate,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a client from fetch settings and a proxy pool.
    pub fn new(config: &FetchConfig, proxies: ProxyRotator) -> Self {
        let rotator = proxies.clone();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            // Consulted on every request, so rotation takes effect without
            // rebuilding the client.
            .proxy(Proxy::custom(move |_| rotator.get_proxy()))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            headers: HeaderProfile::Standard,
            proxies,
            gate: RateGate::with_interval(Duration::ZERO),
            retry: RetryPolicy {
                max_attempts: config.max_retries,
                ..RetryPolicy::default()
            },
        }
    }

    /// Switch to the browser header profile with the given Referer.
    pub fn with_referer(mut self, referer: String) -> Self {
        self.headers = HeaderProfile::Browser { referer };
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Gate physical requests to a minimum spacing.
    pub fn with_rate_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn proxies(&self) -> &ProxyRotator {
        &self.proxies
    }

    /// Fetch a page body, retrying up to the configured ceiling.
    ///
    /// Returns the body of the first successful attempt. Exhaustion wraps
    /// the last transport error; callers treat that as "page unavailable",
    /// not as a fatal condition.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.retry.max_attempts.max(1);
        retry_loop(&self.retry, url, || self.attempt(url))
            .await
            .map_err(|err| FetchError::RetriesExhausted {
                url: url.to_string(),
                attempts,
                source: Box::new(err),
            })
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        self.gate.acquire().await;
        let mut request = self.client.get(url);
        for (name, value) in self.headers.request_headers() {
            request = request.header(name, value);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Run `op` up to `policy.max_attempts` times, sleeping one delay sample
/// between failures. The first success returns immediately; exhaustion
/// returns the last attempt's error.
pub(crate) async fn retry_loop<T, E, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err: Option<E> = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!("Request failed (attempt {}/{}): {}", attempt, attempts, err);
                last_err = Some(err);
                if attempt < attempts {
                    policy.delay.wait().await;
                }
            }
        }
    }

    error!("Failed to fetch {} after {} attempts", url, attempts);
    Err(last_err.expect("at least one attempt ran"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Pacing::Fixed(Duration::from_millis(1)),
        }
    }

    #[tokio::test]
    async fn test_retry_exhausts_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<String, String> =
            retry_loop(&fast_policy(3), "https://example.com", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("connection reset".to_string()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "connection reset");
    }

    #[tokio::test]
    async fn test_retry_returns_first_success_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<String, String> =
            retry_loop(&fast_policy(3), "https://example.com", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("body".to_string()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap(), "body");
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<String, String> =
            retry_loop(&fast_policy(3), "https://example.com", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("timed out".to_string())
                    } else {
                        Ok("recovered".to_string())
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_zero_attempt_policy_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<String, String> =
            retry_loop(&fast_policy(0), "https://example.com", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("refused".to_string()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
