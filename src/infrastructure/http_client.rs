//! HTTP client for retailer pages with rate limiting and retry
//!
//! One shared `reqwest::Client` (connection pool, cookies, browser-like
//! headers) behind the `PageFetcher` trait. Bot-challenge statuses (403/503)
//! are handed back with their body because many of them still embed the
//! product's structured data.

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER, USER_AGENT},
    Client, Response, StatusCode,
};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::{defaults, FetcherConfig};
use crate::domain::{FetchedPage, PageFetcher, ScrapeError, ScrapeResult, PARSEABLE_STATUSES};

/// Outcome of a single attempt that did not produce a parseable page
struct AttemptFailure {
    reason: String,
    /// Server-requested delay in seconds
    retry_after: Option<u64>,
}

/// Retailer page fetcher
pub struct HttpClient {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    config: FetcherConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: FetcherConfig) -> ScrapeResult<Self> {
        let header = |field: &str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| ScrapeError::configuration(&format!("fetcher.{field}"), e.to_string()))
        };

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header("user_agent", &config.user_agent)?);
        headers.insert(ACCEPT, header("accept", defaults::ACCEPT)?);
        headers.insert(ACCEPT_LANGUAGE, header("accept_language", &config.accept_language)?);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| ScrapeError::configuration("fetcher", format!("failed to create HTTP client: {e}")))?;

        // 0 RPS = 제한 없음
        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Fetch with the retry policy: network errors and non-parseable statuses
    /// are retried with exponential backoff until `max_retries` is spent.
    pub async fn fetch(&self, url: &str) -> ScrapeResult<FetchedPage> {
        let attempts = self.config.max_retries.saturating_add(1);
        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=attempts {
            if let Some(limiter) = &self.rate_limiter {
                debug!("⚖️ [rate-limit] {} RPS", self.config.max_requests_per_second);
                limiter.until_ready().await;
            }

            info!("🌐 HTTP GET (attempt {}/{}) : {}", attempt, attempts, url);
            let failure = match self.client.get(url).send().await {
                Ok(response) => match self.accept(url, response).await {
                    Ok(page) => return Ok(page),
                    Err(failure) => failure,
                },
                Err(e) => AttemptFailure {
                    reason: describe_error(&e, self.config.timeout_seconds),
                    retry_after: None,
                },
            };

            warn!("⚠️ Attempt {}/{} failed for {}: {}", attempt, attempts, url, failure.reason);
            last_reason = failure.reason;

            if attempt < attempts {
                tokio::time::sleep(self.backoff_delay(attempt, failure.retry_after)).await;
            }
        }

        Err(ScrapeError::fetch_failed(url, attempts, last_reason))
    }

    async fn accept(&self, url: &str, response: Response) -> Result<FetchedPage, AttemptFailure> {
        let status = response.status();
        let final_url = response.url().to_string();

        if !PARSEABLE_STATUSES.contains(&status.as_u16()) {
            let retry_after = matches!(status, StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE)
                .then(|| retry_after_seconds(&response))
                .flatten();
            return Err(AttemptFailure {
                reason: format!("HTTP {status}"),
                retry_after,
            });
        }

        let body = response.text().await.map_err(|e| AttemptFailure {
            reason: format!("failed to read body: {}", describe_error(&e, self.config.timeout_seconds)),
            retry_after: None,
        })?;

        if status != StatusCode::OK {
            warn!("Parsing degraded {} response from {} ({} bytes)", status, url, body.len());
        } else {
            debug!("Fetched {} ({} bytes)", final_url, body.len());
        }

        Ok(FetchedPage::new(final_url, status.as_u16(), body))
    }

    /// `base * 2^(attempt-1)` plus jitter, capped; a larger `Retry-After` wins.
    fn backoff_delay(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let base = self.config.base_backoff_ms;
        let exponential = base.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        let jitter = fastrand::u64(0..=base / 4);
        let mut delay_ms = exponential.saturating_add(jitter).min(self.config.max_backoff_ms);

        if let Some(secs) = retry_after {
            delay_ms = delay_ms.max(secs.saturating_mul(1000)).min(self.config.max_backoff_ms);
        }

        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn get(&self, url: &str) -> ScrapeResult<FetchedPage> {
        self.fetch(url).await
    }
}

fn retry_after_seconds(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn describe_error(error: &reqwest::Error, timeout_seconds: u64) -> String {
    if error.is_timeout() {
        format!("timed out after {timeout_seconds}s")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn fast_config() -> FetcherConfig {
        FetcherConfig {
            max_retries: 2,
            base_backoff_ms: 1,
            max_backoff_ms: 5,
            ..FetcherConfig::default()
        }
    }

    #[tokio::test]
    async fn ok_page_is_returned_with_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/p/1")
            .with_status(200)
            .with_body("<h1>Tivi</h1>")
            .create_async()
            .await;

        let client = HttpClient::new(fast_config()).unwrap();
        let page = client.get(&format!("{}/p/1", server.url())).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<h1>Tivi</h1>");
        assert!(!page.is_degraded());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn challenge_statuses_are_parseable() {
        let mut server = mockito::Server::new_async().await;
        let forbidden = server.mock("GET", "/forbidden").with_status(403).with_body("challenge").expect(1).create_async().await;
        let unavailable = server.mock("GET", "/busy").with_status(503).with_body("busy").expect(1).create_async().await;

        let client = HttpClient::new(fast_config()).unwrap();
        let page = client.get(&format!("{}/forbidden", server.url())).await.unwrap();
        assert_eq!(page.status, 403);
        assert!(page.is_degraded());
        let page = client.get(&format!("{}/busy", server.url())).await.unwrap();
        assert_eq!(page.body, "busy");

        forbidden.assert_async().await;
        unavailable.assert_async().await;
    }

    #[tokio::test]
    async fn other_statuses_are_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/flaky").with_status(500).expect(3).create_async().await;

        let client = HttpClient::new(fast_config()).unwrap();
        let err = client.get(&format!("{}/flaky", server.url())).await.unwrap_err();

        match err {
            ScrapeError::FetchFailed { attempts, reason, .. } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("500"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn browser_headers_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("accept-language", Matcher::Regex("^vi-VN".to_string()))
            .match_header("user-agent", Matcher::Regex("Mozilla/5.0".to_string()))
            .with_status(200)
            .create_async()
            .await;

        let client = HttpClient::new(fast_config()).unwrap();
        client.get(&format!("{}/", server.url())).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_host_fails_after_retries() {
        let client = HttpClient::new(FetcherConfig {
            timeout_seconds: 2,
            ..fast_config()
        })
        .unwrap();

        // 포트 1은 연결 거부
        let err = client.get("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, ScrapeError::FetchFailed { attempts: 3, .. }));
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let client = HttpClient::new(FetcherConfig {
            base_backoff_ms: 100,
            max_backoff_ms: 1_000,
            ..FetcherConfig::default()
        })
        .unwrap();

        let first = client.backoff_delay(1, None);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        assert!(client.backoff_delay(3, None) >= Duration::from_millis(400));
        assert_eq!(client.backoff_delay(10, None), Duration::from_millis(1_000));
        assert_eq!(client.backoff_delay(1, Some(30)), Duration::from_millis(1_000));
    }

    #[test]
    fn invalid_user_agent_is_configuration_error() {
        let err = HttpClient::new(FetcherConfig {
            user_agent: "bad\nagent".to_string(),
            ..FetcherConfig::default()
        })
        .err()
        .unwrap();
        assert!(err.is_fatal());
    }
}
