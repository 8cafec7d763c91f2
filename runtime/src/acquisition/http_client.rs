//! Page fetchers used by the scrape strategies.
//!
//! Two implementations with deliberately different transports:
//! [`PrimaryFetcher`] is an async `reqwest` client with browser-like headers,
//! [`FallbackFetcher`] is a blocking `reqwest` client driven from the blocking
//! thread pool. Both skip certificate validation because small brewery sites
//! routinely ship broken chains.

use crate::config::{PipelineConfig, USER_AGENTS};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::time::Duration;

/// Redirects followed before a fetch gives up.
const MAX_REDIRECTS: usize = 10;

/// Referer sent by the primary fetcher.
const SEARCH_REFERER: &str = "https://www.google.com/";

/// Failure of a single fetch attempt.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Network(String),

    #[error("blocking fetch task failed: {0}")]
    Join(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if looks_like_tls(&e) {
            Self::Tls(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Walk the source chain looking for a TLS/certificate failure.
fn looks_like_tls(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(e);
    while let Some(err) = current {
        let msg = err.to_string().to_ascii_lowercase();
        if msg.contains("certificate") || msg.contains("tls") || msg.contains("ssl") {
            return true;
        }
        current = err.source();
    }
    false
}

/// Fetches the body of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body of a `200 OK` response.
    ///
    /// `attempt` is the caller's running attempt counter and selects the
    /// User-Agent.
    async fn fetch(&self, url: &str, attempt: usize) -> Result<String, FetchError>;
}

/// Pick a User-Agent for `attempt`, cycling through the pool.
pub fn user_agent_for(pool: &[String], attempt: usize) -> &str {
    if pool.is_empty() {
        return USER_AGENTS[attempt % USER_AGENTS.len()];
    }
    &pool[attempt % pool.len()]
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
    headers
}

/// Async fetcher with browser-like headers, rotating User-Agent and an
/// injected Referer.
#[derive(Clone)]
pub struct PrimaryFetcher {
    client: reqwest::Client,
    user_agents: Vec<String>,
}

impl PrimaryFetcher {
    pub fn new(config: &PipelineConfig) -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .default_headers(browser_headers())
            .build()
            .unwrap_or_default();

        Self {
            client,
            user_agents: config.user_agents.clone(),
        }
    }
}

#[async_trait]
impl PageFetcher for PrimaryFetcher {
    async fn fetch(&self, url: &str, attempt: usize) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent_for(&self.user_agents, attempt))
            .header(header::REFERER, SEARCH_REFERER)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// Blocking fetcher with a plain header set, run on the blocking pool so it
/// never stalls the async executor.
#[derive(Clone)]
pub struct FallbackFetcher {
    connect_timeout: Duration,
    total_timeout: Duration,
    user_agents: Vec<String>,
}

impl FallbackFetcher {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            total_timeout: config.total_timeout,
            user_agents: config.user_agents.clone(),
        }
    }
}

#[async_trait]
impl PageFetcher for FallbackFetcher {
    async fn fetch(&self, url: &str, attempt: usize) -> Result<String, FetchError> {
        let url = url.to_string();
        let user_agent = user_agent_for(&self.user_agents, attempt).to_string();
        let connect_timeout = self.connect_timeout;
        let total_timeout = self.total_timeout;

        tokio::task::spawn_blocking(move || {
            fetch_blocking(&url, &user_agent, connect_timeout, total_timeout)
        })
        .await
        .map_err(|e| FetchError::Join(e.to_string()))?
    }
}

fn fetch_blocking(
    url: &str,
    user_agent: &str,
    connect_timeout: Duration,
    total_timeout: Duration,
) -> Result<String, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .danger_accept_invalid_certs(true)
        .connect_timeout(connect_timeout)
        .timeout(total_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .user_agent(user_agent)
        .build()?;

    let response = client
        .get(url)
        .header(header::ACCEPT, "*/*")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .header(header::CACHE_CONTROL, "no-cache")
        .send()?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.text()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            connect_timeout: Duration::from_millis(200),
            total_timeout: Duration::from_millis(400),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_user_agent_rotation_cycles_pool() {
        let pool: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(user_agent_for(&pool, 0), "a");
        assert_eq!(user_agent_for(&pool, 1), "b");
        assert_eq!(user_agent_for(&pool, 4), "b");
        assert_eq!(user_agent_for(&[], 0), USER_AGENTS[0]);
    }

    #[tokio::test]
    async fn test_primary_sends_referer_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header_exists("referer"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = PrimaryFetcher::new(&fast_config());
        let body = fetcher.fetch(&format!("{}/", server.uri()), 0).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_primary_non_200_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = PrimaryFetcher::new(&fast_config());
        let err = fetcher.fetch(&server.uri(), 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(403)));
    }

    #[tokio::test]
    async fn test_primary_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = PrimaryFetcher::new(&fast_config());
        let err = fetcher.fetch(&server.uri(), 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fallback_fetches_off_the_executor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/taps"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fallback body"))
            .mount(&server)
            .await;

        let fetcher = FallbackFetcher::new(&fast_config());
        let body = fetcher
            .fetch(&format!("{}/taps", server.uri()), 3)
            .await
            .unwrap();
        assert_eq!(body, "fallback body");
    }

    #[tokio::test]
    async fn test_fallback_non_200_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = FallbackFetcher::new(&fast_config());
        let err = fetcher.fetch(&server.uri(), 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));
    }
}
