//! Per-brewery tap-list scraper.
//!
//! Runs the fetch strategies in a fixed order, one at a time, and stops at
//! the first that produces beers. Every failure inside a strategy is logged
//! at debug level and treated as "try the next one"; total failure is an
//! empty outcome, never synthetic data.

use super::extract::extract_beers;
use super::http_client::{FallbackFetcher, FetchError, PageFetcher, PrimaryFetcher};
use super::strategy::{alternative_urls, Strategy, STRATEGY_ORDER};
use crate::config::PipelineConfig;
use crate::model::Beer;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Terminal state of one brewery scrape.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Success(Vec<Beer>),
    Empty,
}

impl ScrapeOutcome {
    pub fn into_beers(self) -> Vec<Beer> {
        match self {
            Self::Success(beers) => beers,
            Self::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Errors that stop a scrape before any strategy runs.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid website URL {0:?}")]
    InvalidUrl(String),
}

/// Fetch-and-extract chain for brewery websites.
pub struct TapListScraper {
    primary: Arc<dyn PageFetcher>,
    fallback: Arc<dyn PageFetcher>,
    config: Arc<PipelineConfig>,
}

impl TapListScraper {
    /// Scraper with the production fetchers.
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self {
            primary: Arc::new(PrimaryFetcher::new(&config)),
            fallback: Arc::new(FallbackFetcher::new(&config)),
            config,
        }
    }

    pub fn with_fetchers(
        primary: Arc<dyn PageFetcher>,
        fallback: Arc<dyn PageFetcher>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    /// Scrape a brewery's tap list. No website means no network traffic.
    pub async fn scrape(&self, website: Option<&str>) -> Result<ScrapeOutcome, ScrapeError> {
        match website.map(str::trim).filter(|w| !w.is_empty()) {
            Some(url) => self.scrape_url(url).await,
            None => Ok(ScrapeOutcome::Empty),
        }
    }

    /// Scrape a single URL through the full strategy chain.
    pub async fn scrape_url(&self, website: &str) -> Result<ScrapeOutcome, ScrapeError> {
        let url = normalize_website(website)?;
        let mut attempt = 0usize;

        for strategy in STRATEGY_ORDER {
            match self.run_strategy(strategy, &url, &mut attempt).await {
                Ok(beers) if !beers.is_empty() => {
                    info!(
                        url = %url,
                        strategy = strategy.as_str(),
                        beers = beers.len(),
                        "scraped tap list"
                    );
                    return Ok(ScrapeOutcome::Success(beers));
                }
                Ok(_) => debug!(url = %url, strategy = strategy.as_str(), "no beers found"),
                Err(e) => debug!(url = %url, strategy = strategy.as_str(), error = %e, "strategy failed"),
            }
        }

        info!(url = %url, "all scrape strategies came back empty");
        Ok(ScrapeOutcome::Empty)
    }

    async fn run_strategy(
        &self,
        strategy: Strategy,
        url: &str,
        attempt: &mut usize,
    ) -> Result<Vec<Beer>, FetchError> {
        match strategy {
            Strategy::Primary => self.fetch_and_extract(self.primary.as_ref(), url, attempt).await,
            Strategy::Fallback => self.fetch_and_extract(self.fallback.as_ref(), url, attempt).await,
            Strategy::AlternativeEndpoints => {
                for variant in alternative_urls(url, &self.config.alternative_endpoints) {
                    match self
                        .fetch_and_extract(self.primary.as_ref(), &variant, attempt)
                        .await
                    {
                        Ok(beers) if !beers.is_empty() => return Ok(beers),
                        Ok(_) => debug!(url = %variant, "alternative endpoint had no beers"),
                        Err(e) => debug!(url = %variant, error = %e, "alternative endpoint failed"),
                    }
                }
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_and_extract(
        &self,
        fetcher: &dyn PageFetcher,
        url: &str,
        attempt: &mut usize,
    ) -> Result<Vec<Beer>, FetchError> {
        let current = *attempt;
        *attempt += 1;
        let html = fetcher.fetch(url, current).await?;

        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || extract_beers(&html, &config))
            .await
            .map_err(|e| FetchError::Join(e.to_string()))
    }
}

/// Accept bare hostnames by assuming https.
fn normalize_website(website: &str) -> Result<String, ScrapeError> {
    let candidate = if website.contains("://") {
        website.to_string()
    } else {
        format!("https://{website}")
    };
    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(url.to_string())
        }
        _ => Err(ScrapeError::InvalidUrl(website.to_string())),
    }
}
