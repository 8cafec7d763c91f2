//! Tap-list acquisition from brewery websites.
//!
//! [`scraper::TapListScraper`] drives an ordered chain of fetch strategies
//! ([`strategy`]) over two transports ([`http_client`]); fetched pages go
//! through the layered extractors in [`extract`] and [`text_patterns`], and
//! every candidate passes the same rules in [`validate`].

pub mod extract;
pub mod http_client;
pub mod scraper;
pub mod strategy;
pub mod text_patterns;
pub mod validate;

pub use http_client::{FetchError, PageFetcher};
pub use scraper::{ScrapeError, ScrapeOutcome, TapListScraper};
