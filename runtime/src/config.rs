//! Pipeline configuration.
//!
//! A single immutable [`PipelineConfig`] is built once at startup (defaults,
//! then `TAPROOM_*` environment overrides) and shared by reference with every
//! component. Nothing in the pipeline reads ambient global state.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CACHE_TTL_HOURS: u64 = 24;
const DEFAULT_DETAIL_RETENTION_DAYS: u64 = 7;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TOTAL_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MIN_DELAY_SECS: f64 = 1.0;
const DEFAULT_MAX_DELAY_SECS: f64 = 3.0;
const DEFAULT_DETAIL_DELAY_MS: u64 = 100;
const DEFAULT_MAX_BREWERIES: usize = 15;
const DEFAULT_MAX_BEERS: usize = 20;
const MAX_CACHE_TTL_HOURS: u64 = 24 * 365 * 10;
const MAX_DETAIL_RETENTION_DAYS: u64 = 365 * 10;
const MAX_DELAY_SECS: f64 = 600.0;
const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Browser signatures cycled across fetch attempts.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

/// Path suffixes tried by the alternative-endpoint strategy, in order.
pub const ALTERNATIVE_ENDPOINTS: &[&str] = &[
    "/menu",
    "/beers",
    "/tap-list",
    "/current-beers",
    "/on-tap",
    "/beer-menu",
    "/draft-list",
    "/what-on-tap",
];

/// Words that mark a candidate name as site chrome rather than a beer.
pub const NON_BEER_KEYWORDS: &[&str] = &[
    "food",
    "menu",
    "hours",
    "contact",
    "location",
    "locations",
    "phone",
    "address",
    "about",
    "directions",
    "parking",
    "events",
    "catering",
    "reservation",
    "reservations",
    "gift card",
    "merchandise",
    "apparel",
    "careers",
    "login",
    "cart",
    "shop",
];

/// Location names that show up as navigation links on multi-site breweries.
pub const CITY_BLOCKLIST: &[&str] = &[
    "san francisco",
    "oakland",
    "berkeley",
    "san jose",
    "moraga",
    "danville",
    "san ramon",
    "walnut creek",
    "concord",
    "pleasanton",
    "livermore",
    "lafayette",
    "orinda",
    "new york",
    "chicago",
    "los angeles",
    "denver",
    "portland",
    "seattle",
];

/// Immutable configuration shared by every pipeline component.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Time-to-live for search and detail cache entries.
    pub cache_ttl: Duration,
    /// Detail entries older than this are purged by cleanup regardless of TTL.
    pub detail_retention: Duration,
    /// TCP connect timeout for scrape attempts.
    pub connect_timeout: Duration,
    /// Total request timeout for scrape attempts.
    pub total_timeout: Duration,
    /// Lower bound of the randomized delay between breweries.
    pub min_delay: Duration,
    /// Upper bound of the randomized delay between breweries.
    pub max_delay: Duration,
    /// Fixed delay between place-detail lookups.
    pub detail_delay: Duration,
    /// Breweries kept after ranking, before detail enrichment.
    pub max_breweries: usize,
    /// Beers kept per brewery.
    pub max_beers: usize,
    /// Inclusive ABV bounds.
    pub abv_range: (f64, f64),
    /// Inclusive IBU bounds.
    pub ibu_range: (u32, u32),
    pub alternative_endpoints: Vec<String>,
    pub user_agents: Vec<String>,
    pub non_beer_keywords: Vec<String>,
    pub city_blocklist: Vec<String>,
    /// Places API credential. `None` degrades discovery to empty results.
    pub places_api_key: Option<String>,
    pub places_base_url: String,
    /// SQLite file backing the durable cache tier.
    pub cache_db_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_HOURS * 3600),
            detail_retention: Duration::from_secs(DEFAULT_DETAIL_RETENTION_DAYS * 24 * 3600),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            total_timeout: Duration::from_secs(DEFAULT_TOTAL_TIMEOUT_SECS),
            min_delay: Duration::from_secs_f64(DEFAULT_MIN_DELAY_SECS),
            max_delay: Duration::from_secs_f64(DEFAULT_MAX_DELAY_SECS),
            detail_delay: Duration::from_millis(DEFAULT_DETAIL_DELAY_MS),
            max_breweries: DEFAULT_MAX_BREWERIES,
            max_beers: DEFAULT_MAX_BEERS,
            abv_range: (0.5, 20.0),
            ibu_range: (0, 150),
            alternative_endpoints: to_owned(ALTERNATIVE_ENDPOINTS),
            user_agents: to_owned(USER_AGENTS),
            non_beer_keywords: to_owned(NON_BEER_KEYWORDS),
            city_blocklist: to_owned(CITY_BLOCKLIST),
            places_api_key: None,
            places_base_url: DEFAULT_PLACES_BASE_URL.to_string(),
            cache_db_path: default_cache_db_path(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `TAPROOM_*` environment variables.
    ///
    /// The places credential comes from `GOOGLE_PLACES_API_KEY`; an empty
    /// value is treated as absent.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let min_delay = read_env_f64("TAPROOM_SCRAPE_DELAY_MIN_SECS", DEFAULT_MIN_DELAY_SECS)
            .clamp(0.0, MAX_DELAY_SECS);
        let max_delay = read_env_f64("TAPROOM_SCRAPE_DELAY_MAX_SECS", DEFAULT_MAX_DELAY_SECS)
            .clamp(min_delay, MAX_DELAY_SECS);

        Self {
            cache_ttl: hours(
                read_env_u64("TAPROOM_CACHE_TTL_HOURS", DEFAULT_CACHE_TTL_HOURS)
                    .clamp(1, MAX_CACHE_TTL_HOURS),
            )
            .unwrap_or(defaults.cache_ttl),
            detail_retention: days(
                read_env_u64("TAPROOM_DETAIL_RETENTION_DAYS", DEFAULT_DETAIL_RETENTION_DAYS)
                    .clamp(1, MAX_DETAIL_RETENTION_DAYS),
            )
            .unwrap_or(defaults.detail_retention),
            connect_timeout: Duration::from_secs(read_env_u64(
                "TAPROOM_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            total_timeout: Duration::from_secs(read_env_u64(
                "TAPROOM_TOTAL_TIMEOUT_SECS",
                DEFAULT_TOTAL_TIMEOUT_SECS,
            )),
            min_delay: Duration::try_from_secs_f64(min_delay).unwrap_or(defaults.min_delay),
            max_delay: Duration::try_from_secs_f64(max_delay).unwrap_or(defaults.max_delay),
            detail_delay: Duration::from_millis(read_env_u64(
                "TAPROOM_DETAIL_DELAY_MS",
                DEFAULT_DETAIL_DELAY_MS,
            )),
            max_breweries: read_env_usize("TAPROOM_MAX_BREWERIES", DEFAULT_MAX_BREWERIES).max(1),
            max_beers: read_env_usize("TAPROOM_MAX_BEERS", DEFAULT_MAX_BEERS).max(1),
            places_api_key: read_env_string("GOOGLE_PLACES_API_KEY").filter(|k| !k.is_empty()),
            places_base_url: read_env_string("TAPROOM_PLACES_BASE_URL")
                .filter(|u| !u.is_empty())
                .unwrap_or(defaults.places_base_url.clone()),
            cache_db_path: read_env_string("TAPROOM_CACHE_DB")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_db_path.clone()),
            ..defaults
        }
    }

    /// Cache TTL expressed in whole hours, as reported by cache stats.
    pub fn cache_ttl_hours(&self) -> u64 {
        self.cache_ttl.as_secs() / 3600
    }
}

/// `~/.taproom/cache.db`, falling back to `/tmp` when there is no home dir.
pub fn default_cache_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".taproom")
        .join("cache.db")
}

fn hours(n: u64) -> Option<Duration> {
    n.checked_mul(3600).map(Duration::from_secs)
}

fn days(n: u64) -> Option<Duration> {
    n.checked_mul(24).and_then(hours)
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_env_usize(name: &str, default_value: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default_value)
}

fn read_env_f64(name: &str, default_value: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default_value)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string())
}
