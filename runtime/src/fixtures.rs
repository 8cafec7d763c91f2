//! Scripted collaborators shared by unit tests.

use crate::acquisition::{FetchError, PageFetcher};
use crate::cache::store::{
    BreweryDetailCacheEntry, CacheStore, SearchCacheEntry, StoreCounts, StoreError,
};
use crate::config::PipelineConfig;
use crate::geo::{GeoError, PlaceDetails, PlacesApi};
use crate::model::{Brewery, DiscoveredCandidate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A single-section tap list with one beer.
pub const BETA_TESTED_PAGE: &str = r#"
    <html><body>
      <nav><ul><li>Menu</li><li>Hours</li></ul></nav>
      <main>
        <h2>Signature Beers</h2>
        <div class="beer-block">
          <h3>Beta Tested</h3>
          <p>Czech-Style Pils</p>
          <p>5.1% ABV</p>
        </div>
        <h2>Visit</h2>
        <p>Open daily from noon.</p>
      </main>
    </body></html>
"#;

pub fn candidate(name: &str, coords: Option<(f64, f64)>, place_id: &str) -> DiscoveredCandidate {
    let mut brewery = Brewery::new(name, format!("{name} address"));
    if let Some((lat, lng)) = coords {
        brewery.latitude = Some(lat);
        brewery.longitude = Some(lng);
    }
    DiscoveredCandidate::new(brewery, Some(place_id.to_string()))
}

/// Defaults with every pause removed and short timeouts.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        detail_delay: Duration::ZERO,
        connect_timeout: Duration::from_millis(500),
        total_timeout: Duration::from_secs(2),
        ..PipelineConfig::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlacesMode {
    Normal,
    Denying,
    NoCredential,
}

/// In-memory places provider with canned responses.
pub struct ScriptedPlaces {
    origin: Option<(f64, f64)>,
    nearby: Vec<DiscoveredCandidate>,
    texts: HashMap<String, Vec<DiscoveredCandidate>>,
    details: HashMap<String, PlaceDetails>,
    failing: HashSet<String>,
    mode: PlacesMode,
    returned: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

impl ScriptedPlaces {
    pub fn new(origin: Option<(f64, f64)>) -> Self {
        Self {
            origin,
            nearby: Vec::new(),
            texts: HashMap::new(),
            details: HashMap::new(),
            failing: HashSet::new(),
            mode: PlacesMode::Normal,
            returned: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_nearby(mut self, found: Vec<DiscoveredCandidate>) -> Self {
        self.nearby = found;
        self
    }

    pub fn with_text(mut self, query: &str, found: Vec<DiscoveredCandidate>) -> Self {
        self.texts.insert(query.to_string(), found);
        self
    }

    pub fn with_detail(mut self, place_id: &str, details: PlaceDetails) -> Self {
        self.details.insert(place_id.to_string(), details);
        self
    }

    /// Every call fails as if the key were rejected.
    pub fn denying(mut self) -> Self {
        self.mode = PlacesMode::Denying;
        self
    }

    pub fn without_credential(mut self) -> Self {
        self.mode = PlacesMode::NoCredential;
        self
    }

    /// Make one text query fail with a transport error.
    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    /// Candidates handed out across all searches so far.
    pub fn raw_candidate_count(&self) -> usize {
        self.returned.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), GeoError> {
        match self.mode {
            PlacesMode::Normal => Ok(()),
            PlacesMode::Denying => Err(GeoError::RequestDenied("The provided API key is invalid.".into())),
            PlacesMode::NoCredential => Err(GeoError::MissingCredential),
        }
    }

    fn hand_out(&self, found: Vec<DiscoveredCandidate>) -> Vec<DiscoveredCandidate> {
        self.returned.fetch_add(found.len(), Ordering::SeqCst);
        found
    }
}

#[async_trait]
impl PlacesApi for ScriptedPlaces {
    async fn resolve_coordinates(&self, _postal_code: &str) -> Result<Option<(f64, f64)>, GeoError> {
        self.gate()?;
        Ok(self.origin)
    }

    async fn nearby_search(
        &self,
        _lat: f64,
        _lng: f64,
        _radius_miles: u32,
        _keyword: &str,
    ) -> Result<Vec<DiscoveredCandidate>, GeoError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        Ok(self.hand_out(self.nearby.clone()))
    }

    async fn text_search(&self, query: &str) -> Result<Vec<DiscoveredCandidate>, GeoError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        if self.failing.contains(query) {
            return Err(GeoError::Network("connection reset".into()));
        }
        Ok(self.hand_out(self.texts.get(query).cloned().unwrap_or_default()))
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, GeoError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        Ok(self.details.get(place_id).cloned().unwrap_or_default())
    }
}

/// Page fetcher serving canned HTML. Unknown URLs time out.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, String>,
    log: Mutex<Vec<(String, usize)>>,
}

impl ScriptedFetcher {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn attempts(&self) -> Vec<usize> {
        self.log.lock().unwrap().iter().map(|(_, attempt)| *attempt).collect()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, attempt: usize) -> Result<String, FetchError> {
        self.log.lock().unwrap().push((url.to_string(), attempt));
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Timeout(format!("no page scripted for {url}")))
    }
}

/// Durable tier whose every operation fails.
pub struct FailingStore;

impl CacheStore for FailingStore {
    fn load_search(&self, _cache_key: &str) -> Result<Option<SearchCacheEntry>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn save_search(&self, _entry: &SearchCacheEntry) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    fn load_detail(&self, _place_id: &str) -> Result<Option<BreweryDetailCacheEntry>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn save_detail(&self, _entry: &BreweryDetailCacheEntry) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    fn delete_expired_searches(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn delete_details_before(&self, _cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn delete_searches_for(&self, _postal_code: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn counts(
        &self,
        _now: DateTime<Utc>,
        _recent_since: DateTime<Utc>,
    ) -> Result<StoreCounts, StoreError> {
        Err(StoreError::Poisoned)
    }
}
