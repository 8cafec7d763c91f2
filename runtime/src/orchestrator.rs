//! End-to-end acquisition: cache, then discovery, then one polite scrape per
//! brewery, then write-through.

use crate::acquisition::TapListScraper;
use crate::cache::BreweryCache;
use crate::config::PipelineConfig;
use crate::discovery::BreweryDiscovery;
use crate::geo::places::GooglePlacesClient;
use crate::model::{Brewery, DiscoveredCandidate};
use anyhow::Context;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Produces the brewery list for a postal code and radius.
pub struct AcquisitionOrchestrator {
    cache: Arc<BreweryCache>,
    discovery: BreweryDiscovery,
    scraper: TapListScraper,
    config: Arc<PipelineConfig>,
}

impl AcquisitionOrchestrator {
    pub fn new(
        cache: Arc<BreweryCache>,
        discovery: BreweryDiscovery,
        scraper: TapListScraper,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            cache,
            discovery,
            scraper,
            config,
        }
    }

    /// Wire up the production collaborators.
    pub fn from_config(config: Arc<PipelineConfig>) -> anyhow::Result<Self> {
        let cache = BreweryCache::open(&config).with_context(|| {
            format!("failed to open cache at {}", config.cache_db_path.display())
        })?;
        let places = Arc::new(GooglePlacesClient::from_config(&config));
        Ok(Self::new(
            Arc::new(cache),
            BreweryDiscovery::new(places, Arc::clone(&config)),
            TapListScraper::new(Arc::clone(&config)),
            config,
        ))
    }

    pub fn cache(&self) -> &Arc<BreweryCache> {
        &self.cache
    }

    /// Breweries near `postal_code`, closest first, served from cache when
    /// a valid entry exists.
    pub async fn acquire(&self, postal_code: &str, radius_miles: u32) -> Vec<Brewery> {
        if let Some(cached) = self.cache.get_search(postal_code, radius_miles) {
            info!(postal_code, radius_miles, breweries = cached.len(), "serving cached search");
            return cached;
        }
        self.acquire_fresh(postal_code, radius_miles).await
    }

    /// Ranked, detail-enriched breweries without visiting any website.
    ///
    /// Tap lists stay empty and nothing is written to the search cache, so a
    /// later [`acquire`](Self::acquire) still scrapes.
    pub async fn discover_only(&self, postal_code: &str, radius_miles: u32) -> Vec<Brewery> {
        let breweries: Vec<Brewery> = self
            .discovery
            .discover(postal_code, radius_miles)
            .await
            .into_iter()
            .map(DiscoveredCandidate::into_brewery)
            .collect();
        info!(postal_code, radius_miles, breweries = breweries.len(), "discovery complete");
        breweries
    }

    /// Bypass the search cache, rediscover and rescrape. The result still
    /// replaces the cached entry.
    pub async fn acquire_fresh(&self, postal_code: &str, radius_miles: u32) -> Vec<Brewery> {
        let candidates = self.discovery.discover(postal_code, radius_miles).await;
        let total = candidates.len();
        let mut breweries = Vec::with_capacity(total);

        for (index, candidate) in candidates.into_iter().enumerate() {
            let (brewery, fetched) = self.fill_tap_list(candidate).await;
            breweries.push(brewery);

            if fetched && index + 1 < total {
                let pause = politeness_delay(&self.config);
                if !pause.is_zero() {
                    debug!(pause_ms = pause.as_millis() as u64, "pausing between breweries");
                    tokio::time::sleep(pause).await;
                }
            }
        }

        let with_beers = breweries.iter().filter(|b| !b.beers.is_empty()).count();
        info!(
            postal_code,
            radius_miles,
            breweries = breweries.len(),
            with_beers,
            "acquisition complete"
        );
        self.cache.put_search(postal_code, radius_miles, &breweries);
        breweries
    }

    /// Attach beers to one brewery. The flag is set when its website was
    /// actually visited.
    async fn fill_tap_list(&self, candidate: DiscoveredCandidate) -> (Brewery, bool) {
        let DiscoveredCandidate {
            mut brewery,
            place_id,
        } = candidate;

        if let Some(cached) = place_id
            .as_deref()
            .and_then(|id| self.cache.get_brewery_detail(id))
            .filter(|cached| !cached.beers.is_empty())
        {
            debug!(brewery = %brewery.name, beers = cached.beers.len(), "reusing cached tap list");
            brewery.beers = cached.beers;
            brewery.last_updated = cached.last_updated;
            return (brewery, false);
        }

        let fetched = brewery.website.is_some();
        brewery.beers = match self.scraper.scrape(brewery.website.as_deref()).await {
            Ok(outcome) => outcome.into_beers(),
            Err(e) => {
                warn!(brewery = %brewery.name, error = %e, "tap list scrape failed");
                Vec::new()
            }
        };
        brewery.touch();

        if let Some(id) = place_id.as_deref() {
            self.cache.put_brewery_detail(&brewery, id);
        }
        (brewery, fetched)
    }
}

fn politeness_delay(config: &PipelineConfig) -> Duration {
    let (min, max) = (config.min_delay, config.max_delay);
    if max <= min {
        return min;
    }
    let secs = rand::thread_rng().gen_range(min.as_secs_f64()..max.as_secs_f64());
    Duration::try_from_secs_f64(secs).unwrap_or(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::SqliteStore;
    use crate::cache::{ManualClock, SystemClock};
    use crate::fixtures::{
        candidate, test_config, FailingStore, ScriptedFetcher, ScriptedPlaces, BETA_TESTED_PAGE,
    };
    use crate::geo::PlaceDetails;
    use crate::model::serializer::serialize_breweries;
    use crate::model::Beer;
    use chrono::Utc;
    use std::sync::atomic::Ordering;

    const MORAGA: (f64, f64) = (37.8349, -122.1297);

    fn site(url: &str) -> PlaceDetails {
        PlaceDetails {
            website: Some(url.to_string()),
            ..PlaceDetails::default()
        }
    }

    fn places() -> ScriptedPlaces {
        ScriptedPlaces::new(Some(MORAGA))
            .with_nearby(vec![
                candidate("Hop Valley Brewing", Some((37.836, -122.128)), "p-hop"),
                candidate("Fogbelt Brewing", Some((37.90, -122.06)), "p-fog"),
                candidate("Unmapped Ale House", None, "p-unk"),
            ])
            .with_detail("p-hop", site("https://hopvalley.example/"))
            .with_detail("p-fog", site("https://fogbelt.example/"))
    }

    struct Rig {
        orchestrator: AcquisitionOrchestrator,
        places: Arc<ScriptedPlaces>,
        primary: Arc<ScriptedFetcher>,
        fallback: Arc<ScriptedFetcher>,
    }

    fn rig_with_cache(places: ScriptedPlaces, cache: BreweryCache) -> Rig {
        rig_with(places, cache, test_config())
    }

    fn rig_with(places: ScriptedPlaces, cache: BreweryCache, config: PipelineConfig) -> Rig {
        let config = Arc::new(config);
        let places = Arc::new(places);
        let primary = Arc::new(
            ScriptedFetcher::default().with_page("https://hopvalley.example/", BETA_TESTED_PAGE),
        );
        let fallback = Arc::new(ScriptedFetcher::default());
        let orchestrator = AcquisitionOrchestrator::new(
            Arc::new(cache),
            BreweryDiscovery::new(places.clone(), Arc::clone(&config)),
            TapListScraper::with_fetchers(primary.clone(), fallback.clone(), Arc::clone(&config)),
            config,
        );
        Rig {
            orchestrator,
            places,
            primary,
            fallback,
        }
    }

    fn memory_cache() -> BreweryCache {
        BreweryCache::new(
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            Arc::new(ManualClock::new(Utc::now())),
            &test_config(),
        )
    }

    fn rig(places: ScriptedPlaces) -> Rig {
        rig_with_cache(places, memory_cache())
    }

    #[tokio::test]
    async fn test_failed_scrape_is_isolated_and_search_is_cached() {
        let r = rig(places());
        let breweries = r.orchestrator.acquire("94556", 15).await;

        let names: Vec<&str> = breweries.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Hop Valley Brewing", "Fogbelt Brewing", "Unmapped Ale House"]);
        assert_eq!(breweries[0].beers[0].name, "Beta Tested");
        assert!(breweries[1].beers.is_empty());
        assert!(breweries[2].beers.is_empty());
        assert!(breweries.iter().all(|b| b.last_updated.is_some()));

        let cached = r.orchestrator.cache().get_search("94556", 15).unwrap();
        assert_eq!(cached.len(), 3);
        assert_eq!(cached[0].beers, breweries[0].beers);
        assert!(cached[2].distance_miles.is_infinite());
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache_verbatim() {
        let r = rig(places());
        let first = r.orchestrator.acquire("94556", 15).await;
        let searches = r.places.search_calls.load(Ordering::SeqCst);
        let fetches = r.primary.call_count() + r.fallback.call_count();

        let second = r.orchestrator.acquire("94556", 15).await;
        assert_eq!(
            serialize_breweries(&first).to_string(),
            serialize_breweries(&second).to_string()
        );
        assert_eq!(r.places.search_calls.load(Ordering::SeqCst), searches);
        assert_eq!(r.primary.call_count() + r.fallback.call_count(), fetches);
    }

    #[tokio::test]
    async fn test_breweries_without_websites_are_not_fetched() {
        let r = rig(ScriptedPlaces::new(Some(MORAGA)).with_nearby(vec![
            candidate("Quiet Brewing", Some((37.84, -122.13)), "p-q1"),
            candidate("Offline Taproom", Some((37.85, -122.13)), "p-q2"),
        ]));
        let breweries = r.orchestrator.acquire("94556", 15).await;

        assert_eq!(breweries.len(), 2);
        assert_eq!(r.primary.call_count(), 0);
        assert_eq!(r.fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fresh_detail_cache_skips_scrape() {
        let cache = memory_cache();
        let mut known = Brewery::new("Fogbelt Brewing", "");
        known.beers.push(Beer::named("Marine Layer"));
        known.last_updated = Some("2026-10-18 12:00:00".into());
        cache.put_brewery_detail(&known, "p-fog");

        let r = rig_with_cache(places(), cache);
        let breweries = r.orchestrator.acquire("94556", 15).await;

        let fog = breweries.iter().find(|b| b.name == "Fogbelt Brewing").unwrap();
        assert_eq!(fog.beers[0].name, "Marine Layer");
        assert_eq!(fog.last_updated.as_deref(), Some("2026-10-18 12:00:00"));
        assert!(!r
            .primary
            .calls()
            .iter()
            .any(|url| url.contains("fogbelt")));
    }

    #[tokio::test]
    async fn test_cached_tap_lists_skip_politeness_pause() {
        let cache = memory_cache();
        for (name, id) in [("Hop Valley Brewing", "p-hop"), ("Fogbelt Brewing", "p-fog")] {
            let mut known = Brewery::new(name, "");
            known.beers.push(Beer::named("Marine Layer"));
            cache.put_brewery_detail(&known, id);
        }
        let config = PipelineConfig {
            min_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
            ..test_config()
        };
        let places = ScriptedPlaces::new(Some(MORAGA))
            .with_nearby(vec![
                candidate("Hop Valley Brewing", Some((37.836, -122.128)), "p-hop"),
                candidate("Fogbelt Brewing", Some((37.90, -122.06)), "p-fog"),
            ])
            .with_detail("p-hop", site("https://hopvalley.example/"))
            .with_detail("p-fog", site("https://fogbelt.example/"));
        let r = rig_with(places, cache, config);

        let breweries = tokio::time::timeout(
            Duration::from_secs(5),
            r.orchestrator.acquire("94556", 15),
        )
        .await
        .expect("no pause without a fetch");
        assert_eq!(breweries.len(), 2);
        assert_eq!(r.primary.call_count() + r.fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_discover_only_never_fetches_or_caches() {
        let r = rig(places());
        let breweries = r.orchestrator.discover_only("94556", 15).await;

        let names: Vec<&str> = breweries.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Hop Valley Brewing", "Fogbelt Brewing", "Unmapped Ale House"]);
        assert_eq!(breweries[0].website.as_deref(), Some("https://hopvalley.example/"));
        assert!(breweries.iter().all(|b| b.beers.is_empty()));
        assert_eq!(r.primary.call_count(), 0);
        assert_eq!(r.fallback.call_count(), 0);
        assert!(r.orchestrator.cache().get_search("94556", 15).is_none());
    }

    #[tokio::test]
    async fn test_fresh_flag_bypasses_search_cache() {
        let r = rig(places());
        r.orchestrator.acquire("94556", 15).await;
        let searches = r.places.search_calls.load(Ordering::SeqCst);

        r.orchestrator.acquire_fresh("94556", 15).await;
        assert!(r.places.search_calls.load(Ordering::SeqCst) > searches);
    }

    #[tokio::test]
    async fn test_broken_store_still_returns_results() {
        let cache = BreweryCache::new(Arc::new(FailingStore), Arc::new(SystemClock), &test_config());
        let r = rig_with_cache(places(), cache);
        let breweries = r.orchestrator.acquire("94556", 15).await;
        assert_eq!(breweries.len(), 3);
        assert_eq!(breweries[0].beers.len(), 1);
    }

    #[test]
    fn test_politeness_delay_within_bounds() {
        let mut config = test_config();
        config.min_delay = Duration::from_millis(1000);
        config.max_delay = Duration::from_millis(3000);
        for _ in 0..50 {
            let d = politeness_delay(&config);
            assert!(d >= config.min_delay && d <= config.max_delay);
        }
        config.max_delay = config.min_delay;
        assert_eq!(politeness_delay(&config), config.min_delay);
    }
}
