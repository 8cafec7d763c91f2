//! Brewery discovery.
//!
//! Resolves a postal code, fans out over one nearby search and a fixed set of
//! text queries, then merges, ranks and caps the candidates. Only the capped
//! set is enriched with place details, one lookup at a time.

pub mod ranking;

use crate::config::PipelineConfig;
use crate::geo::{GeoError, PlacesApi};
use crate::model::DiscoveredCandidate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Keyword for the nearby search.
pub const NEARBY_KEYWORD: &str = "brewery";

/// Text queries issued after the nearby search, each suffixed with the postal code.
pub const TEXT_QUERY_PREFIXES: &[&str] = &["brewery", "brewpub", "taproom", "craft beer", "microbrewery"];

static MISSING_CREDENTIAL_LOGGED: AtomicBool = AtomicBool::new(false);

/// Finds breweries near a postal code.
pub struct BreweryDiscovery {
    places: Arc<dyn PlacesApi>,
    config: Arc<PipelineConfig>,
}

/// Outcome of a single search call inside discovery.
enum SearchStep {
    Found(Vec<DiscoveredCandidate>),
    Skipped,
    Abort,
}

impl BreweryDiscovery {
    pub fn new(places: Arc<dyn PlacesApi>, config: Arc<PipelineConfig>) -> Self {
        Self { places, config }
    }

    /// Ranked, enriched candidates, closest first. Empty on any
    /// configuration or provider failure.
    pub async fn discover(&self, postal_code: &str, radius_miles: u32) -> Vec<DiscoveredCandidate> {
        let origin = match self.places.resolve_coordinates(postal_code).await {
            Ok(Some(origin)) => origin,
            Ok(None) => {
                warn!(postal_code, "could not resolve postal code to coordinates");
                return Vec::new();
            }
            Err(e) => {
                report_geo_error(&e, "geocode");
                return Vec::new();
            }
        };

        let mut batches = Vec::with_capacity(TEXT_QUERY_PREFIXES.len() + 1);

        match classify(
            self.places
                .nearby_search(origin.0, origin.1, radius_miles, NEARBY_KEYWORD)
                .await,
            "nearby search",
        ) {
            SearchStep::Found(found) => batches.push(found),
            SearchStep::Skipped => {}
            SearchStep::Abort => return Vec::new(),
        }

        for prefix in TEXT_QUERY_PREFIXES {
            let query = format!("{prefix} {postal_code}");
            match classify(self.places.text_search(&query).await, "text search") {
                SearchStep::Found(found) => batches.push(found),
                SearchStep::Skipped => {}
                SearchStep::Abort => return Vec::new(),
            }
        }

        let raw: usize = batches.iter().map(Vec::len).sum();
        let mut ranked = ranking::rank(batches, origin, self.config.max_breweries);
        info!(
            postal_code,
            radius_miles,
            raw_candidates = raw,
            kept = ranked.len(),
            "discovery ranked candidates"
        );

        self.enrich(&mut ranked).await;
        ranked
    }

    /// Fetch details for each candidate, sequentially, with a fixed delay
    /// between lookups. Failures leave the candidate as it was.
    async fn enrich(&self, candidates: &mut [DiscoveredCandidate]) {
        let mut first = true;
        for candidate in candidates.iter_mut() {
            let Some(place_id) = candidate.place_id.clone() else {
                continue;
            };
            if !first && !self.config.detail_delay.is_zero() {
                tokio::time::sleep(self.config.detail_delay).await;
            }
            first = false;

            match self.places.place_details(&place_id).await {
                Ok(details) => ranking::apply_details(candidate, details),
                Err(e) => warn!(
                    brewery = %candidate.brewery.name,
                    error = %e,
                    "place details lookup failed"
                ),
            }
        }
    }
}

fn classify(
    result: Result<Vec<DiscoveredCandidate>, GeoError>,
    operation: &str,
) -> SearchStep {
    match result {
        Ok(found) => {
            debug!(operation, count = found.len(), "search returned candidates");
            SearchStep::Found(found)
        }
        Err(e @ (GeoError::RequestDenied(_) | GeoError::MissingCredential)) => {
            report_geo_error(&e, operation);
            SearchStep::Abort
        }
        Err(e) => {
            report_geo_error(&e, operation);
            SearchStep::Skipped
        }
    }
}

fn report_geo_error(e: &GeoError, operation: &str) {
    match e {
        GeoError::MissingCredential => {
            if !MISSING_CREDENTIAL_LOGGED.swap(true, Ordering::Relaxed) {
                warn!("GOOGLE_PLACES_API_KEY is not set; brewery discovery returns no results");
            }
        }
        GeoError::RequestDenied(_) => error!(operation, error = %e, "places provider denied the request"),
        _ => warn!(operation, error = %e, "places request failed"),
    }
}
