//! Geocoding and places search.
//!
//! [`PlacesApi`] is the seam between discovery and the provider. The
//! production implementation is [`places::GooglePlacesClient`]; tests swap in
//! scripted implementations.

pub mod distance;
pub mod dto;
pub mod places;

use crate::model::DiscoveredCandidate;
use async_trait::async_trait;

/// Name fragments that mark a place as brewery-like.
pub const BREWERY_TOKENS: &[&str] = &["brew", "tap", "beer", "ale", "lager"];

/// Meters per statute mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// Contact and schedule details for one place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub website: Option<String>,
    pub phone: Option<String>,
    /// One entry per weekday, e.g. `"Monday: 3:00 – 9:00 PM"`.
    pub weekday_text: Vec<String>,
}

/// Errors raised by a places provider.
///
/// "No results" is not an error; providers return an empty list for it.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("no places API key configured")]
    MissingCredential,

    #[error("places request denied: {0}")]
    RequestDenied(String),

    #[error("places provider returned status {0}")]
    Status(String),

    #[error("places request failed: {0}")]
    Network(String),

    #[error("failed to parse places response: {0}")]
    Parse(String),
}

/// Geocoding and place search provider.
#[async_trait]
pub trait PlacesApi: Send + Sync {
    /// Resolve a postal code to `(lat, lng)`. `Ok(None)` when nothing matched.
    async fn resolve_coordinates(&self, postal_code: &str) -> Result<Option<(f64, f64)>, GeoError>;

    /// Keyword search around a point.
    async fn nearby_search(
        &self,
        lat: f64,
        lng: f64,
        radius_miles: u32,
        keyword: &str,
    ) -> Result<Vec<DiscoveredCandidate>, GeoError>;

    /// Free-text search.
    async fn text_search(&self, query: &str) -> Result<Vec<DiscoveredCandidate>, GeoError>;

    /// Contact details and opening hours for one place.
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, GeoError>;
}

/// Whether a place name looks like a brewery, taproom or beer bar.
pub fn is_brewery_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    BREWERY_TOKENS.iter().any(|token| lower.contains(token))
}

pub fn miles_to_meters(miles: u32) -> f64 {
    miles as f64 * METERS_PER_MILE
}
