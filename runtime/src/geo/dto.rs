//! Wire types for the Google Places web service.
//!
//! Every field the service may omit is optional; conversion into our own
//! types happens in [`crate::geo::places`].

use serde::Deserialize;

pub const STATUS_OK: &str = "OK";
pub const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";
pub const STATUS_REQUEST_DENIED: &str = "REQUEST_DENIED";

/// Response of `/textsearch/json` and `/nearbysearch/json`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceResult {
    pub name: Option<String>,
    pub place_id: Option<String>,
    /// Short address (nearby search).
    pub vicinity: Option<String>,
    /// Full address (text search).
    pub formatted_address: Option<String>,
    pub geometry: Option<Geometry>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Response of `/details/json`.
#[derive(Debug, Deserialize)]
pub struct DetailsResponse {
    pub status: String,
    pub result: Option<PlaceDetailResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceDetailResult {
    pub website: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub weekday_text: Vec<String>,
}
