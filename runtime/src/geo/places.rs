//! Google Places web service client.
//!
//! Geocoding uses a text search for `"<postal code> USA"` and takes the first
//! hit's geometry, which avoids a second credential for the Geocoding API.

use super::dto::{self, DetailsResponse, PlaceResult, SearchResponse};
use super::{is_brewery_name, miles_to_meters, GeoError, PlaceDetails, PlacesApi};
use crate::config::PipelineConfig;
use crate::model::{Brewery, DiscoveredCandidate};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// HTTP client for the Places web service.
#[derive(Clone)]
pub struct GooglePlacesClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GooglePlacesClient {
    /// Create a client. A `None` key makes every call fail with
    /// [`GeoError::MissingCredential`].
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.places_api_key.clone(), config.places_base_url.clone())
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, GeoError> {
        let key = self.api_key.as_deref().ok_or(GeoError::MissingCredential)?;
        let url = format!("{}/{endpoint}/json", self.base_url);

        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("key", key.to_string()));

        let response = self
            .http_client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| GeoError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GeoError::Parse(e.to_string()))
    }

    async fn search(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<PlaceResult>, GeoError> {
        let response: SearchResponse = self.get_json(endpoint, params).await?;
        check_status(&response.status, response.error_message.as_deref())?;
        Ok(response.results)
    }
}

/// Map a provider status to success, a normal empty result, or an error.
fn check_status(status: &str, message: Option<&str>) -> Result<(), GeoError> {
    match status {
        dto::STATUS_OK | dto::STATUS_ZERO_RESULTS => Ok(()),
        dto::STATUS_REQUEST_DENIED => Err(GeoError::RequestDenied(
            message.unwrap_or("no message").to_string(),
        )),
        other => Err(GeoError::Status(match message {
            Some(m) => format!("{other}: {m}"),
            None => other.to_string(),
        })),
    }
}

/// Convert a search hit into a candidate, dropping non-brewery names.
fn to_candidate(place: PlaceResult) -> Option<DiscoveredCandidate> {
    let name = place.name?.trim().to_string();
    if name.is_empty() || !is_brewery_name(&name) {
        return None;
    }
    let address = place
        .vicinity
        .or(place.formatted_address)
        .unwrap_or_default();

    let mut brewery = Brewery::new(name, address);
    if let Some(geometry) = place.geometry {
        brewery.latitude = Some(geometry.location.lat);
        brewery.longitude = Some(geometry.location.lng);
    }
    brewery.rating = place.rating;

    Some(DiscoveredCandidate::new(brewery, place.place_id))
}

#[async_trait]
impl PlacesApi for GooglePlacesClient {
    async fn resolve_coordinates(&self, postal_code: &str) -> Result<Option<(f64, f64)>, GeoError> {
        let results = self
            .search("textsearch", &[("query", format!("{postal_code} USA"))])
            .await?;
        Ok(results
            .into_iter()
            .find_map(|r| r.geometry)
            .map(|g| (g.location.lat, g.location.lng)))
    }

    async fn nearby_search(
        &self,
        lat: f64,
        lng: f64,
        radius_miles: u32,
        keyword: &str,
    ) -> Result<Vec<DiscoveredCandidate>, GeoError> {
        let results = self
            .search(
                "nearbysearch",
                &[
                    ("location", format!("{lat},{lng}")),
                    ("radius", format!("{:.0}", miles_to_meters(radius_miles))),
                    ("type", "establishment".to_string()),
                    ("keyword", keyword.to_string()),
                ],
            )
            .await?;
        Ok(results.into_iter().filter_map(to_candidate).collect())
    }

    async fn text_search(&self, query: &str) -> Result<Vec<DiscoveredCandidate>, GeoError> {
        let results = self
            .search("textsearch", &[("query", query.to_string())])
            .await?;
        Ok(results.into_iter().filter_map(to_candidate).collect())
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, GeoError> {
        let response: DetailsResponse = self
            .get_json(
                "details",
                &[
                    ("place_id", place_id.to_string()),
                    (
                        "fields",
                        "website,formatted_phone_number,opening_hours".to_string(),
                    ),
                ],
            )
            .await?;
        check_status(&response.status, response.error_message.as_deref())?;

        let Some(result) = response.result else {
            return Ok(PlaceDetails::default());
        };
        Ok(PlaceDetails {
            website: result.website.filter(|w| !w.trim().is_empty()),
            phone: result.formatted_phone_number,
            weekday_text: result
                .opening_hours
                .map(|h| h.weekday_text)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_blank_key_is_treated_as_missing() {
        let client = GooglePlacesClient::new(Some("   ".into()), "http://localhost");
        assert!(!client.has_credential());
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status("OK", None).is_ok());
        assert!(check_status("ZERO_RESULTS", None).is_ok());
        assert!(matches!(
            check_status("REQUEST_DENIED", Some("bad key")),
            Err(GeoError::RequestDenied(m)) if m == "bad key"
        ));
        assert!(matches!(
            check_status("OVER_QUERY_LIMIT", None),
            Err(GeoError::Status(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        let client = GooglePlacesClient::new(None, server.uri());

        let err = client.text_search("brewery 94556").await.unwrap_err();
        assert!(matches!(err, GeoError::MissingCredential));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_search_filters_non_brewery_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .and(query_param("query", "brewery 94556"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "results": [
                    {
                        "name": "Hop Valley Brewing",
                        "place_id": "p1",
                        "formatted_address": "1 Hop St, Moraga, CA",
                        "geometry": {"location": {"lat": 37.83, "lng": -122.12}},
                        "rating": 4.4
                    },
                    {
                        "name": "Corner Coffee",
                        "place_id": "p2",
                        "formatted_address": "2 Bean St"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let client = GooglePlacesClient::new(Some("k".into()), server.uri());
        let candidates = client.text_search("brewery 94556").await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].brewery.name, "Hop Valley Brewing");
        assert_eq!(candidates[0].brewery.address, "1 Hop St, Moraga, CA");
        assert_eq!(candidates[0].brewery.coordinates(), Some((37.83, -122.12)));
        assert_eq!(candidates[0].place_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_zero_results_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearbysearch/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "ZERO_RESULTS", "results": []})),
            )
            .mount(&server)
            .await;

        let client = GooglePlacesClient::new(Some("k".into()), server.uri());
        let candidates = client
            .nearby_search(37.8, -122.1, 15, "brewery")
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_request_denied_is_distinct_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid.",
                "results": []
            })))
            .mount(&server)
            .await;

        let client = GooglePlacesClient::new(Some("bad".into()), server.uri());
        let err = client.resolve_coordinates("94556").await.unwrap_err();
        assert!(matches!(err, GeoError::RequestDenied(_)));
    }

    #[tokio::test]
    async fn test_nearby_search_sends_radius_in_meters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearbysearch/json"))
            .and(query_param("radius", "24140"))
            .and(query_param("keyword", "brewery"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "OK", "results": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = GooglePlacesClient::new(Some("k".into()), server.uri());
        client
            .nearby_search(37.8, -122.1, 15, "brewery")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_place_details_parses_contact_and_hours() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/details/json"))
            .and(query_param("place_id", "p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "result": {
                    "website": "https://hopvalley.example",
                    "formatted_phone_number": "(925) 555-0199",
                    "opening_hours": {"weekday_text": ["Monday: Closed", "Tuesday: 3–9 PM"]}
                }
            })))
            .mount(&server)
            .await;

        let client = GooglePlacesClient::new(Some("k".into()), server.uri());
        let details = client.place_details("p1").await.unwrap();
        assert_eq!(details.website.as_deref(), Some("https://hopvalley.example"));
        assert_eq!(details.phone.as_deref(), Some("(925) 555-0199"));
        assert_eq!(details.weekday_text.len(), 2);
    }
}
