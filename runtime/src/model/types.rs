//! Core brewery and beer types shared by discovery, scraping and the cache.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Availability label used when a page does not say otherwise.
pub const DEFAULT_AVAILABILITY: &str = "On Tap";

/// Format of [`Brewery::last_updated`].
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A beer currently on tap.
///
/// Values are only produced by the extraction pipeline (which validates
/// them) or by deserializing a cached brewery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beer {
    pub name: String,
    pub style: Option<String>,
    pub abv: Option<f64>,
    pub ibu: Option<u32>,
    pub description: Option<String>,
    pub price: Option<String>,
    #[serde(default = "default_availability")]
    pub availability: String,
}

impl Beer {
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: None,
            abv: None,
            ibu: None,
            description: None,
            price: None,
            availability: DEFAULT_AVAILABILITY.to_string(),
        }
    }
}

fn default_availability() -> String {
    DEFAULT_AVAILABILITY.to_string()
}

/// A brewery with location, contact details and its current tap list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brewery {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub hours: Option<String>,
    /// Great-circle distance from the search anchor. `f64::INFINITY` when
    /// coordinates are unknown; stored as `null`.
    #[serde(
        default = "unknown_distance",
        serialize_with = "serialize_distance",
        deserialize_with = "deserialize_distance"
    )]
    pub distance_miles: f64,
    #[serde(default)]
    pub beers: Vec<Beer>,
    pub last_updated: Option<String>,
}

impl Brewery {
    /// A brewery with only a name and address; everything else unknown.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            phone: None,
            website: None,
            latitude: None,
            longitude: None,
            rating: None,
            hours: None,
            distance_miles: f64::INFINITY,
            beers: Vec::new(),
            last_updated: None,
        }
    }

    /// Both coordinates, when known.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    pub fn has_known_distance(&self) -> bool {
        self.distance_miles.is_finite()
    }

    /// Stamp `last_updated` with the current local time.
    pub fn touch(&mut self) {
        self.last_updated = Some(chrono::Local::now().format(LAST_UPDATED_FORMAT).to_string());
    }
}

/// A discovered brewery still carrying the provider identifier needed for
/// detail lookups and the detail cache.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredCandidate {
    pub brewery: Brewery,
    pub place_id: Option<String>,
}

impl DiscoveredCandidate {
    pub fn new(brewery: Brewery, place_id: Option<String>) -> Self {
        Self { brewery, place_id }
    }

    /// Drop the provider linkage, keeping only the public brewery.
    pub fn into_brewery(self) -> Brewery {
        self.brewery
    }
}

fn unknown_distance() -> f64 {
    f64::INFINITY
}

fn serialize_distance<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_some(value)
    } else {
        serializer.serialize_none()
    }
}

fn deserialize_distance<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).unwrap_or(f64::INFINITY))
}
