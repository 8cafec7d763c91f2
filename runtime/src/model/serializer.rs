//! Output contract consumed by downstream reporting code, plus the cache
//! payload codec.
//!
//! The output shape is a stable boundary: distances are rounded to two
//! decimals (or `null` when unknown). The cache codec keeps full precision so
//! a cache hit reproduces exactly what the fresh acquisition returned.

use crate::model::types::{Beer, Brewery};
use serde_json::{json, Value};

/// Serialize one brewery into the public output shape.
pub fn brewery_to_json(brewery: &Brewery) -> Value {
    json!({
        "name": brewery.name,
        "address": brewery.address,
        "phone": brewery.phone,
        "website": brewery.website,
        "latitude": brewery.latitude,
        "longitude": brewery.longitude,
        "rating": brewery.rating,
        "hours": brewery.hours,
        "distance_miles": rounded_distance(brewery.distance_miles),
        "last_updated": brewery.last_updated,
        "beers": brewery.beers.iter().map(beer_to_json).collect::<Vec<_>>(),
    })
}

/// Serialize a brewery list into the public output shape.
pub fn serialize_breweries(breweries: &[Brewery]) -> Value {
    Value::Array(breweries.iter().map(brewery_to_json).collect())
}

fn beer_to_json(beer: &Beer) -> Value {
    json!({
        "name": beer.name,
        "style": beer.style,
        "abv": beer.abv,
        "ibu": beer.ibu,
        "description": beer.description,
        "price": beer.price,
        "availability": beer.availability,
    })
}

fn rounded_distance(miles: f64) -> Option<f64> {
    miles.is_finite().then(|| (miles * 100.0).round() / 100.0)
}

/// Encode breweries for cache storage.
pub fn encode_breweries(breweries: &[Brewery]) -> serde_json::Result<String> {
    serde_json::to_string(breweries)
}

/// Decode a cache payload into fresh brewery values.
pub fn decode_breweries(payload: &str) -> serde_json::Result<Vec<Brewery>> {
    serde_json::from_str(payload)
}

pub fn encode_brewery(brewery: &Brewery) -> serde_json::Result<String> {
    serde_json::to_string(brewery)
}

pub fn decode_brewery(payload: &str) -> serde_json::Result<Brewery> {
    serde_json::from_str(payload)
}
