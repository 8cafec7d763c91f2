//! Brewery/beer data model and its serialized forms.

pub mod serializer;
pub mod types;

pub use types::{Beer, Brewery, DiscoveredCandidate};
