//! Pure merge, dedupe and ranking steps of discovery.

use crate::geo::distance::haversine_miles;
use crate::geo::PlaceDetails;
use crate::model::DiscoveredCandidate;
use std::collections::HashSet;

/// Weekday entries kept when the provider returns a full week.
const HOURS_SAMPLE_LEN: usize = 3;

/// Concatenate search batches in order, keeping the first candidate seen for
/// each case-insensitive name.
pub fn merge_unique<I>(batches: I) -> Vec<DiscoveredCandidate>
where
    I: IntoIterator<Item = Vec<DiscoveredCandidate>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for candidate in batches.into_iter().flatten() {
        if seen.insert(candidate.brewery.name.trim().to_lowercase()) {
            merged.push(candidate);
        }
    }
    merged
}

/// Set `distance_miles` from `origin`, or `+inf` when coordinates are unknown.
pub fn assign_distances(candidates: &mut [DiscoveredCandidate], origin: (f64, f64)) {
    for candidate in candidates.iter_mut() {
        candidate.brewery.distance_miles = match candidate.brewery.coordinates() {
            Some(point) => haversine_miles(origin, point),
            None => f64::INFINITY,
        };
    }
}

/// Stable ascending sort by distance; unknown distances end up last.
pub fn sort_by_distance(candidates: &mut [DiscoveredCandidate]) {
    candidates.sort_by(|a, b| a.brewery.distance_miles.total_cmp(&b.brewery.distance_miles));
}

/// Merge, measure, sort and cap.
pub fn rank(
    batches: Vec<Vec<DiscoveredCandidate>>,
    origin: (f64, f64),
    cap: usize,
) -> Vec<DiscoveredCandidate> {
    let mut candidates = merge_unique(batches);
    assign_distances(&mut candidates, origin);
    sort_by_distance(&mut candidates);
    candidates.truncate(cap);
    candidates
}

/// Compress weekday opening hours for display.
///
/// A full week is shortened to its first three days; a partial schedule is
/// joined as-is.
pub fn format_opening_hours(weekday_text: &[String]) -> Option<String> {
    let entries: Vec<&str> = weekday_text
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if entries.is_empty() {
        return None;
    }
    let shown = if entries.len() == 7 {
        &entries[..HOURS_SAMPLE_LEN]
    } else {
        &entries[..]
    };
    Some(shown.join(", "))
}

/// Copy looked-up details onto a candidate without erasing known fields.
pub fn apply_details(candidate: &mut DiscoveredCandidate, details: PlaceDetails) {
    let brewery = &mut candidate.brewery;
    if details.website.is_some() {
        brewery.website = details.website;
    }
    if details.phone.is_some() {
        brewery.phone = details.phone;
    }
    if let Some(hours) = format_opening_hours(&details.weekday_text) {
        brewery.hours = Some(hours);
    }
}
