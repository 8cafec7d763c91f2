//! Name cleanup and candidate validation.
//!
//! Every extraction path funnels its candidates through [`accept`] so the
//! same rules apply regardless of where a beer was found.

use crate::config::PipelineConfig;
use crate::model::Beer;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Shortest acceptable beer name, in characters.
pub const MIN_NAME_CHARS: usize = 3;

const NON_NAME_TOKENS: &[&str] = &["yes", "no", "y", "n", "true", "false", "n/a", "none"];

fn prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:tap\s*#?\d+\s*[:.-]?\s*|on\s+tap\s*:?\s*|#\d+[.):]?\s+|\d+\s*[.):]\s*)")
            .expect("name prefix regex is valid")
    })
}

fn suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s*[-–]\s*(?:draft|on\s+tap|available)\s*$")
            .expect("name suffix regex is valid")
    })
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a raw candidate name: collapse whitespace, drop tap-number and
/// ordinal prefixes, drop availability suffixes.
pub fn clean_name(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let without_prefix = prefix_re().replace(&collapsed, "");
    let without_suffix = suffix_re().replace(&without_prefix, "");
    without_suffix.trim().to_string()
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `name` contains `keyword` as a whole word or word sequence.
fn contains_phrase(name_words: &[String], keyword: &str) -> bool {
    let needle = words(keyword);
    if needle.is_empty() || needle.len() > name_words.len() {
        return false;
    }
    name_words.windows(needle.len()).any(|w| w == needle.as_slice())
}

fn is_non_name_token(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower.parse::<f64>().is_ok() || NON_NAME_TOKENS.contains(&lower.as_str())
}

/// Why a candidate was rejected, for debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooShort,
    NotAName,
    Navigation,
    City,
    AbvOutOfRange,
    IbuOutOfRange,
}

/// Check a cleaned candidate against the validation rules.
pub fn check(beer: &Beer, config: &PipelineConfig) -> Result<(), Rejection> {
    let name = beer.name.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(Rejection::TooShort);
    }
    if is_non_name_token(name) {
        return Err(Rejection::NotAName);
    }

    let name_words = words(name);
    if config
        .non_beer_keywords
        .iter()
        .any(|k| contains_phrase(&name_words, k))
    {
        return Err(Rejection::Navigation);
    }
    let lower = name.to_lowercase();
    if config.city_blocklist.iter().any(|c| c.eq_ignore_ascii_case(&lower)) {
        return Err(Rejection::City);
    }

    if let Some(abv) = beer.abv {
        let (min, max) = config.abv_range;
        if !(min..=max).contains(&abv) {
            return Err(Rejection::AbvOutOfRange);
        }
    }
    if let Some(ibu) = beer.ibu {
        let (min, max) = config.ibu_range;
        if !(min..=max).contains(&ibu) {
            return Err(Rejection::IbuOutOfRange);
        }
    }
    Ok(())
}

/// Keep `beer` if it passes validation.
pub fn accept(beer: Beer, config: &PipelineConfig) -> Option<Beer> {
    match check(&beer, config) {
        Ok(()) => Some(beer),
        Err(reason) => {
            tracing::trace!(name = %beer.name, ?reason, "rejected beer candidate");
            None
        }
    }
}

/// Drop case-insensitive duplicate names, keeping the first, then cap.
pub fn dedupe_and_cap(beers: Vec<Beer>, cap: usize) -> Vec<Beer> {
    let mut seen = HashSet::new();
    beers
        .into_iter()
        .filter(|b| seen.insert(b.name.trim().to_lowercase()))
        .take(cap)
        .collect()
}
