//! Regex heuristics over page text.
//!
//! Measurement parsing (ABV, IBU, price), style classification, and the
//! plain-text fallback tiers used when a page has no usable structure.

use super::strategy::first_non_empty;
use super::validate::{accept, clean_name};
use crate::config::PipelineConfig;
use crate::model::Beer;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// A style line longer than this is treated as prose.
const MAX_STYLE_LINE_CHARS: usize = 40;
const MAX_STYLE_LINE_WORDS: usize = 4;
/// Descriptions shorter than this carry no information.
const MIN_DESCRIPTION_CHARS: usize = 10;

/// Substrings that make an element worth parsing as a beer.
pub const BEER_HINTS: &[&str] = &[
    "ipa", "ale", "lager", "stout", "porter", "wheat", "pils", "sour", "abv", "%",
];

/// Style vocabulary, most specific first.
const STYLE_PATTERNS: &[&str] = &[
    r"(?i)\b(?:american|english|belgian|german|imperial|double|session|hazy|west coast|new england)\s+(?:ipa|ale|lager|stout|porter|wheat)\b",
    r"(?i)\b(?:barrel.?aged|oak.?aged|bourbon.?barrel|wine.?barrel)\s+\w+",
    r"(?i)\b(?:fruited|dry.?hopped|cold.?brew|nitro)\s+\w+",
    r"(?i)\b(?:ipa|india pale ale|pale ale|lager|stout|porter|wheat|pils(?:ner)?|sour|saison|amber|brown ale|blonde|hefeweizen)\b",
];

/// Words kept uppercase when title-casing a style.
const UPPERCASE_STYLE_WORDS: &[&str] = &["ipa", "dipa", "neipa", "esb"];

macro_rules! cached_regex {
    ($name:ident, $pattern:expr, $what:literal) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect(concat!($what, " regex is valid")))
        }
    };
}

cached_regex!(
    abv_re,
    r"(?i)(\d+(?:\.\d+)?)\s*%?\s*abv\b|\babv\s*:?\s*(\d+(?:\.\d+)?)\s*%?",
    "abv"
);
cached_regex!(percent_re, r"(\d+(?:\.\d+)?)\s*%", "percent");
cached_regex!(
    ibu_re,
    r"(?i)(\d+)\s*ibus?\b|\bibus?\s*:?\s*(\d+)",
    "ibu"
);
cached_regex!(price_re, r"\$(\d+(?:\.\d{1,2})?)", "price");
cached_regex!(
    measurement_re,
    r"(?i)\s*(?:\d+(?:\.\d+)?\s*%?\s*(?:abv|ibus?)\b|\b(?:abv|ibus?)\s*:?\s*\d+(?:\.\d+)?\s*%?)\s*",
    "measurement"
);
cached_regex!(style_word_re, r"(?i)\bstyle\b", "style word");
cached_regex!(
    inline_split_re,
    r"\s+[-–|]\s+|\s*\(|\s+\d+(?:\.\d+)?\s*%",
    "inline split"
);

fn style_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        STYLE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("style regex is valid"))
            .collect()
    })
}

/// Plain-text tiers, most specific first:
/// 1. name / line naming a "Style" / ABV line
/// 2. name / line with a style keyword / ABV line
/// 3. name / ABV line
/// 4. short phrase followed on the same line by an ABV
fn text_tiers() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        const ABV_LINE: &str = r"(?P<abv>[^\n]*?\d+(?:\.\d+)?\s*(?:%|abv)[^\n]*)";
        let patterns = [
            format!(r"(?mi)^(?P<name>[^\n]{{3,60}})\n(?P<style>[^\n]*\bstyle\b[^\n]*)\n{ABV_LINE}$"),
            format!(
                r"(?mi)^(?P<name>[^\n]{{3,60}})\n(?P<style>[^\n]{{0,40}}\b(?:ipa|ale|lager|stout|porter|pils(?:ner)?|sour|saison|wheat|hefeweizen|amber|blonde|k[oö]lsch|gose|bock|tripel|dubbel|barleywine)\b[^\n]{{0,40}})\n{ABV_LINE}$"
            ),
            format!(r"(?mi)^(?P<name>[^\n]{{3,60}})\n{ABV_LINE}$"),
            r"(?mi)^(?P<name>[A-Za-z][^\n%$]{2,50}?)\s*[-–|:,(]?\s*(?P<abv>\d+(?:\.\d+)?\s*%)".to_string(),
        ];
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("text tier regex is valid"))
            .collect()
    })
}

fn first_group(caps: &Captures<'_>) -> Option<String> {
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
}

/// ABV from an explicit "abv" mention, e.g. `5.1% ABV` or `ABV: 5.1`.
pub fn parse_abv(text: &str) -> Option<f64> {
    abv_re()
        .captures(text)
        .and_then(|c| first_group(&c))
        .and_then(|v| v.parse().ok())
}

/// ABV from an explicit mention, falling back to any bare percentage.
pub fn parse_abv_loose(text: &str) -> Option<f64> {
    parse_abv(text).or_else(|| {
        percent_re()
            .captures(text)
            .and_then(|c| c[1].parse().ok())
    })
}

pub fn parse_ibu(text: &str) -> Option<u32> {
    ibu_re()
        .captures(text)
        .and_then(|c| first_group(&c))
        .and_then(|v| v.parse().ok())
}

/// First `$N` or `$N.NN` token, normalized to `"$N"` / `"$N.NN"`.
pub fn parse_price(text: &str) -> Option<String> {
    price_re().captures(text).map(|c| format!("${}", &c[1]))
}

pub fn has_measurement(text: &str) -> bool {
    abv_re().is_match(text) || percent_re().is_match(text) || ibu_re().is_match(text)
}

/// Remove ABV/IBU mentions from free text.
pub fn strip_measurements(text: &str) -> String {
    measurement_re().replace_all(text, " ").trim().to_string()
}

/// Title-case a style token, keeping acronyms like IPA uppercase.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            if UPPERCASE_STYLE_WORDS.contains(&lower.as_str()) {
                return lower.to_uppercase();
            }
            let mut out = String::with_capacity(lower.len());
            let mut at_start = true;
            for ch in lower.chars() {
                if at_start && ch.is_alphabetic() {
                    out.extend(ch.to_uppercase());
                } else {
                    out.push(ch);
                }
                at_start = !ch.is_alphanumeric();
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First style vocabulary match in `text`, title-cased.
pub fn classify_style(text: &str) -> Option<String> {
    style_res()
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| title_case(m.as_str()))
}

/// Whether a short line reads as a style label (e.g. `Czech-Style Pils`)
/// rather than a description or a measurement.
pub fn is_style_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty()
        || line.chars().count() > MAX_STYLE_LINE_CHARS
        || line.split_whitespace().count() > MAX_STYLE_LINE_WORDS
        || has_measurement(line)
        || price_re().is_match(line)
    {
        return false;
    }
    style_word_re().is_match(line) || style_res().iter().any(|re| re.is_match(line))
}

/// Split a one-line listing like `Hazy Daze - Hazy IPA 6.5%` into its name
/// and the remainder.
pub fn split_inline_name(line: &str) -> (String, Option<String>) {
    match inline_split_re().find(line) {
        Some(m) if m.start() > 0 => {
            let rest = line[m.start()..].trim_start_matches([' ', '-', '–', '|']).trim();
            (
                line[..m.start()].trim().to_string(),
                (!rest.is_empty()).then(|| rest.to_string()),
            )
        }
        _ => (line.trim().to_string(), None),
    }
}

/// Build a candidate from a name line and the detail lines that follow it.
///
/// The returned beer is cleaned but not yet validated.
pub fn beer_from_lines(raw_name: &str, details: &[String]) -> Option<Beer> {
    let name = clean_name(raw_name);
    if name.is_empty() {
        return None;
    }
    let all_text = std::iter::once(raw_name)
        .chain(details.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    let style_line = details.iter().position(|l| is_style_line(l));
    let style = style_line
        .map(|i| details[i].trim().to_string())
        .or_else(|| classify_style(&all_text));

    let description = details
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != style_line)
        .map(|(_, l)| strip_measurements(l))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let description = (description.chars().count() >= MIN_DESCRIPTION_CHARS).then_some(description);

    Some(Beer {
        style,
        abv: parse_abv(&all_text),
        ibu: parse_ibu(&all_text),
        description,
        price: parse_price(&all_text),
        ..Beer::named(name)
    })
}

fn beer_from_tier_match(caps: &Captures<'_>) -> Option<Beer> {
    let raw_name = caps.name("name")?.as_str().trim();
    if has_measurement(raw_name) || price_re().is_match(raw_name) {
        return None;
    }
    let name = clean_name(raw_name);
    let whole = caps.get(0)?.as_str();
    let abv_text = caps.name("abv").map(|m| m.as_str()).unwrap_or(whole);

    let style = match caps.name("style") {
        Some(m) if m.as_str().trim().chars().count() <= MAX_STYLE_LINE_CHARS => {
            Some(m.as_str().trim().to_string())
        }
        _ => classify_style(whole),
    };

    Some(Beer {
        style,
        abv: parse_abv_loose(abv_text),
        ibu: parse_ibu(whole),
        price: parse_price(whole),
        ..Beer::named(name)
    })
}

/// Plain-text fallback: run the tiers in order over the line-joined text and
/// return the validated beers of the first tier that yields any.
pub fn extract_from_text(lines: &[String], config: &PipelineConfig) -> Vec<Beer> {
    let text = lines.join("\n");
    first_non_empty(text_tiers(), |tier| {
        tier.captures_iter(&text)
            .filter_map(|caps| beer_from_tier_match(&caps))
            .filter_map(|beer| accept(beer, config))
            .collect()
    })
}
