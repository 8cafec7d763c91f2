//! Layered tap-list extraction from HTML.
//!
//! Three layers run in order and the first that yields a valid beer wins:
//! beer-list sections under matching headings, CSS selector candidates, and
//! the plain-text regex tiers. Site chrome (`nav`, `header`, `footer`) is
//! ignored by every layer.
//!
//! `scraper::Html` is `!Send`; call [`extract_beers`] from
//! `tokio::task::spawn_blocking` when running inside the async runtime.

use super::strategy::first_non_empty;
use super::text_patterns::{self, beer_from_lines, split_inline_name, BEER_HINTS};
use super::validate::{accept, collapse_whitespace, dedupe_and_cap};
use crate::config::PipelineConfig;
use crate::model::Beer;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::OnceLock;

/// Heading text that introduces a beer list.
pub const SECTION_INDICATORS: &[&str] = &[
    "signature beer",
    "beer list",
    "on tap",
    "tap list",
    "our beers",
    "current beers",
    "draft list",
];

/// Selector candidates, most specific first.
pub const BEER_SELECTORS: &[&str] = &[
    ".beer-item",
    ".tap-list-item",
    ".beer-card",
    ".menu-item",
    ".beer",
    ".tap",
    ".brew",
    ".ale",
    ".lager",
    "tr",
    "li",
];

const CHROME_TAGS: &[&str] = &["nav", "header", "footer"];
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section",
    "table", "tbody", "td", "th", "thead", "tr", "ul",
];

/// Shortest element text worth inspecting.
const MIN_ELEMENT_TEXT: usize = 5;

type Layer = fn(&Html, &PipelineConfig) -> Vec<Beer>;

/// Extract, validate, dedupe and cap the beers on a page.
pub fn extract_beers(html: &str, config: &PipelineConfig) -> Vec<Beer> {
    let document = Html::parse_document(html);
    let layers: [Layer; 3] = [from_sections, from_selectors, from_text];
    let beers = first_non_empty(&layers, |layer| layer(&document, config));
    dedupe_and_cap(beers, config.max_beers)
}

fn heading_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("h1, h2, h3, h4").expect("heading selector is valid"))
}

fn body_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("body").expect("body selector is valid"))
}

fn heading_rank(element: ElementRef<'_>) -> Option<u8> {
    match element.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn in_chrome(element: ElementRef<'_>) -> bool {
    CHROME_TAGS.contains(&element.value().name())
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| CHROME_TAGS.contains(&a.value().name()))
}

fn contains_heading(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| heading_rank(d).is_some())
}

fn collect_text(element: ElementRef<'_>, buf: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_TAGS.contains(&name) || CHROME_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    buf.push('\n');
                }
                collect_text(child_el, buf);
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Visible text of an element split into non-empty, whitespace-collapsed
/// lines, one per block element.
pub fn visible_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut buf = String::new();
    collect_text(element, &mut buf);
    buf.lines()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Pair each sub-heading with the text lines that follow it until the next
/// heading. Returns `true` when a heading of `section_rank` or higher closes
/// the section.
fn walk_section<'a>(
    nodes: impl Iterator<Item = ElementRef<'a>>,
    section_rank: u8,
    entries: &mut Vec<(String, Vec<String>)>,
) -> bool {
    for node in nodes {
        if in_chrome(node) || HIDDEN_TAGS.contains(&node.value().name()) {
            continue;
        }
        match heading_rank(node) {
            Some(rank) if rank <= section_rank => return true,
            Some(_) => entries.push((element_text(node), Vec::new())),
            None if contains_heading(node) => {
                let children = node.children().filter_map(ElementRef::wrap);
                if walk_section(children, section_rank, entries) {
                    return true;
                }
            }
            None => {
                if let Some((_, lines)) = entries.last_mut() {
                    lines.extend(visible_lines(node));
                }
            }
        }
    }
    false
}

fn is_section_heading(heading: ElementRef<'_>) -> bool {
    let title = element_text(heading).to_lowercase();
    SECTION_INDICATORS.iter().any(|i| title.contains(i))
}

fn from_sections(document: &Html, config: &PipelineConfig) -> Vec<Beer> {
    let mut beers = Vec::new();
    for heading in document.select(heading_selector()) {
        if in_chrome(heading) || !is_section_heading(heading) {
            continue;
        }
        let Some(rank) = heading_rank(heading) else {
            continue;
        };

        let mut entries = Vec::new();
        let siblings = heading.next_siblings().filter_map(ElementRef::wrap);
        walk_section(siblings, rank, &mut entries);

        // Headings wrapped in their own container: continue after the wrapper.
        if entries.is_empty() {
            if let Some(parent) = heading.parent().and_then(ElementRef::wrap) {
                let siblings = parent.next_siblings().filter_map(ElementRef::wrap);
                walk_section(siblings, rank, &mut entries);
            }
        }

        beers.extend(
            entries
                .iter()
                .filter_map(|(name, lines)| beer_from_lines(name, lines))
                .filter_map(|beer| accept(beer, config)),
        );
    }
    beers
}

fn beer_from_element(element: ElementRef<'_>) -> Option<Beer> {
    let lines = visible_lines(element);
    let joined = lines.join("\n");
    if joined.chars().count() < MIN_ELEMENT_TEXT {
        return None;
    }
    let lower = joined.to_lowercase();
    if !BEER_HINTS.iter().any(|hint| lower.contains(hint)) {
        return None;
    }

    let (first, rest) = lines.split_first()?;
    if rest.is_empty() {
        let (name, remainder) = split_inline_name(first);
        let details: Vec<String> = remainder.into_iter().collect();
        return beer_from_lines(&name, &details);
    }
    beer_from_lines(first, rest)
}

fn from_selectors(document: &Html, config: &PipelineConfig) -> Vec<Beer> {
    let selectors: Vec<Selector> = BEER_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();

    first_non_empty(&selectors, |selector| {
        document
            .select(selector)
            .filter(|el| !in_chrome(*el))
            .filter_map(beer_from_element)
            .filter_map(|beer| accept(beer, config))
            .collect()
    })
}

fn from_text(document: &Html, config: &PipelineConfig) -> Vec<Beer> {
    let root = document
        .select(body_selector())
        .next()
        .unwrap_or_else(|| document.root_element());
    text_patterns::extract_from_text(&visible_lines(root), config)
}
