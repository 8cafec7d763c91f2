//! Ordered fallback plumbing shared by the scraper and the extractors.

use url::Url;

/// One fetch-and-extract attempt in the scraper's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Async client, browser headers, rotating User-Agent.
    Primary,
    /// Blocking client with a different header set.
    Fallback,
    /// Primary client against URL variants of the site.
    AlternativeEndpoints,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::AlternativeEndpoints => "alternative-endpoints",
        }
    }
}

/// Strategies in the order they are tried.
pub const STRATEGY_ORDER: [Strategy; 3] = [
    Strategy::Primary,
    Strategy::Fallback,
    Strategy::AlternativeEndpoints,
];

/// Run `run` over `steps` in order and return the first non-empty output.
pub fn first_non_empty<S, T>(steps: &[S], mut run: impl FnMut(&S) -> Vec<T>) -> Vec<T> {
    for step in steps {
        let out = run(step);
        if !out.is_empty() {
            return out;
        }
    }
    Vec::new()
}

/// URL variants tried by [`Strategy::AlternativeEndpoints`], in order:
/// trailing slash toggled, scheme swapped, then each suffix appended to the
/// page path. The original URL itself is never included.
pub fn alternative_urls(url: &str, suffixes: &[String]) -> Vec<String> {
    let Ok(parsed) = Url::parse(url) else {
        return Vec::new();
    };
    let original = parsed.as_str().to_string();
    let mut variants: Vec<String> = Vec::new();
    let mut push = |candidate: Url| {
        let candidate = candidate.to_string();
        if candidate != original && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    };

    let path = parsed.path().to_string();
    if path.len() > 1 {
        let mut toggled = parsed.clone();
        if path.ends_with('/') {
            toggled.set_path(path.trim_end_matches('/'));
        } else {
            toggled.set_path(&format!("{path}/"));
        }
        push(toggled);
    }

    let swapped_scheme = match parsed.scheme() {
        "https" => Some("http"),
        "http" => Some("https"),
        _ => None,
    };
    if let Some(scheme) = swapped_scheme {
        let mut swapped = parsed.clone();
        if swapped.set_scheme(scheme).is_ok() {
            push(swapped);
        }
    }

    let base_path = path.trim_end_matches('/');
    for suffix in suffixes {
        let mut candidate = parsed.clone();
        candidate.set_query(None);
        candidate.set_fragment(None);
        candidate.set_path(&format!("{base_path}/{}", suffix.trim_start_matches('/')));
        push(candidate);
    }

    variants
}
