pub mod calendar;
pub mod chat;
pub mod mail;

use regex::Regex;
use std::sync::OnceLock;

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s<>\)\]\"']+").unwrap())
}

/// Extract URLs from explicit fields first (order preserved), then scan the
/// body for additional URLs via regex. Deduplicated, order-preserving.
pub(crate) fn extract_urls(explicit: &[Option<&str>], body: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for url in explicit.iter().flatten() {
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }
    for m in url_regex().find_iter(body) {
        let url = m.as_str().to_string();
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }
    urls
}
