//! URL discovery and classification.

use std::sync::LazyLock;

use regex_lite::Regex;
use url::Url;

/// Default mirror that serves social posts in a fetchable form.
pub const DEFAULT_MIRROR_BASE: &str = "https://xcancel.com";

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>()\[\]{}"']+"#).ok());

/// All http(s) URLs in `text`, deduplicated, in first-occurrence order.
///
/// A URL runs until whitespace or one of `< > ( ) [ ] { } " '`.
pub fn extract_urls(text: &str) -> Vec<String> {
    let Some(pattern) = URL_PATTERN.as_ref() else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for m in pattern.find_iter(text) {
        if !urls.iter().any(|u| u == m.as_str()) {
            urls.push(m.as_str().to_string());
        }
    }
    urls
}

/// Whether `url` points at a post on x.com or twitter.com (with or without
/// `www.`). Unparseable input is never a tweet.
pub fn is_tweet_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    host == "x.com" || host == "twitter.com"
}

/// Rewrite `url` onto the mirror host, keeping only its path.
///
/// Query strings and fragments are dropped. `None` when `url` does not parse.
pub fn to_mirror_url(url: &str, mirror_base: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    Some(format!("{}{}", mirror_base.trim_end_matches('/'), parsed.path()))
}
