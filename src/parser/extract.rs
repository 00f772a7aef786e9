//! Image URL extraction and validation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

/// Absolute http(s) URLs whose path ends in a PNG or JPEG extension.
/// Query strings and fragments are never part of a match.
#[allow(clippy::expect_used)]
static IMAGE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'?#]+\.(?:png|jpe?g)\b"#).expect("image URL regex is valid") // Static pattern, safe to panic
});

/// Result of running extraction over a block of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedUrls {
    /// Valid candidates in the order they appear, duplicates included.
    pub urls: Vec<String>,
    /// Matches rejected by URL validation.
    pub invalid: Vec<String>,
}

/// Finds every image URL in `text`.
///
/// Each match is checked with the `url` crate: it must be absolute, use
/// http or https and have a host. The matched text is kept as written,
/// without normalization.
///
/// # Examples
///
/// ```
/// use librarycache_core::parser::extract_image_urls;
///
/// let found = extract_image_urls(r#"{"img":"https://img.rec.net/a.png?w=10"}"#);
/// assert_eq!(found.urls, vec!["https://img.rec.net/a.png"]);
/// ```
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
#[must_use]
pub fn extract_image_urls(text: &str) -> ExtractedUrls {
    let mut found = ExtractedUrls::default();

    for m in IMAGE_URL_PATTERN.find_iter(text) {
        let candidate = m.as_str();
        trace!(url = %candidate, "found URL candidate");
        if is_valid_image_url(candidate) {
            found.urls.push(candidate.to_string());
        } else {
            debug!(url = %candidate, "URL validation failed");
            found.invalid.push(candidate.to_string());
        }
    }

    found
}

fn is_valid_image_url(raw: &str) -> bool {
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };
    matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some()
}

/// Removes duplicates ignoring ASCII case, keeping the first spelling and order.
///
/// # Examples
///
/// ```
/// use librarycache_core::parser::dedup_case_insensitive;
///
/// let urls = vec![
///     "http://x/A.png".to_string(),
///     "http://x/a.png".to_string(),
///     "http://x/b.jpg".to_string(),
/// ];
/// assert_eq!(dedup_case_insensitive(urls), vec!["http://x/A.png", "http://x/b.jpg"]);
/// ```
#[must_use]
pub fn dedup_case_insensitive(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter()
        .filter(|url| seen.insert(url.to_ascii_lowercase()))
        .collect()
}
