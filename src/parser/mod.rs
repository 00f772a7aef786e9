//! Library file parsing: raw bytes to a deduplicated list of image URLs.
//!
//! The Library file is a binary cache with URLs embedded as plain ASCII.
//! The bytes are decoded lossily (anything above 0x7F becomes `?`), scanned
//! for PNG/JPEG URLs and deduplicated case-insensitively.
//!
//! # Example
//!
//! ```
//! use librarycache_core::parser::parse_library;
//!
//! let bytes = b"\x00https://x.io/a.png\xff https://X.IO/A.PNG https://x.io/b.jpg";
//! let parsed = parse_library(bytes);
//! assert_eq!(parsed.links, vec!["https://x.io/a.png", "https://x.io/b.jpg"]);
//! assert_eq!(parsed.duplicates, 1);
//! ```

mod extract;

pub use extract::{ExtractedUrls, dedup_case_insensitive, extract_image_urls};

use tracing::{debug, instrument};

/// Links found in a Library file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Unique links in first-seen order.
    pub links: Vec<String>,
    /// How many matches were dropped as case-insensitive duplicates.
    pub duplicates: usize,
    /// Matches that failed URL validation.
    pub invalid: Vec<String>,
}

impl ParseResult {
    /// Returns true if no links were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of unique links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }
}

/// Decodes bytes as ASCII, replacing every non-ASCII byte with `?`.
#[must_use]
pub fn decode_ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect()
}

/// Extracts and deduplicates the image links in a Library file's bytes.
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
#[must_use]
pub fn parse_library(bytes: &[u8]) -> ParseResult {
    let text = decode_ascii_lossy(bytes);
    let extracted = extract_image_urls(&text);
    let found = extracted.urls.len();
    let links = dedup_case_insensitive(extracted.urls);

    debug!(
        found,
        unique = links.len(),
        invalid = extracted.invalid.len(),
        "parsed library"
    );

    ParseResult {
        duplicates: found - links.len(),
        links,
        invalid: extracted.invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii_lossy_replaces_high_bytes() {
        assert_eq!(decode_ascii_lossy(b"ab\xffc\x80"), "ab?c?");
        assert_eq!(decode_ascii_lossy(b""), "");
    }

    #[test]
    fn test_high_byte_terminates_url() {
        // The replacement '?' is excluded from URL characters.
        let parsed = parse_library(b"https://x.io/a.png\xe2\x80\x9dmore");
        assert_eq!(parsed.links, vec!["https://x.io/a.png"]);
    }

    #[test]
    fn test_parse_library_scenario_from_duplicates() {
        let parsed = parse_library(b"http://x/a.png http://x/a.png http://x/b.jpg");
        assert_eq!(parsed.links, vec!["http://x/a.png", "http://x/b.jpg"]);
        assert_eq!(parsed.duplicates, 1);
        assert_eq!(parsed.len(), 2);
        assert!(!parsed.is_empty());
    }

    #[test]
    fn test_parse_library_no_links() {
        let parsed = parse_library(b"\x00\x01 nothing to see");
        assert!(parsed.is_empty());
        assert_eq!(parsed.duplicates, 0);
    }
}
