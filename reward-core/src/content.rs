//! Content id extraction from share URLs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, CoreResult};

// Tried in order; the first capture wins
static CONTENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"video/(\d+)").expect("Invalid video regex"),
        Regex::new(r"/v/(\d+)").expect("Invalid short video regex"),
    ]
});

/// Extract the numeric content id from a URL
pub fn extract_content_id(url: &str) -> Option<String> {
    CONTENT_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the content id or fail with a validation error
pub fn require_content_id(url: &str) -> CoreResult<String> {
    extract_content_id(url).ok_or_else(|| CoreError::UnrecognizedContentUrl {
        url: url.to_string(),
    })
}
