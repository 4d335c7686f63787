//! Deduplication keys for target URLs.

use url::Url;

/// Normalize a target URL into the key used for duplicate detection.
///
/// Query string and fragment are dropped, the host is lowercased (by the URL
/// parser) and a trailing `/` is removed. Input that does not parse as a URL
/// is trimmed and cut at the first `?` or `#`.
pub fn normalize_target_url(target_url: &str) -> String {
    let trimmed = target_url.trim();

    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or(trimmed)
            .trim_end_matches('/')
            .to_string();
    };

    parsed.set_query(None);
    parsed.set_fragment(None);

    parsed.as_str().trim_end_matches('/').to_string()
}
