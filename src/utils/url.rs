// src/utils/url.rs

//! URL manipulation utilities.

/// Resolve a potentially relative URL against a base URL.
///
/// # Examples
/// ```
/// use si_engine::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.se", "/rapport/2025/"),
///     "https://example.se/rapport/2025/"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> String {
    // Already absolute
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    if href.starts_with('/') {
        if let Some(scheme_end) = base.find("://") {
            let after_scheme = &base[scheme_end + 3..];
            if let Some(slash_idx) = after_scheme.find('/') {
                let domain = &base[..scheme_end + 3 + slash_idx];
                return format!("{domain}{href}");
            }
        }
        return format!("{}{}", base.trim_end_matches('/'), href);
    }

    // Relative path - combine with base directory
    let base_dir = if base.ends_with('/') {
        base.to_string()
    } else {
        match base.rfind('/') {
            Some(idx) if idx > base.find("://").map_or(0, |i| i + 2) => base[..=idx].to_string(),
            _ => format!("{base}/"),
        }
    };
    format!("{base_dir}{href}")
}

/// Normalize a content URL into a cache key.
///
/// Resolves relative paths against the base, lowercases the host and strips
/// any fragment, so that equivalent URLs map to the same cache entry.
pub fn normalize_key(base: &str, href: &str) -> String {
    let absolute = resolve(base, href);
    match url::Url::parse(&absolute) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => absolute,
    }
}

/// Derive a stable record identifier from a publication URL path.
///
/// The full path is used (not just the last segment) so that publications
/// with identical slugs under different years or categories stay distinct.
pub fn record_id(url: &str) -> String {
    let path = match url.find("://") {
        Some(scheme_end) => {
            let after_scheme = &url[scheme_end + 3..];
            after_scheme.find('/').map(|i| &after_scheme[i..]).unwrap_or("/")
        }
        None => url,
    };

    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or(path)
        .trim_matches('/');

    let id = path.to_lowercase().replace('/', "-");
    if id.is_empty() { "root".to_string() } else { id }
}
