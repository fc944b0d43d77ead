//! Final URL resolution: base URL, path and sorted query string.

use std::collections::BTreeMap;

use serde_json::Value;

/// Query parameters, kept sorted by key.
pub type Query = BTreeMap<String, Value>;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Serialize query parameters as `?k=v&...`, sorted by key.
///
/// Null and empty-string values are omitted. Strings are used as-is, other
/// scalars via their JSON text. Returns an empty string when nothing remains.
pub fn build_query(query: &Query) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in query {
        let text = match value {
            Value::Null => continue,
            Value::String(s) if s.is_empty() => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        params.append_pair(key, &text);
        any = true;
    }
    if any { format!("?{}", params.finish()) } else { String::new() }
}

/// Join `path` onto `base`.
///
/// Trailing slashes on the base are trimmed and a missing leading slash on
/// the path is added. An empty base returns the path unchanged.
pub fn with_base(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.is_empty() {
        return path.to_string();
    }
    if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
}

/// Resolve the absolute request URL for `path` and `query` against `base`.
pub fn resolve(base: &str, path: &str, query: &Query) -> Result<url::Url, UrlError> {
    let path = path.trim();
    if path.is_empty() && base.trim().is_empty() {
        return Err(UrlError::Empty);
    }

    let joined = with_base(base, &format!("{path}{}", build_query(query)));
    let parsed = url::Url::parse(&joined).map_err(|e| UrlError::InvalidUrl(format!("{joined}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}
