//! Per-call request options.
//!
//! ### Defaults
//! - Method `GET`, no body, no query
//! - Credential required
//! - Timeout from client configuration (18s unless configured)
//! - Cache lifetime from the route tables
//! - Caching and de-duplication enabled

pub mod url;

use std::time::Duration;

pub use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

pub use self::url::{Query, UrlError, build_query, resolve, with_base};

/// Options for a single `execute` call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// JSON body; `None` sends no body and no `Content-Type`.
    pub body: Option<Value>,
    pub query: Query,
    /// Attach the stored bearer token, failing fast when there is none.
    pub requires_auth: bool,
    /// Extra headers merged over the defaults.
    pub headers: HeaderMap,
    /// Per-attempt timeout; `None` uses the client default.
    pub timeout: Option<Duration>,
    /// Cache lifetime overriding the route default. Ignored for non-GET.
    pub cache_ttl: Option<Duration>,
    /// `false` skips both the cache and in-flight de-duplication.
    pub use_cache: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            query: Query::new(),
            requires_auth: true,
            headers: HeaderMap::new(),
            timeout: None,
            cache_ttl: None,
            use_cache: true,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    /// Options for a mutation with the given method and JSON body.
    pub fn send(method: Method, body: impl Serialize) -> Self {
        Self { method, ..Default::default() }.json(body)
    }

    pub fn post(body: impl Serialize) -> Self {
        Self::send(Method::POST, body)
    }

    pub fn patch(body: impl Serialize) -> Self {
        Self::send(Method::PATCH, body)
    }

    pub fn delete() -> Self {
        Self { method: Method::DELETE, ..Default::default() }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the JSON body. A value that fails to serialize, or serializes to
    /// `null`, leaves the request without a body.
    pub fn json(mut self, body: impl Serialize) -> Self {
        self.body = serde_json::to_value(body).ok().filter(|v| !v.is_null());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "skipping invalid header"),
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Bypass the cache and de-duplication for this call.
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// GET (and only GET) is safe to cache, share and retry.
    pub fn is_idempotent_read(&self) -> bool {
        self.method == Method::GET
    }
}
