//! Request fingerprints used as cache and de-duplication keys.

use std::fmt;

use sha2::{Digest, Sha256};

/// Fingerprint of a request: method, final URL and resolved authorization.
///
/// The authorization value is stored as a SHA-256 digest so bearer tokens
/// are never held as map keys. An absent header digests to the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    url: String,
    auth_digest: String,
}

impl CacheKey {
    pub fn new(method: &str, url: &str, authorization: &str) -> Self {
        Self { method: method.to_uppercase(), url: url.to_string(), auth_digest: digest_authorization(authorization) }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.auth_digest.get(..12).unwrap_or("-");
        write!(f, "{}::{}::{}", self.method, self.url, short)
    }
}

/// Digest an authorization header value.
pub fn digest_authorization(authorization: &str) -> String {
    if authorization.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(authorization.as_bytes());
    hex::encode(hasher.finalize())
}
