//! Structured request errors.
//!
//! Every failure leaving the executor is an [`ApiError`]. Callers branch on
//! [`ErrorKind`] or `code`, never on the message text.

use serde::Serialize;
use serde_json::Value;

/// Code for a request that needed a credential and had none.
pub const CODE_NO_TOKEN: &str = "NO_TOKEN";
/// Code for a transfer that could not complete.
pub const CODE_NETWORK: &str = "NETWORK_ERROR";
/// Code for a transfer that exceeded its timeout.
pub const CODE_TIMEOUT: &str = "REQUEST_TIMEOUT";
/// Code for a request that could not be built (URL, headers).
pub const CODE_INVALID_REQUEST: &str = "INVALID_REQUEST";

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required credential was absent; nothing was sent.
    Unauthenticated,
    /// The transfer could not complete (DNS, connection, offline).
    Network,
    /// The transfer exceeded its per-attempt bound.
    Timeout,
    /// The server responded and signaled failure.
    Application,
    /// The request could not be built; nothing was sent.
    InvalidRequest,
}

/// Structured error carrying enough context to tell "offline", "session
/// expired" and "rejected" apart.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    /// HTTP status; 0 when no response was received.
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Decoded response body, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub url: String,
    pub method: String,
}

impl ApiError {
    pub fn unauthenticated(method: &str, url: &str) -> Self {
        Self {
            kind: ErrorKind::Unauthenticated,
            status: 401,
            code: CODE_NO_TOKEN.to_string(),
            message: "No auth token".to_string(),
            details: None,
            data: None,
            url: url.to_string(),
            method: method.to_string(),
        }
    }

    pub fn network(method: &str, url: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::Network,
            status: 0,
            code: CODE_NETWORK.to_string(),
            message: if message.is_empty() { "Network error".to_string() } else { message },
            details: None,
            data: None,
            url: url.to_string(),
            method: method.to_string(),
        }
    }

    pub fn timeout(method: &str, url: &str) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            status: 0,
            code: CODE_TIMEOUT.to_string(),
            message: "Request timeout".to_string(),
            details: None,
            data: None,
            url: url.to_string(),
            method: method.to_string(),
        }
    }

    pub fn invalid_request(method: &str, url: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            status: 0,
            code: CODE_INVALID_REQUEST.to_string(),
            message: message.into(),
            details: None,
            data: None,
            url: url.to_string(),
            method: method.to_string(),
        }
    }

    /// Server-signaled failure. Missing code and message fall back to the status.
    pub fn application(
        method: &str, url: &str, status: u16, code: Option<String>, message: Option<String>, details: Option<Value>,
        data: Value,
    ) -> Self {
        Self {
            kind: ErrorKind::Application,
            status,
            code: code.filter(|c| !c.is_empty()).unwrap_or_else(|| format!("HTTP_{status}")),
            message: message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Request failed: {status}")),
            details,
            data: Some(data),
            url: url.to_string(),
            method: method.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// The session is missing or no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthenticated || self.status == 401
    }

    /// Only pure transport failures may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = ApiError::timeout("GET", "https://api.example.com/api/projects");
        assert_eq!(err.to_string(), "REQUEST_TIMEOUT: Request timeout");

        let err = ApiError::network("GET", "https://api.example.com/api/projects", "connection refused");
        assert!(err.to_string().contains("NETWORK_ERROR"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_application_fallbacks() {
        let err = ApiError::application("POST", "u", 422, None, None, None, json!({}));
        assert_eq!(err.code, "HTTP_422");
        assert_eq!(err.message, "Request failed: 422");
        assert_eq!(err.kind, ErrorKind::Application);

        let err = ApiError::application(
            "POST",
            "u",
            400,
            Some("VALIDATION".into()),
            Some("name required".into()),
            Some(json!({"field": "name"})),
            json!({"ok": false}),
        );
        assert_eq!(err.code, "VALIDATION");
        assert_eq!(err.message, "name required");
        assert_eq!(err.details, Some(json!({"field": "name"})));
    }

    #[test]
    fn test_classification_helpers() {
        let network = ApiError::network("GET", "u", "");
        assert!(network.is_network());
        assert!(network.is_retryable());
        assert_eq!(network.message, "Network error");

        let timeout = ApiError::timeout("GET", "u");
        assert!(timeout.is_timeout());
        assert!(!timeout.is_retryable());

        let unauth = ApiError::unauthenticated("GET", "u");
        assert!(unauth.is_unauthorized());
        assert_eq!(unauth.code, CODE_NO_TOKEN);

        let invalid = ApiError::invalid_request("GET", "/api/users", "relative URL without a base");
        assert_eq!(invalid.code, CODE_INVALID_REQUEST);
        assert!(!invalid.is_retryable());

        let expired = ApiError::application("GET", "u", 401, None, None, None, json!({}));
        assert!(expired.is_unauthorized());
        assert!(!expired.is_retryable());
    }

    #[test]
    fn test_serializes_kind() {
        let err = ApiError::timeout("GET", "u");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "timeout");
        assert_eq!(value["status"], 0);
        assert!(value.get("details").is_none());
    }
}
