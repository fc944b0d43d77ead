//! Network transfer seam.
//!
//! The executor never talks to reqwest directly; it hands a fully built
//! [`OutgoingRequest`] to a [`Transport`] and gets raw status and body bytes
//! back. Timeouts are enforced by the executor around `send`, so transports
//! only report whether the transfer itself completed.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::HeaderMap;

pub use http::HttpTransport;

/// Fully resolved request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: ::url::Url,
    pub headers: HeaderMap,
    /// Serialized JSON body.
    pub body: Option<Bytes>,
}

/// Raw response: status and undecoded body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The transfer could not complete.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transfer timed out")]
    TimedOut,

    #[error("network error: {0}")]
    Other(String),
}

/// Performs one network transfer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(304, "").is_success());
        assert!(!RawResponse::new(401, "").is_success());
        assert!(!RawResponse::new(500, "").is_success());
    }

    #[test]
    fn test_transport_error_display() {
        assert!(TransportError::Connect("refused".into()).to_string().contains("refused"));
        assert_eq!(TransportError::TimedOut.to_string(), "transfer timed out");
    }
}
