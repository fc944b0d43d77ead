//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::Client;

use super::{OutgoingRequest, RawResponse, Transport, TransportError};

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "shiftdesk/0.1";

/// HTTP transport over a shared reqwest client.
///
/// The client has no timeout of its own; the executor bounds each attempt.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Create a transport sending the given user agent.
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(if user_agent.is_empty() { DEFAULT_USER_AGENT } else { user_agent })
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::TimedOut
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.http.request(request.method, request.url).headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(RawResponse { status, body })
    }
}
