//! Request executor.
//!
//! Every network call goes through [`ApiClient::execute`], which handles:
//!
//! - URL resolution and auth header attachment
//! - Cache short-circuit for GET reads within their TTL
//! - De-duplication of concurrent identical GET reads
//! - A per-attempt timeout and a single retry for GET transport failures
//! - Cache writes on read success, tag invalidation on mutation success
//! - Clearing the credential when the server answers 401

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use shiftdesk_core::routes;
use shiftdesk_core::{CacheKey, ClientConfig, ResponseCache, SqliteTokenStorage, TokenStorage};
use tokio::sync::watch;

use crate::activity::{Activity, ActivityBroadcaster};
use crate::credentials::CredentialStore;
use crate::envelope;
use crate::error::ApiError;
use crate::inflight::InFlightRegistry;
use crate::request::{self, RequestOptions};
use crate::transport::{HttpTransport, OutgoingRequest, Transport, TransportError};

/// Retries allowed per call, for GET transport failures only.
const MAX_RETRIES: u32 = 1;

/// Errors building a client from configuration.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Storage(#[from] shiftdesk_core::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Shared state behind every [`ApiClient`] handle.
///
/// Built once per process (or per test) and injected into the client.
pub struct ApiContext {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache>,
    inflight: InFlightRegistry,
    activity: ActivityBroadcaster,
    credentials: CredentialStore,
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("base_url", &self.config.base_url)
            .field("cache_entries", &self.cache.len())
            .field("inflight", &self.inflight)
            .field("activity", &self.activity.current())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl ApiContext {
    /// Build a context, loading the persisted token from `storage`.
    pub async fn new(
        config: ClientConfig, transport: Arc<dyn Transport>, storage: Arc<dyn TokenStorage>,
    ) -> Result<Self, shiftdesk_core::Error> {
        let cache = Arc::new(ResponseCache::new());
        let credentials = CredentialStore::load(storage, Arc::clone(&cache)).await?;
        Ok(Self {
            config,
            transport,
            cache,
            inflight: InFlightRegistry::new(),
            activity: ActivityBroadcaster::new(),
            credentials,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn inflight(&self) -> &InFlightRegistry {
        &self.inflight
    }

    pub fn activity(&self) -> &ActivityBroadcaster {
        &self.activity
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }
}

/// A request with everything resolved, ready for one or more attempts.
#[derive(Debug, Clone)]
struct PreparedRequest {
    method: Method,
    url: ::url::Url,
    /// URL path, used for route classification.
    route: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Duration,
    key: CacheKey,
    ttl: Duration,
    is_read: bool,
    cacheable: bool,
}

impl PreparedRequest {
    fn method_str(&self) -> &str {
        self.method.as_str()
    }

    fn url_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Cheaply cloneable handle to the request executor.
#[derive(Debug, Clone)]
pub struct ApiClient {
    ctx: Arc<ApiContext>,
}

impl ApiClient {
    pub fn new(context: ApiContext) -> Self {
        Self { ctx: Arc::new(context) }
    }

    /// Build a client over HTTP with the token persisted at `config.db_path`.
    pub async fn connect(config: ClientConfig) -> Result<Self, InitError> {
        let storage = SqliteTokenStorage::open(&config.db_path).await?;
        let transport = HttpTransport::new(&config.user_agent)?;
        let context = ApiContext::new(config, Arc::new(transport), Arc::new(storage)).await?;
        Ok(Self::new(context))
    }

    pub fn context(&self) -> &ApiContext {
        &self.ctx
    }

    /// Current bearer token, if any.
    pub fn get_token(&self) -> Option<String> {
        self.ctx.credentials.get()
    }

    /// Replace the bearer token. Clears the response cache.
    pub async fn set_token(&self, token: &str) -> Result<(), shiftdesk_core::Error> {
        self.ctx.credentials.set(token).await
    }

    /// Remove the bearer token. Clears the response cache.
    pub async fn clear_token(&self) -> Result<(), shiftdesk_core::Error> {
        self.ctx.credentials.clear().await
    }

    /// Evict cached responses filed under any of `tags`.
    pub fn invalidate<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        self.ctx.cache.invalidate_by_tags(tags)
    }

    /// Evict every tagged response (manual refresh).
    pub fn refresh_all(&self) -> usize {
        self.invalidate(routes::ALL_TAGS)
    }

    /// Subscribe to network activity changes.
    pub fn subscribe_activity(&self) -> watch::Receiver<Activity> {
        self.ctx.activity.subscribe()
    }

    /// Execute a request and return the decoded payload (`data` of the envelope).
    pub async fn execute(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let use_cache = options.use_cache;
        let prepared = self.prepare(path, options)?;

        if prepared.cacheable
            && let Some(hit) = self.ctx.cache.get(&prepared.key)
        {
            tracing::debug!(key = %prepared.key, "cache hit");
            return Ok(hit);
        }

        if prepared.is_read && use_cache {
            let client = self.clone();
            let key = prepared.key.clone();
            let (pending, joined) = self
                .ctx
                .inflight
                .join_or_register(key, move || async move { client.run(prepared).await }.boxed());
            if joined {
                tracing::debug!(path, "joined in-flight request");
            }
            return pending.await;
        }

        self.run(prepared).await
    }

    fn prepare(&self, path: &str, options: RequestOptions) -> Result<PreparedRequest, ApiError> {
        let method = options.method.clone();
        let is_read = options.is_idempotent_read();

        let url = request::resolve(&self.ctx.config.base_url, path, &options.query)
            .map_err(|e| ApiError::invalid_request(method.as_str(), path, e.to_string()))?;
        let route = url.path().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);
        if options.body.is_none() {
            headers.remove(CONTENT_TYPE);
        }

        if options.requires_auth {
            let Some(authorization) = self.ctx.credentials.authorization() else {
                return Err(ApiError::unauthenticated(method.as_str(), url.as_str()));
            };
            let value = HeaderValue::from_str(&authorization)
                .map_err(|e| ApiError::invalid_request(method.as_str(), url.as_str(), e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let body = match &options.body {
            Some(value) => Some(Bytes::from(
                serde_json::to_vec(value)
                    .map_err(|e| ApiError::invalid_request(method.as_str(), url.as_str(), e.to_string()))?,
            )),
            None => None,
        };

        let ttl = if is_read {
            options
                .cache_ttl
                .unwrap_or_else(|| routes::cache_lifetime_for(&route))
        } else {
            Duration::ZERO
        };

        let timeout = options
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or_else(|| self.ctx.config.timeout());

        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let key = CacheKey::new(method.as_str(), url.as_str(), authorization);

        Ok(PreparedRequest {
            cacheable: is_read && options.use_cache && !ttl.is_zero(),
            method,
            url,
            route,
            headers,
            body,
            timeout,
            key,
            ttl,
            is_read,
        })
    }

    async fn run(&self, request: PreparedRequest) -> Result<Value, ApiError> {
        let mut retries = 0;
        loop {
            match self.attempt(&request).await {
                Ok(value) => return Ok(value),
                Err(err) if request.is_read && err.is_retryable() && retries < MAX_RETRIES => {
                    retries += 1;
                    tracing::debug!(url = request.url_str(), error = %err, "retrying after transport failure");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(&self, request: &PreparedRequest) -> Result<Value, ApiError> {
        let _busy = self.ctx.activity.track();

        if self.ctx.config.network_log {
            tracing::debug!(method = request.method_str(), url = request.url_str(), "fired");
        }

        let outgoing = OutgoingRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        };

        let response = match tokio::time::timeout(request.timeout, self.ctx.transport.send(outgoing)).await {
            Ok(Ok(response)) => response,
            Ok(Err(TransportError::TimedOut)) | Err(_) => {
                return Err(ApiError::timeout(request.method_str(), request.url_str()));
            }
            Ok(Err(err)) => return Err(ApiError::network(request.method_str(), request.url_str(), err.to_string())),
        };

        let payload = match envelope::classify(request.method_str(), request.url_str(), &response) {
            Ok(payload) => payload,
            Err(err) => {
                if response.status == 401 {
                    self.expire_session().await;
                }
                return Err(err);
            }
        };

        if request.is_read {
            if request.cacheable
                && let Some(data) = &payload.data
            {
                let tags = routes::read_tags_for(&request.route);
                self.ctx
                    .cache
                    .set(request.key.clone(), data.clone(), request.ttl, tags);
            }
        } else {
            let tags = routes::invalidation_tags_for(&request.route);
            if !tags.is_empty() {
                self.ctx.cache.invalidate_by_tags(tags);
            }
        }

        Ok(payload.into_value())
    }

    async fn expire_session(&self) {
        tracing::warn!("server rejected credential; clearing stored token");
        if let Err(e) = self.ctx.credentials.clear().await {
            tracing::warn!(error = %e, "failed to remove stored token");
        }
    }
}
