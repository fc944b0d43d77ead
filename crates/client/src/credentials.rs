//! Credential store coupling the bearer token to the response cache.
//!
//! Any change of token, set or cleared, empties the response cache so data
//! fetched under one identity is never served under another.

use std::sync::Arc;

use parking_lot::RwLock;
use shiftdesk_core::{Error, ResponseCache, TokenStorage};

/// Current bearer token, mirrored in memory over persistent storage.
pub struct CredentialStore {
    storage: Arc<dyn TokenStorage>,
    current: RwLock<Option<String>>,
    cache: Arc<ResponseCache>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("has_token", &self.current.read().is_some())
            .finish()
    }
}

impl CredentialStore {
    /// Load the persisted token, if any.
    pub async fn load(storage: Arc<dyn TokenStorage>, cache: Arc<ResponseCache>) -> Result<Self, Error> {
        let token = storage.load().await?;
        tracing::debug!(has_token = token.is_some(), "loaded stored credential");
        Ok(Self { storage, current: RwLock::new(token), cache })
    }

    /// The current token, if one is stored.
    pub fn get(&self) -> Option<String> {
        self.current.read().clone()
    }

    /// `Authorization` header value for the current token.
    pub fn authorization(&self) -> Option<String> {
        self.current.read().as_ref().map(|t| format!("Bearer {t}"))
    }

    /// Store `token`. An empty token clears the credential instead.
    ///
    /// The in-memory token and the cache change even if persisting fails.
    pub async fn set(&self, token: &str) -> Result<(), Error> {
        if token.is_empty() {
            return self.clear().await;
        }
        *self.current.write() = Some(token.to_string());
        self.cache.clear();
        self.storage.save(token).await
    }

    /// Remove the stored token.
    ///
    /// The in-memory token and the cache change even if persisting fails.
    pub async fn clear(&self) -> Result<(), Error> {
        *self.current.write() = None;
        self.cache.clear();
        self.storage.remove().await
    }
}
