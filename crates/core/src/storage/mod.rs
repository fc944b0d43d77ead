//! Persisted credential storage.
//!
//! The bearer token is the only value persisted outside process memory. It
//! lives under [`TOKEN_KEY`] so a restarted process picks up the same session.

pub mod connection;
pub mod schema;

use async_trait::async_trait;
use parking_lot::Mutex;

pub use connection::SqliteTokenStorage;

use crate::Error;

/// Fixed storage key for the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Backing store for the bearer token.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Read the stored token. An empty stored value reads as absent.
    async fn load(&self) -> Result<Option<String>, Error>;

    /// Persist `token`, replacing any previous value.
    async fn save(&self, token: &str) -> Result<(), Error>;

    /// Delete the stored token. Succeeds when nothing is stored.
    async fn remove(&self) -> Result<(), Error>;
}

/// Process-local token storage for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Mutex::new(Some(token.into())) }
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> Result<Option<String>, Error> {
        Ok(self.token.lock().clone().filter(|t| !t.is_empty()))
    }

    async fn save(&self, token: &str) -> Result<(), Error> {
        if token.is_empty() {
            return Err(Error::InvalidInput("token must not be empty".to_string()));
        }
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    async fn remove(&self) -> Result<(), Error> {
        *self.token.lock() = None;
        Ok(())
    }
}
