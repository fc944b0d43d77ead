//! Core types and shared functionality for shiftdesk.
//!
//! This crate provides:
//! - Response cache with TTL expiry and tag invalidation
//! - Route classification tables (cache lifetime, read and invalidation tags)
//! - Persisted token storage with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
pub mod storage;

pub use cache::{CacheKey, ResponseCache};
pub use config::{ClientConfig, ConfigError};
pub use error::Error;
pub use storage::{MemoryTokenStorage, SqliteTokenStorage, TokenStorage};
