//! Client code for shiftdesk.
//!
//! This crate provides the request executor for the time-tracking API:
//! envelope decoding, response caching with tag invalidation, in-flight
//! de-duplication, credential handling and network activity tracking.

pub mod activity;
pub mod auth;
pub mod client;
pub mod credentials;
pub mod envelope;
pub mod error;
pub mod inflight;
pub mod request;
pub mod transport;

pub use activity::{Activity, ActivityBroadcaster};
pub use client::{ApiClient, ApiContext, InitError};
pub use credentials::CredentialStore;
pub use error::{ApiError, ErrorKind};
pub use inflight::InFlightRegistry;
pub use request::RequestOptions;
pub use transport::{HttpTransport, OutgoingRequest, RawResponse, Transport, TransportError};
