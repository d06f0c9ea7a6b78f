//! Resilient session management for a remote archival catalog API
//!
//! A [`SessionClient`] validates its configuration, logs in with bounded
//! retry, and serves record reads once the session is verified. Every failure
//! surfaces as a [`SessionError`] classified into one [`ErrorKind`].

pub mod client;
pub mod config;
pub mod error;
pub mod secure;
pub mod source;
pub mod transport;

pub use client::{SessionClient, SessionState, Sleeper, ThreadSleeper};
pub use config::{CatalogConfig, RequestConfig};
pub use error::{BoxError, ErrorKind, SessionError, TransportError};
pub use secure::SecureString;
pub use source::{
    repository_path, resource_path, Record, RecordSource, RepositoryId, ResourceId,
};
pub use transport::{Method, Transport, UreqTransport, SESSION_HEADER};
