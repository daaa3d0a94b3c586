//! Error taxonomy for storage operations.
//!
//! Three failure classes cross the adapter boundary: a collection name that
//! resolves to no notebook, a service client that was never initialized
//! (missing credentials, no transport), and an operation the service itself
//! rejected or that failed in flight (timeout, auth failure, bad status).
//!
//! Configuration invariant violations are not represented here; they are
//! raised eagerly at config construction time and never reach a running
//! operation.

use thiserror::Error;

/// Failures surfaced by [`CollectionStore`](crate::store::CollectionStore)
/// implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The collection is not mapped to a notebook and no default notebook
    /// is configured.
    #[error("collection '{0}' is not mapped and no default notebook is configured")]
    CollectionNotFound(String),

    /// The notebook service client is not initialized (missing credentials
    /// or transport).
    #[error("notebook service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The notebook service reported a failure, or the call itself failed
    /// (timeout, connection error, unexpected response shape).
    #[error("notebook service error: {0}")]
    Service(String),
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
