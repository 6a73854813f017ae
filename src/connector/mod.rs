//! Backend connectors
//!
//! A [`Connector`] establishes an authenticated [`Session`] with a storage
//! backend; a session hands out bucket handles that the filesystem adapter is
//! built from. Retries, if any, are the connector's own business: a failed
//! `connect` is final as far as callers are concerned.

pub mod gcs;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;

/// Establishes sessions with a storage backend
#[async_trait]
pub trait Connector: Send + Sync {
    /// Session type produced by a successful connection
    type Session: Session;

    /// Open an authenticated session using `config`
    async fn connect(&self, config: &Config) -> Result<Self::Session>;
}

/// An authenticated backend session
pub trait Session: Send + Sync {
    /// Handle to a named bucket within the session
    type Bucket: Send + 'static;

    /// Get a handle for the bucket called `name`.
    ///
    /// This does not contact the backend; a missing bucket is discovered by
    /// whoever first uses the handle.
    fn bucket(&self, name: &str) -> Self::Bucket;
}
