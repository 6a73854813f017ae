//! Token providers for Cloud Storage authentication
//!
//! This module provides a flexible authentication system supporting multiple
//! token sources:
//! - Service account JSON keys
//! - The GCE metadata server (default on Google Cloud VMs)
//! - Static tokens (pre-obtained access tokens, testing)
//! - Anonymous access (public buckets, local emulators)

pub mod anonymous;
pub mod metadata;
pub mod service_account;
pub mod static_token;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::debug;

use crate::config::CredentialSource;
use crate::error::{GcsFuseError, Result};

pub use anonymous::AnonymousProvider;
pub use metadata::MetadataServerProvider;
pub use service_account::ServiceAccountProvider;
pub use static_token::StaticTokenProvider;

/// OAuth2 scope for read-only access to Cloud Storage
pub const READ_ONLY_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_only";

/// Trait for token providers.
///
/// Returns `Ok(Some(token))` if a token is available,
/// `Ok(None)` if no token is needed,
/// or `Err` if token fetching failed.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(
        &self,
        scopes: &[&str],
    ) -> std::result::Result<Option<String>, Box<dyn StdError + Send + Sync>>;
}

/// Shared handle to a token provider, bound to the scopes gcsfuse requests.
#[derive(Clone)]
pub struct TokenSource {
    inner: Arc<dyn TokenProvider>,
    scopes: &'static [&'static str],
}

impl TokenSource {
    /// Wrap a provider, requesting read-only storage access.
    pub fn new<T: TokenProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Arc::new(provider),
            scopes: &[READ_ONLY_SCOPE],
        }
    }

    /// Build the provider matching a configured credential source.
    pub async fn from_credentials(source: &CredentialSource) -> Result<Self> {
        debug!("Using credential source {:?}", source);
        let tokens = match source {
            CredentialSource::KeyFile(path) => {
                let provider = ServiceAccountProvider::from_file(path).await.map_err(|e| {
                    GcsFuseError::Auth(format!("Failed to load key file {:?}: {}", path, e))
                })?;
                Self::new(provider)
            }
            CredentialSource::AccessToken(token) => {
                Self::new(StaticTokenProvider::new(token))
            }
            CredentialSource::MetadataServer => Self::new(MetadataServerProvider::default()),
            CredentialSource::Anonymous => Self::new(AnonymousProvider),
        };
        Ok(tokens)
    }

    /// Fetch a token for the bound scopes.
    pub async fn token(&self) -> Result<Option<String>> {
        self.inner
            .get_token(self.scopes)
            .await
            .map_err(|e| GcsFuseError::Auth(e.to_string()))
    }
}
