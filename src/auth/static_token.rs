//! Fixed bearer token, typically from `--access-token` or `GCS_ACCESS_TOKEN`.

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

use super::TokenProvider;

/// Hands out the same token forever; it is never refreshed, so long mounts
/// will start failing once the token expires.
pub struct StaticTokenProvider {
    token: Arc<str>,
}

impl StaticTokenProvider {
    /// Surrounding whitespace (e.g. a trailing newline from `$(gcloud ...)`)
    /// is stripped.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self {
            token: Arc::from(token.as_ref().trim()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(
        &self,
        _scopes: &[&str],
    ) -> Result<Option<String>, Box<dyn StdError + Send + Sync>> {
        Ok(Some(self.token.to_string()))
    }
}
