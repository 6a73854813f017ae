//! Anonymous access: requests are sent without an Authorization header.

use async_trait::async_trait;
use std::error::Error as StdError;

use super::TokenProvider;

/// A token provider that never yields a token.
pub struct AnonymousProvider;

#[async_trait]
impl TokenProvider for AnonymousProvider {
    async fn get_token(
        &self,
        _scopes: &[&str],
    ) -> Result<Option<String>, Box<dyn StdError + Send + Sync>> {
        Ok(None)
    }
}
