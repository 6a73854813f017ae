//! Service account JSON keys, exchanged for access tokens by yup-oauth2.

use async_trait::async_trait;
use hyper_util::client::legacy::connect::HttpConnector;
use std::error::Error as StdError;
use std::path::Path;
use tracing::debug;
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator, ServiceAccountKey};

use super::TokenProvider;

type Authenticator =
    yup_oauth2::authenticator::Authenticator<hyper_rustls::HttpsConnector<HttpConnector>>;

/// Token provider for a service account; refresh is handled by yup-oauth2.
pub struct ServiceAccountProvider {
    account: String,
    auth: Authenticator,
}

impl ServiceAccountProvider {
    /// Load a key file as downloaded from the Cloud Console.
    pub async fn from_file(path: &Path) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let key = read_service_account_key(path).await?;
        Self::from_key(key).await
    }

    pub async fn from_key(key: ServiceAccountKey) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let account = key.client_email.clone();
        let auth = ServiceAccountAuthenticator::builder(key).build().await?;
        debug!("Using service account {}", account);

        Ok(Self { account, auth })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountProvider {
    async fn get_token(
        &self,
        scopes: &[&str],
    ) -> Result<Option<String>, Box<dyn StdError + Send + Sync>> {
        let token = self.auth.token(scopes).await?;
        match token.token() {
            Some(t) => Ok(Some(t.to_string())),
            None => Err(format!("no access token issued for {}", self.account).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_key_without_private_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{ "type": "service_account", "client_email": "svc@project.iam.gserviceaccount.com" }}"#
        )
        .unwrap();

        assert!(ServiceAccountProvider::from_file(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = ServiceAccountProvider::from_file(&dir.path().join("key.json")).await;
        assert!(result.is_err());
    }
}
