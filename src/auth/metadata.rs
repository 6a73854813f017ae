//! GCE metadata server token provider.
//!
//! On Google Cloud VMs (and GKE workloads with workload identity) the
//! metadata server hands out access tokens for the attached service account.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::debug;

use super::TokenProvider;

/// Tokens are refreshed this long before the server says they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the server omits `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Token endpoint for the instance's default service account.
pub const DEFAULT_TOKEN_ENDPOINT: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    /// Seconds until expiry
    expires_in: Option<u64>,
}

/// A token and the instant it should be replaced.
struct Lease {
    token: String,
    refresh_at: Instant,
}

impl Lease {
    fn new(token: String, lifetime: Duration) -> Self {
        Self {
            token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// Token provider backed by the GCE metadata server.
pub struct MetadataServerProvider {
    endpoint: String,
    http: reqwest::Client,
    lease: Mutex<Option<Lease>>,
}

impl MetadataServerProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
            lease: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<String> {
        self.lease
            .lock()
            .as_ref()
            .filter(|lease| lease.is_fresh())
            .map(|lease| lease.token.clone())
    }

    async fn request(&self, scopes: &[&str]) -> Result<Lease, Box<dyn StdError + Send + Sync>> {
        let mut request = self
            .http
            .get(&self.endpoint)
            .header("Metadata-Flavor", "Google");
        if !scopes.is_empty() {
            request = request.query(&[("scopes", scopes.join(","))]);
        }

        let response = request.send().await.map_err(|e| {
            format!(
                "metadata server unreachable at {} (not on GCE? use --key-file): {}",
                self.endpoint, e
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("metadata server answered {}: {}", status, body.trim()).into());
        }

        let payload: MetadataToken = response.json().await?;
        let lifetime = payload
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);
        debug!("Fetched metadata server token valid for {:?}", lifetime);

        Ok(Lease::new(payload.access_token, lifetime))
    }
}

impl Default for MetadataServerProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENDPOINT)
    }
}

#[async_trait]
impl TokenProvider for MetadataServerProvider {
    async fn get_token(
        &self,
        scopes: &[&str],
    ) -> Result<Option<String>, Box<dyn StdError + Send + Sync>> {
        if let Some(token) = self.cached() {
            return Ok(Some(token));
        }

        let lease = self.request(scopes).await?;
        let token = lease.token.clone();
        *self.lease.lock() = Some(lease);

        Ok(Some(token))
    }
}
