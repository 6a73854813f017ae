//! Google Cloud Storage connector
//!
//! Talks to the Cloud Storage JSON API (or anything speaking it, such as
//! fake-gcs-server) over HTTPS with OAuth2 bearer tokens.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::auth::TokenSource;
use crate::config::Config;
use crate::connector::{Connector, Session};
use crate::error::{GcsFuseError, Result};

/// Connector for Google Cloud Storage
#[derive(Debug, Clone, Copy, Default)]
pub struct GcsConnector;

#[async_trait]
impl Connector for GcsConnector {
    type Session = Connection;

    async fn connect(&self, config: &Config) -> Result<Connection> {
        Connection::open(config).await
    }
}

/// An authenticated connection to the storage API
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    client: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl Connection {
    /// Set up credentials and an HTTP client for `config`.
    ///
    /// One token is fetched up front so that bad credentials are reported
    /// here rather than on first filesystem access.
    pub async fn open(config: &Config) -> Result<Self> {
        let tokens = TokenSource::from_credentials(config.credentials()).await?;

        let token = tokens.token().await?;
        debug!(
            "Authenticated against {} ({})",
            config.endpoint(),
            if token.is_some() { "bearer token" } else { "anonymous" }
        );

        let client = reqwest::Client::builder()
            .user_agent(concat!("gcsfuse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GcsFuseError::Backend(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                client,
                endpoint: config.endpoint().to_string(),
                tokens,
            }),
        })
    }

    /// Storage API base URL
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }
}

impl Session for Connection {
    type Bucket = Bucket;

    fn bucket(&self, name: &str) -> Bucket {
        Bucket {
            name: name.to_string(),
            conn: self.inner.clone(),
        }
    }
}

/// Handle to one bucket on a [`Connection`]
#[derive(Clone)]
pub struct Bucket {
    name: String,
    conn: Arc<ConnectionInner>,
}

impl Bucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn metadata_url(&self) -> Result<Url> {
        bucket_url(&self.conn.endpoint, &self.name)
    }

    /// Fetch the bucket resource (`GET /storage/v1/b/{bucket}`)
    pub async fn metadata(&self) -> Result<BucketMetadata> {
        let url = self.metadata_url()?;
        trace!("GET {}", url);

        let mut request = self.conn.client.get(url);
        if let Some(token) = self.conn.tokens.token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            GcsFuseError::Backend(format!("Request for bucket {:?} failed: {}", self.name, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &self.name, &body));
        }

        let resource: BucketResource = response.json().await.map_err(|e| {
            GcsFuseError::Backend(format!(
                "Malformed bucket resource for {:?}: {}",
                self.name, e
            ))
        })?;

        Ok(resource.into_metadata())
    }
}

/// Bucket properties the filesystem cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketMetadata {
    pub name: String,
    pub created: SystemTime,
    pub updated: SystemTime,
    pub location: Option<String>,
    pub storage_class: Option<String>,
}

impl BucketMetadata {
    /// Metadata with both timestamps set to now
    pub fn new(name: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            created: now,
            updated: now,
            location: None,
            storage_class: None,
        }
    }
}

/// Bucket resource as returned by the JSON API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketResource {
    name: String,
    time_created: Option<String>,
    updated: Option<String>,
    location: Option<String>,
    storage_class: Option<String>,
}

impl BucketResource {
    fn into_metadata(self) -> BucketMetadata {
        let created = parse_timestamp(self.time_created.as_deref());
        let updated = parse_timestamp(self.updated.as_deref()).or(created);
        let now = SystemTime::now();

        BucketMetadata {
            name: self.name,
            created: created.unwrap_or(now),
            updated: updated.unwrap_or(now),
            location: self.location,
            storage_class: self.storage_class,
        }
    }
}

/// Parse an RFC 3339 timestamp from the API
fn parse_timestamp(value: Option<&str>) -> Option<SystemTime> {
    value
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(SystemTime::from)
}

/// Build `{endpoint}/storage/v1/b/{bucket}`, escaping the bucket name
fn bucket_url(endpoint: &str, bucket: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| GcsFuseError::Config(format!("Invalid endpoint {:?}: {}", endpoint, e)))?;

    url.path_segments_mut()
        .map_err(|_| GcsFuseError::Config(format!("Endpoint {:?} cannot be a base URL", endpoint)))?
        .pop_if_empty()
        .extend(["storage", "v1", "b", bucket]);

    Ok(url)
}

/// Map a non-success API status to an error
fn status_error(status: StatusCode, bucket: &str, body: &str) -> GcsFuseError {
    match status {
        StatusCode::NOT_FOUND => {
            GcsFuseError::NotFound(format!("bucket {:?} does not exist", bucket))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GcsFuseError::PermissionDenied(
            format!("access to bucket {:?} denied ({})", bucket, status),
        ),
        _ => GcsFuseError::Backend(format!(
            "unexpected status {} for bucket {:?}: {}",
            status,
            bucket,
            body.trim()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bucket_url() {
        let url = bucket_url("https://storage.googleapis.com", "my-bucket").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/my-bucket"
        );
    }

    #[test]
    fn test_bucket_url_keeps_endpoint_path() {
        let url = bucket_url("http://localhost:4443/gcs/", "b.example.com").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4443/gcs/storage/v1/b/b.example.com"
        );
    }

    #[test]
    fn test_bucket_url_escapes_name() {
        let url = bucket_url("http://localhost:4443", "a/b").unwrap();
        assert_eq!(url.as_str(), "http://localhost:4443/storage/v1/b/a%2Fb");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "b", ""),
            GcsFuseError::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "b", ""),
            GcsFuseError::PermissionDenied(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "b", ""),
            GcsFuseError::PermissionDenied(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "b", "oops"),
            GcsFuseError::Backend(_)
        ));
    }

    #[test]
    fn test_resource_timestamps() {
        let resource = BucketResource {
            name: "my-bucket".to_string(),
            time_created: Some("2015-03-01T10:00:00.000Z".to_string()),
            updated: Some("2015-03-02T10:00:00.000Z".to_string()),
            location: Some("US".to_string()),
            storage_class: Some("STANDARD".to_string()),
        };

        let meta = resource.into_metadata();
        assert_eq!(meta.name, "my-bucket");
        assert_eq!(
            meta.updated.duration_since(meta.created).unwrap(),
            Duration::from_secs(24 * 60 * 60)
        );
        assert_eq!(meta.location.as_deref(), Some("US"));
    }

    #[test]
    fn test_resource_missing_updated_falls_back_to_created() {
        let resource = BucketResource {
            name: "b".to_string(),
            time_created: Some("2015-03-01T10:00:00Z".to_string()),
            updated: None,
            location: None,
            storage_class: None,
        };

        let meta = resource.into_metadata();
        assert_eq!(meta.created, meta.updated);
    }

    #[tokio::test]
    async fn test_anonymous_connect_needs_no_network() {
        let config = Config::new("my-bucket", "/mnt/x")
            .unwrap()
            .with_credentials(crate::config::CredentialSource::Anonymous)
            .with_endpoint("http://127.0.0.1:1")
            .unwrap();

        let conn = GcsConnector.connect(&config).await.unwrap();
        assert_eq!(conn.endpoint(), "http://127.0.0.1:1");
        assert_eq!(conn.bucket("my-bucket").name(), "my-bucket");
    }

    #[tokio::test]
    async fn test_metadata_request_failure_is_backend_error() {
        let config = Config::new("my-bucket", "/mnt/x")
            .unwrap()
            .with_credentials(crate::config::CredentialSource::Anonymous)
            .with_endpoint("http://127.0.0.1:1")
            .unwrap();

        let conn = GcsConnector.connect(&config).await.unwrap();
        let result = conn.bucket("my-bucket").metadata().await;
        assert!(matches!(result, Err(GcsFuseError::Backend(_))));
    }
}
