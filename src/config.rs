//! Resolved runtime configuration
//!
//! A [`Config`] is built once at startup (normally by [`crate::cli`]) and then
//! handed by reference to every lifecycle stage. It cannot be mutated after
//! construction, and a `Config` with an empty bucket name cannot exist.

use std::fmt;
use std::path::{Path, PathBuf};

/// Default base URL of the Cloud Storage JSON API
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Where connection credentials come from
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Service account JSON key file
    KeyFile(PathBuf),
    /// Pre-obtained OAuth2 access token
    AccessToken(String),
    /// GCE metadata server (default when nothing else is configured)
    MetadataServer,
    /// No credentials at all (public buckets, local emulators)
    Anonymous,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            CredentialSource::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            CredentialSource::MetadataServer => f.write_str("MetadataServer"),
            CredentialSource::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Mount-level options passed through to the FUSE layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountSettings {
    /// Let users other than the mounting user access the filesystem
    pub allow_other: bool,
    /// User ID to report for all inodes (defaults to process uid)
    pub uid: Option<u32>,
    /// Group ID to report for all inodes (defaults to process gid)
    pub gid: Option<u32>,
}

/// Immutable configuration for one mount run
#[derive(Debug, Clone)]
pub struct Config {
    bucket: String,
    mount_point: PathBuf,
    debug: bool,
    credentials: CredentialSource,
    endpoint: String,
    mount: MountSettings,
}

impl Config {
    /// Create a configuration for mounting `bucket` at `mount_point`.
    ///
    /// Fails if the bucket name is empty. Everything else starts at its
    /// default and can be adjusted with the `with_*` methods.
    pub fn new(
        bucket: impl Into<String>,
        mount_point: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(ConfigError::MissingBucket);
        }

        Ok(Self {
            bucket,
            mount_point: mount_point.into(),
            debug: false,
            credentials: CredentialSource::MetadataServer,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            mount: MountSettings::default(),
        })
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    /// Override the storage API base URL (for emulators or private endpoints)
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be an http(s) URL, got {:?}",
                endpoint
            )));
        }
        self.endpoint = endpoint.to_string();
        Ok(self)
    }

    pub fn with_mount_settings(mut self, mount: MountSettings) -> Self {
        self.mount = mount;
        self
    }

    /// Name of the bucket to mount (never empty)
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn credentials(&self) -> &CredentialSource {
        &self.credentials
    }

    /// Storage API base URL without a trailing slash
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mount_settings(&self) -> &MountSettings {
        &self.mount
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("You must set -bucket.")]
    MissingBucket,

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bucket_rejected() {
        let result = Config::new("", "/mnt/x");
        assert!(matches!(result, Err(ConfigError::MissingBucket)));
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("my-bucket", "/mnt/x").unwrap();
        assert_eq!(config.bucket(), "my-bucket");
        assert_eq!(config.mount_point(), Path::new("/mnt/x"));
        assert!(!config.debug());
        assert_eq!(config.credentials(), &CredentialSource::MetadataServer);
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.mount_settings(), &MountSettings::default());
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let config = Config::new("b", "/mnt/x")
            .unwrap()
            .with_endpoint("http://localhost:4443/")
            .unwrap();
        assert_eq!(config.endpoint(), "http://localhost:4443");
    }

    #[test]
    fn test_endpoint_requires_scheme() {
        let result = Config::new("b", "/mnt/x")
            .unwrap()
            .with_endpoint("localhost:4443");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("localhost:4443"),
            "Error should mention endpoint: {}",
            err
        );
    }

    #[test]
    fn test_access_token_redacted_in_debug() {
        let source = CredentialSource::AccessToken("ya29.secret".to_string());
        let rendered = format!("{:?}", source);
        assert!(!rendered.contains("secret"));
    }
}
