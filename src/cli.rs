//! Command-line parsing
//!
//! Turns process arguments into a [`Config`]. Both the Go-style single-dash
//! spelling (`-bucket=my-bucket`, `-debug`) and the usual `--bucket` form
//! are accepted.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use thiserror::Error;

use crate::config::{Config, ConfigError, CredentialSource, MountSettings, DEFAULT_ENDPOINT};

/// Mount a Cloud Storage bucket as a local filesystem
#[derive(Parser, Debug)]
#[command(
    name = "gcsfuse",
    version,
    override_usage = "gcsfuse [flags] <mount-point>"
)]
pub struct Args {
    /// Name of the bucket to mount
    #[arg(long, default_value = "")]
    pub bucket: String,

    /// Enable debug logging, including every FUSE operation
    #[arg(long)]
    pub debug: bool,

    /// Service account JSON key file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", value_name = "PATH")]
    pub key_file: Option<PathBuf>,

    /// OAuth2 access token to send as-is
    #[arg(
        long,
        env = "GCS_ACCESS_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub access_token: Option<String>,

    /// Send no credentials (public buckets, emulators)
    #[arg(long)]
    pub anonymous: bool,

    /// Base URL of the storage JSON API
    #[arg(long, env = "GCSFUSE_ENDPOINT", default_value = DEFAULT_ENDPOINT, value_name = "URL")]
    pub endpoint: String,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Owner uid reported for all files (default: current user)
    #[arg(long)]
    pub uid: Option<u32>,

    /// Owner gid reported for all files (default: current group)
    #[arg(long)]
    pub gid: Option<u32>,

    /// Directory to mount the bucket on
    #[arg(value_name = "MOUNT_POINT")]
    pub mount_points: Vec<PathBuf>,
}

impl Args {
    fn credentials(&self) -> CredentialSource {
        if self.anonymous {
            return CredentialSource::Anonymous;
        }
        if let Some(token) = self.access_token.as_ref().filter(|t| !t.is_empty()) {
            return CredentialSource::AccessToken(token.clone());
        }
        match &self.key_file {
            Some(path) if !path.as_os_str().is_empty() => CredentialSource::KeyFile(path.clone()),
            _ => CredentialSource::MetadataServer,
        }
    }

    /// Validate the parsed flags and build the run configuration.
    ///
    /// The bucket check comes first, then the mount point count.
    pub fn into_config(mut self) -> Result<Config, UsageError> {
        if self.bucket.is_empty() {
            return Err(UsageError::MissingBucket);
        }
        if self.mount_points.len() != 1 {
            return Err(UsageError::MountPointCount(self.mount_points.len()));
        }

        let credentials = self.credentials();
        let mount = MountSettings {
            allow_other: self.allow_other,
            uid: self.uid,
            gid: self.gid,
        };
        let mount_point = self.mount_points.remove(0);

        let config = Config::new(self.bucket, mount_point)?
            .with_debug(self.debug)
            .with_credentials(credentials)
            .with_endpoint(&self.endpoint)?
            .with_mount_settings(mount);

        Ok(config)
    }
}

/// Local usage failure; reported to the user, never logged
#[derive(Debug, Error)]
pub enum UsageError {
    #[error(transparent)]
    Clap(#[from] clap::Error),

    #[error("You must set -bucket.")]
    MissingBucket,

    #[error("expected exactly one mount point, got {0}")]
    MountPointCount(usize),

    #[error(transparent)]
    Invalid(ConfigError),
}

impl From<ConfigError> for UsageError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingBucket => UsageError::MissingBucket,
            other => UsageError::Invalid(other),
        }
    }
}

impl UsageError {
    /// 0 for help/version requests, 1 for everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            UsageError::Clap(e) if !e.use_stderr() => 0,
            _ => 1,
        }
    }

    /// Text written to standard error for this failure
    pub fn report(&self) -> String {
        match self {
            UsageError::Clap(e) if !e.use_stderr() => e.to_string(),
            UsageError::Clap(e) => format!("{}\n{}", e, usage()),
            UsageError::MissingBucket | UsageError::Invalid(_) => format!("{}\n", self),
            UsageError::MountPointCount(_) => usage(),
        }
    }

    /// Print the report and terminate the process
    pub fn exit(&self) -> ! {
        eprint!("{}", self.report());
        std::process::exit(self.exit_code())
    }
}

/// Full usage text, flag descriptions included
pub fn usage() -> String {
    Args::command().render_help().to_string()
}

/// Rewrite single-dash long flags (`-bucket=x`) to `--bucket=x`.
///
/// Only names of known long flags are rewritten, so short flags such as
/// `-h` and anything after `--` pass through untouched.
pub fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let command = Args::command();
    let mut longs: Vec<&str> = command
        .get_arguments()
        .filter_map(|arg| arg.get_long())
        .collect();
    longs.extend(["help", "version"]);

    let mut passthrough = false;
    args.into_iter()
        .enumerate()
        .map(|(idx, arg)| {
            if idx == 0 || passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            match arg.to_str() {
                Some(s) if is_single_dash_long(s, &longs) => OsString::from(format!("-{}", s)),
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_long(arg: &str, longs: &[&str]) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split('=').next().unwrap_or(rest);
    longs.contains(&name)
}

/// Parse process arguments (program name first) into a [`Config`]
pub fn parse_args<I, T>(args: I) -> Result<Config, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args = normalize_args(args.into_iter().map(Into::into));
    Args::try_parse_from(args)?.into_config()
}
