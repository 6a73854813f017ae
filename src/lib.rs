//! gcsfuse: mount a Google Cloud Storage bucket as a local filesystem
//!
//! The crate is organised around the mount lifecycle:
//!
//! - **Connector**: opens an authenticated session with the storage backend
//!   and hands out bucket handles ([`connector`]).
//! - **Filesystem adapter**: builds a FUSE filesystem from a bucket handle
//!   ([`fuse`]).
//! - **Mount supervisor**: mounts the filesystem and reports readiness and
//!   unmount ([`mount`]).
//! - **Lifecycle**: sequences the three and turns each failure into a
//!   stage-tagged fatal error ([`lifecycle`]).
//!
//! # Example
//!
//! ```no_run
//! use gcsfuse::config::Config;
//! use gcsfuse::connector::gcs::GcsConnector;
//! use gcsfuse::fuse::FuseFsFactory;
//! use gcsfuse::mount::FuseMounter;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new("my-bucket", "/mnt/gcs")?;
//! let mounter = FuseMounter::from_config(&config);
//!
//! gcsfuse::run(
//!     &config,
//!     &GcsConnector,
//!     &FuseFsFactory,
//!     &mounter,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod connector;
pub mod error;
pub mod fuse;
pub mod lifecycle;
pub mod mount;

pub use error::{GcsFuseError, Result};
pub use lifecycle::{run, LifecycleError};
