//! Mount lifecycle orchestration
//!
//! [`run`] drives one mount from start to finish: connect to the backend,
//! build the filesystem for the configured bucket, mount it, wait for the
//! mount to become ready and then wait for it to be unmounted. Each stage
//! either hands a value to the next one or ends the run with a
//! [`LifecycleError`] naming the stage.
//!
//! Milestones are logged at info level, in this order, and only after the
//! stage they describe has actually completed:
//!
//! 1. `Initializing GCS connection.`
//! 2. `File system has been successfully mounted.`
//! 3. `Successfully unmounted.`

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::connector::{Connector, Session};
use crate::error::GcsFuseError;
use crate::fuse::FilesystemFactory;
use crate::mount::{MountSupervisor, MountedFs};

/// Target of the milestone and fatal lines; the binary keeps it enabled
/// whatever `RUST_LOG` says.
pub const LOG_TARGET: &str = "gcsfuse::lifecycle";

/// A fatal failure of one lifecycle stage
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Couldn't get GCS connection: {0}")]
    Connection(#[source] GcsFuseError),

    #[error("fs.NewFuseFS: {0}")]
    Construction(#[source] GcsFuseError),

    #[error("MountedFileSystem.WaitForReady: {0}")]
    Readiness(#[source] GcsFuseError),

    #[error("MountedFileSystem.Join: {0}")]
    Join(#[source] GcsFuseError),
}

/// Run one mount to completion.
///
/// Returns once the filesystem has been unmounted, or as soon as any stage
/// fails. Both waits observe `cancel`; pass a token that is never cancelled
/// to block until the mount resolves on its own.
pub async fn run<C, F, S>(
    config: &Config,
    connector: &C,
    factory: &F,
    supervisor: &S,
    cancel: &CancellationToken,
) -> Result<(), LifecycleError>
where
    C: Connector,
    F: FilesystemFactory<<C::Session as Session>::Bucket>,
    S: MountSupervisor<F::Filesystem>,
{
    info!(target: LOG_TARGET, "Initializing GCS connection.");
    let session = connector
        .connect(config)
        .await
        .map_err(LifecycleError::Connection)?;

    debug!("Creating file system for bucket {:?}", config.bucket());
    let bucket = session.bucket(config.bucket());
    let fs = factory
        .new_filesystem(bucket, config)
        .await
        .map_err(LifecycleError::Construction)?;

    let mut mounted = supervisor.mount(config.mount_point(), fs);

    mounted
        .wait_for_ready(cancel)
        .await
        .map_err(LifecycleError::Readiness)?;
    info!(target: LOG_TARGET, "File system has been successfully mounted.");

    mounted.join(cancel).await.map_err(LifecycleError::Join)?;
    info!(target: LOG_TARGET, "Successfully unmounted.");

    // The session backs the filesystem for as long as it is mounted
    drop(session);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_prefixes() {
        let err = LifecycleError::Connection(GcsFuseError::Auth("no credentials".into()));
        assert_eq!(
            err.to_string(),
            "Couldn't get GCS connection: Authentication error: no credentials"
        );

        let err = LifecycleError::Construction(GcsFuseError::NotFound("bucket".into()));
        assert!(err.to_string().starts_with("fs.NewFuseFS: "));

        let err = LifecycleError::Readiness(GcsFuseError::Cancelled);
        assert_eq!(
            err.to_string(),
            "MountedFileSystem.WaitForReady: Operation cancelled"
        );

        let err = LifecycleError::Join(GcsFuseError::Session("lost".into()));
        assert!(err.to_string().starts_with("MountedFileSystem.Join: "));
    }

    #[test]
    fn test_source_is_component_error() {
        use std::error::Error as _;

        let err = LifecycleError::Join(GcsFuseError::Cancelled);
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_log_target_is_module_path() {
        assert_eq!(LOG_TARGET, module_path!());
    }
}
