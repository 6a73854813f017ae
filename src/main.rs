//! gcsfuse entry point

use std::process;

use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gcsfuse::cli;
use gcsfuse::connector::gcs::GcsConnector;
use gcsfuse::fuse::FuseFsFactory;
use gcsfuse::lifecycle::LOG_TARGET;
use gcsfuse::mount::FuseMounter;

/// `RUST_LOG` if set, else info (debug for our own crate with `-debug`).
///
/// Lifecycle milestones and the fatal line are always let through.
fn log_filter(debug: bool) -> EnvFilter {
    let (fallback, lifecycle_level) = if debug {
        ("gcsfuse=debug,info", "debug")
    } else {
        ("info", "info")
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    match format!("{}={}", LOG_TARGET, lifecycle_level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

#[tokio::main]
async fn main() {
    // Usage problems are reported before logging exists or anything is contacted
    let config = match cli::parse_args(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => e.exit(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(config.debug()))
        .with_writer(std::io::stderr)
        .init();

    let mounter = FuseMounter::from_config(&config);

    // Never cancelled: readiness and join block until the mount resolves
    let cancel = CancellationToken::new();

    let result = gcsfuse::run(&config, &GcsConnector, &FuseFsFactory, &mounter, &cancel).await;
    if let Err(e) = result {
        error!(target: LOG_TARGET, "{}", e);
        process::exit(1);
    }
}
