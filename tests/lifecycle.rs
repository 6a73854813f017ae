//! Lifecycle orchestration tests
//!
//! Drives `gcsfuse::run` with in-memory collaborators and checks stage
//! ordering, short-circuiting on failure and the logged milestones.

use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

use gcsfuse::config::Config;
use gcsfuse::connector::{Connector, Session};
use gcsfuse::fuse::FilesystemFactory;
use gcsfuse::mount::{MountSupervisor, MountedFs};
use gcsfuse::{GcsFuseError, LifecycleError, Result};

const CONNECTING: &str = "Initializing GCS connection.";
const MOUNTED: &str = "File system has been successfully mounted.";
const UNMOUNTED: &str = "Successfully unmounted.";

/// Ordered record of collaborator calls
#[derive(Clone, Default)]
struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    fn snapshot(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Which stage, if any, should fail
#[derive(Clone, Copy, PartialEq, Eq)]
enum FailAt {
    Nothing,
    Connect,
    Construct,
    Ready,
    Join,
}

struct FakeConnector {
    events: Events,
    fail: FailAt,
}

struct FakeSession {
    events: Events,
}

#[async_trait]
impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, _config: &Config) -> Result<FakeSession> {
        self.events.push("connect");
        if self.fail == FailAt::Connect {
            return Err(GcsFuseError::Auth("invalid_grant".into()));
        }
        Ok(FakeSession {
            events: self.events.clone(),
        })
    }
}

impl Session for FakeSession {
    type Bucket = String;

    fn bucket(&self, name: &str) -> String {
        self.events.push(format!("bucket {}", name));
        name.to_string()
    }
}

struct FakeFactory {
    events: Events,
    fail: FailAt,
}

struct FakeFs {
    bucket: String,
}

#[async_trait]
impl FilesystemFactory<String> for FakeFactory {
    type Filesystem = FakeFs;

    async fn new_filesystem(&self, bucket: String, _config: &Config) -> Result<FakeFs> {
        self.events.push(format!("construct {}", bucket));
        if self.fail == FailAt::Construct {
            return Err(GcsFuseError::NotFound(format!("bucket {:?}", bucket)));
        }
        Ok(FakeFs { bucket })
    }
}

struct FakeSupervisor {
    events: Events,
    fail: FailAt,
}

struct FakeMount {
    events: Events,
    fail: FailAt,
}

impl MountSupervisor<FakeFs> for FakeSupervisor {
    type Mounted = FakeMount;

    fn mount(&self, mount_point: &Path, fs: FakeFs) -> FakeMount {
        self.events
            .push(format!("mount {} at {}", fs.bucket, mount_point.display()));
        FakeMount {
            events: self.events.clone(),
            fail: self.fail,
        }
    }
}

#[async_trait]
impl MountedFs for FakeMount {
    async fn wait_for_ready(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.events.push("wait_for_ready");
        if cancel.is_cancelled() {
            return Err(GcsFuseError::Cancelled);
        }
        if self.fail == FailAt::Ready {
            return Err(GcsFuseError::Mount("fusermount: permission denied".into()));
        }
        Ok(())
    }

    async fn join(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.events.push("join");
        if cancel.is_cancelled() {
            return Err(GcsFuseError::Cancelled);
        }
        if self.fail == FailAt::Join {
            return Err(GcsFuseError::Session("connection aborted".into()));
        }
        Ok(())
    }
}

/// Log sink shared with the test
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Milestone lines, in the order they were logged
    fn milestones(&self) -> Vec<&'static str> {
        self.contents()
            .lines()
            .filter_map(|line| {
                [CONNECTING, MOUNTED, UNMOUNTED]
                    .into_iter()
                    .find(|m| line.contains(m))
            })
            .collect()
    }
}

struct Outcome {
    result: std::result::Result<(), LifecycleError>,
    events: Vec<String>,
    logs: LogBuffer,
}

async fn run_with(fail: FailAt, cancel: CancellationToken) -> Outcome {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let events = Events::default();
    let config = Config::new("my-bucket", "/mnt/x").unwrap();

    let result = gcsfuse::run(
        &config,
        &FakeConnector {
            events: events.clone(),
            fail,
        },
        &FakeFactory {
            events: events.clone(),
            fail,
        },
        &FakeSupervisor {
            events: events.clone(),
            fail,
        },
        &cancel,
    )
    .await;

    Outcome {
        result,
        events: events.snapshot(),
        logs,
    }
}

/// Every stage succeeds: all milestones in order, every stage called once
#[tokio::test]
async fn test_clean_run() {
    let outcome = run_with(FailAt::Nothing, CancellationToken::new()).await;

    assert_ok!(outcome.result);
    assert_eq!(
        outcome.events,
        vec![
            "connect",
            "bucket my-bucket",
            "construct my-bucket",
            "mount my-bucket at /mnt/x",
            "wait_for_ready",
            "join",
        ]
    );
    assert_eq!(outcome.logs.milestones(), vec![CONNECTING, MOUNTED, UNMOUNTED]);
}

/// A failed connection never reaches construction or mounting
#[tokio::test]
async fn test_connection_failure() {
    let outcome = run_with(FailAt::Connect, CancellationToken::new()).await;

    let err = assert_err!(outcome.result);
    assert!(matches!(err, LifecycleError::Connection(_)));
    assert!(err.to_string().starts_with("Couldn't get GCS connection: "));
    assert_eq!(outcome.events, vec!["connect"]);
    assert_eq!(outcome.logs.milestones(), vec![CONNECTING]);
}

/// A failed construction never mounts
#[tokio::test]
async fn test_construction_failure() {
    let outcome = run_with(FailAt::Construct, CancellationToken::new()).await;

    let err = assert_err!(outcome.result);
    assert!(matches!(err, LifecycleError::Construction(_)));
    assert!(err.to_string().starts_with("fs.NewFuseFS: "));
    assert!(!outcome.events.iter().any(|e| e.starts_with("mount")));
    assert_eq!(outcome.logs.milestones(), vec![CONNECTING]);
}

/// A failed readiness wait logs no "mounted" milestone and skips join
#[tokio::test]
async fn test_readiness_failure() {
    let outcome = run_with(FailAt::Ready, CancellationToken::new()).await;

    let err = assert_err!(outcome.result);
    assert!(matches!(err, LifecycleError::Readiness(_)));
    assert!(err.to_string().starts_with("MountedFileSystem.WaitForReady: "));
    assert_eq!(outcome.events.last().map(String::as_str), Some("wait_for_ready"));
    assert!(!outcome.events.iter().any(|e| e == "join"));
    assert_eq!(outcome.logs.milestones(), vec![CONNECTING]);
}

/// An abnormal unmount keeps the first two milestones but not the last
#[tokio::test]
async fn test_join_failure() {
    let outcome = run_with(FailAt::Join, CancellationToken::new()).await;

    let err = assert_err!(outcome.result);
    assert!(matches!(err, LifecycleError::Join(_)));
    assert_eq!(
        err.to_string(),
        "MountedFileSystem.Join: FUSE session error: connection aborted"
    );
    assert_eq!(outcome.logs.milestones(), vec![CONNECTING, MOUNTED]);
    assert!(!outcome.logs.contents().contains(UNMOUNTED));
}

/// The cancellation token reaches the supervisor's waits
#[tokio::test]
async fn test_cancellation_is_passed_through() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = run_with(FailAt::Nothing, cancel).await;

    let err = assert_err!(outcome.result);
    assert!(matches!(
        err,
        LifecycleError::Readiness(GcsFuseError::Cancelled)
    ));
    assert_eq!(outcome.logs.milestones(), vec![CONNECTING]);
}
