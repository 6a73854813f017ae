//! Mount supervision and lifecycle
//!
//! A [`MountSupervisor`] attaches a filesystem to a mount point and returns a
//! handle with two waits: readiness (the kernel handshake finished and
//! requests are being served) and join (the filesystem was unmounted).
//!
//! [`FuseMounter`] is the FUSE implementation. It runs each session on its
//! own thread and reports back over one-shot channels, so mounting itself
//! never fails synchronously: problems surface through the readiness wait.

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use async_trait::async_trait;
use fuser::{
    Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyBmap, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyDirectoryPlus, ReplyEmpty, ReplyEntry, ReplyIoctl, ReplyLock,
    ReplyLseek, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, SessionUnmounter,
    TimeOrNow,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, MountSettings};
use crate::error::{GcsFuseError, Result};

/// Attaches filesystems of type `F` to mount points
pub trait MountSupervisor<F>: Send + Sync {
    /// Handle for a live mount
    type Mounted: MountedFs;

    /// Start mounting `fs` at `mount_point`.
    ///
    /// Never fails synchronously; failures are reported by
    /// [`MountedFs::wait_for_ready`].
    fn mount(&self, mount_point: &Path, fs: F) -> Self::Mounted;
}

/// Blocking waits on a live mount
#[async_trait]
pub trait MountedFs: Send {
    /// Wait until the mount handshake completes.
    ///
    /// Returns an error if mounting failed or `cancel` fired first.
    async fn wait_for_ready(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Wait until the filesystem is unmounted.
    ///
    /// Returns `Ok` for a clean unmount and an error if the session ended
    /// abnormally or `cancel` fired first.
    async fn join(&mut self, cancel: &CancellationToken) -> Result<()>;
}

/// Lifecycle state of a mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Mounting,
    Ready,
    Unmounted,
    Failed,
}

impl MountState {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: MountState) -> bool {
        use MountState::*;
        matches!(
            (self, next),
            (Mounting, Ready) | (Mounting, Failed) | (Ready, Unmounted) | (Ready, Failed)
        )
    }

    /// Unmounted and Failed are final
    pub fn is_terminal(self) -> bool {
        matches!(self, MountState::Unmounted | MountState::Failed)
    }
}

/// One-shot readiness notification shared between the session thread and
/// the filesystem wrapper. Only the first `fire` is delivered.
#[derive(Clone)]
struct ReadySignal {
    tx: Arc<Mutex<Option<oneshot::Sender<Result<()>>>>>,
}

impl ReadySignal {
    fn new(tx: oneshot::Sender<Result<()>>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Deliver `result` unless a result was already delivered
    fn fire(&self, result: Result<()>) -> bool {
        match self.tx.lock().take() {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

/// Where a session is in its life, as seen by [`Unmounter`]
enum SessionSlot {
    /// The mount has not been established yet
    Pending,
    Live(SessionUnmounter),
    Ended,
}

/// Triggers an unmount of a live FUSE session from any thread
#[derive(Clone)]
pub struct Unmounter {
    mount_point: PathBuf,
    session: Arc<Mutex<SessionSlot>>,
}

impl Unmounter {
    fn new(mount_point: PathBuf) -> Self {
        Self {
            mount_point,
            session: Arc::new(Mutex::new(SessionSlot::Pending)),
        }
    }

    fn attach(&self, unmounter: SessionUnmounter) {
        *self.session.lock() = SessionSlot::Live(unmounter);
    }

    fn detach(&self) {
        *self.session.lock() = SessionSlot::Ended;
    }

    /// Unmount the filesystem; the session's join then resolves cleanly.
    ///
    /// A session that already ended is not an error. Fails with
    /// [`GcsFuseError::InvalidState`] while the mount is still being set up.
    pub fn unmount(&self) -> Result<()> {
        match &mut *self.session.lock() {
            SessionSlot::Live(unmounter) => {
                info!("Unmounting {:?}", self.mount_point);
                unmounter.unmount().map_err(GcsFuseError::Io)
            }
            SessionSlot::Ended => Ok(()),
            SessionSlot::Pending => Err(GcsFuseError::InvalidState(format!(
                "{:?} is not mounted yet",
                self.mount_point
            ))),
        }
    }
}

/// Handle for a filesystem mounted by [`FuseMounter`]
pub struct MountedFileSystem {
    mount_point: PathBuf,
    state: MountState,
    ready_rx: oneshot::Receiver<Result<()>>,
    done_rx: oneshot::Receiver<Result<()>>,
    unmounter: Unmounter,
}

impl MountedFileSystem {
    fn from_parts(
        mount_point: PathBuf,
        ready_rx: oneshot::Receiver<Result<()>>,
        done_rx: oneshot::Receiver<Result<()>>,
        unmounter: Unmounter,
    ) -> Self {
        Self {
            mount_point,
            state: MountState::Mounting,
            ready_rx,
            done_rx,
            unmounter,
        }
    }

    /// Spawn the session thread for `fs` and return its handle
    fn spawn<F: Filesystem + Send + 'static>(
        mount_point: PathBuf,
        fs: F,
        options: Vec<MountOption>,
        trace_ops: bool,
    ) -> Self {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let ready = ReadySignal::new(ready_tx);
        let unmounter = Unmounter::new(mount_point.clone());

        let thread_ready = ready.clone();
        let thread_unmounter = unmounter.clone();
        let thread_mount_point = mount_point.clone();

        let spawned = thread::Builder::new()
            .name("fuse-session".to_string())
            .spawn(move || {
                let fs = Supervised::new(fs, thread_ready.clone(), trace_ops);
                let result = run_session(
                    fs,
                    &thread_mount_point,
                    &options,
                    &thread_ready,
                    &thread_unmounter,
                );
                thread_unmounter.detach();
                if let Err(e) = &result {
                    debug!("FUSE session for {:?} ended: {}", thread_mount_point, e);
                }
                let _ = done_tx.send(result);
            });

        if let Err(e) = spawned {
            unmounter.detach();
            ready.fire(Err(GcsFuseError::Mount(format!(
                "failed to spawn FUSE session thread: {}",
                e
            ))));
        }

        Self::from_parts(mount_point, ready_rx, done_rx, unmounter)
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    /// Handle that can unmount this filesystem from another thread
    pub fn unmounter(&self) -> Unmounter {
        self.unmounter.clone()
    }

    fn transition(&mut self, next: MountState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal mount transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("{:?}: {:?} -> {:?}", self.mount_point, self.state, next);
        self.state = next;
    }

    fn invalid_state(&self, action: &str) -> GcsFuseError {
        GcsFuseError::InvalidState(format!(
            "cannot {} {:?}: mount is {:?}",
            action, self.mount_point, self.state
        ))
    }
}

#[async_trait]
impl MountedFs for MountedFileSystem {
    async fn wait_for_ready(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid_state("wait for readiness of"));
        }
        if self.state == MountState::Ready {
            return Ok(());
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(GcsFuseError::Cancelled),
            received = &mut self.ready_rx => received.unwrap_or_else(|_| {
                Err(GcsFuseError::Session(
                    "FUSE session exited before signalling readiness".to_string(),
                ))
            }),
        };

        match result {
            Ok(()) => {
                self.transition(MountState::Ready);
                Ok(())
            }
            Err(e) => {
                self.transition(MountState::Failed);
                Err(e)
            }
        }
    }

    async fn join(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid_state("join"));
        }
        if self.state == MountState::Mounting {
            self.wait_for_ready(cancel).await?;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(GcsFuseError::Cancelled),
            received = &mut self.done_rx => received.unwrap_or_else(|_| {
                Err(GcsFuseError::Session(
                    "FUSE session thread exited without reporting".to_string(),
                ))
            }),
        };

        match result {
            Ok(()) => {
                self.transition(MountState::Unmounted);
                Ok(())
            }
            Err(e) => {
                self.transition(MountState::Failed);
                Err(e)
            }
        }
    }
}

/// Mount `fs` and serve it until the kernel closes the session.
///
/// Runs on the session thread. Readiness is fired here for failures that
/// happen before or instead of FUSE `init`.
fn run_session<F: Filesystem>(
    fs: Supervised<F>,
    mount_point: &Path,
    options: &[MountOption],
    ready: &ReadySignal,
    unmounter: &Unmounter,
) -> Result<()> {
    if let Err(e) = check_mount_point(mount_point) {
        let msg = e.to_string();
        ready.fire(Err(e));
        return Err(GcsFuseError::Mount(msg));
    }

    let mut session = match fuser::Session::new(fs, mount_point, options) {
        Ok(session) => session,
        Err(e) => {
            let msg = format!("mounting {:?} failed: {}", mount_point, e);
            ready.fire(Err(GcsFuseError::Mount(msg.clone())));
            return Err(GcsFuseError::Mount(msg));
        }
    };

    unmounter.attach(session.unmount_callable());
    let result = session.run();

    ready.fire(Err(GcsFuseError::Session(
        "FUSE session ended before the filesystem was ready".to_string(),
    )));

    result.map_err(|e| {
        error!("FUSE session for {:?} failed: {}", mount_point, e);
        GcsFuseError::Session(format!(
            "FUSE session for {:?} ended abnormally: {}",
            mount_point, e
        ))
    })
}

fn check_mount_point(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(GcsFuseError::NotFound(format!(
            "Mount point does not exist: {:?}",
            path
        )));
    }
    if !path.is_dir() {
        return Err(GcsFuseError::Mount(format!(
            "Mount point is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// FUSE mount supervisor
pub struct FuseMounter {
    fs_name: String,
    settings: MountSettings,
    trace_ops: bool,
    unmount_on_interrupt: bool,
}

impl FuseMounter {
    /// Create a mounter reporting `fs_name` as the mount source
    pub fn new(fs_name: impl Into<String>, settings: MountSettings) -> Self {
        Self {
            fs_name: fs_name.into(),
            settings,
            trace_ops: false,
            unmount_on_interrupt: true,
        }
    }

    /// Mounter for `config`: the bucket name is the mount source and the
    /// debug flag enables per-operation logging.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bucket(), config.mount_settings().clone())
            .with_op_tracing(config.debug())
    }

    /// Log every FUSE operation at debug level
    pub fn with_op_tracing(mut self, enabled: bool) -> Self {
        self.trace_ops = enabled;
        self
    }

    /// Unmount on SIGINT/SIGTERM (enabled by default)
    pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
        self.unmount_on_interrupt = enabled;
        self
    }

    fn mount_options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(self.fs_name.clone()),
            MountOption::Subtype("gcsfuse".to_string()),
            MountOption::RO,
            MountOption::DefaultPermissions,
        ];

        if self.settings.allow_other {
            options.push(MountOption::AllowOther);
        }

        options
    }
}

impl<F: Filesystem + Send + 'static> MountSupervisor<F> for FuseMounter {
    type Mounted = MountedFileSystem;

    fn mount(&self, mount_point: &Path, fs: F) -> MountedFileSystem {
        info!("Mounting at {:?}", mount_point);

        let mounted = MountedFileSystem::spawn(
            mount_point.to_path_buf(),
            fs,
            self.mount_options(),
            self.trace_ops,
        );

        if self.unmount_on_interrupt {
            install_interrupt_handler(mounted.unmounter());
        }

        mounted
    }
}

/// What a shutdown signal did
#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    /// The session was asked to unmount; join resolves on its own
    Unmounting,
    /// Nothing to unmount yet; the mount may be stuck, so the process exits
    Abort,
}

fn on_interrupt(unmounter: &Unmounter) -> InterruptAction {
    match unmounter.unmount() {
        Ok(()) => InterruptAction::Unmounting,
        Err(GcsFuseError::InvalidState(_)) => InterruptAction::Abort,
        Err(e) => {
            warn!("Unmount on signal failed: {}", e);
            InterruptAction::Unmounting
        }
    }
}

/// Turn SIGINT/SIGTERM into an unmount of `unmounter`'s session
fn install_interrupt_handler(unmounter: Unmounter) {
    let result = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        if on_interrupt(&unmounter) == InterruptAction::Abort {
            error!("Interrupted before {:?} was mounted", unmounter.mount_point);
            process::exit(1);
        }
    });

    if let Err(e) = result {
        warn!("Could not install signal handler: {}", e);
    }
}

/// Filesystem wrapper that reports FUSE `init` as mount readiness.
///
/// Every operation is forwarded to the inner filesystem, so anything it
/// does not implement still gets fuser's default reply.
struct Supervised<F> {
    inner: F,
    ready: ReadySignal,
    trace_ops: bool,
}

impl<F> Supervised<F> {
    fn new(inner: F, ready: ReadySignal, trace_ops: bool) -> Self {
        Self {
            inner,
            ready,
            trace_ops,
        }
    }

    fn log_op(&self, op: fmt::Arguments<'_>) {
        if self.trace_ops {
            debug!("fuse op: {}", op);
        }
    }
}

impl<F: Filesystem> Filesystem for Supervised<F> {
    fn init(
        &mut self,
        req: &Request<'_>,
        config: &mut KernelConfig,
    ) -> std::result::Result<(), libc::c_int> {
        self.log_op(format_args!("init"));
        let result = self.inner.init(req, config);
        match result {
            Ok(()) => {
                self.ready.fire(Ok(()));
            }
            Err(errno) => {
                self.ready.fire(Err(GcsFuseError::Mount(format!(
                    "filesystem init failed: {}",
                    io::Error::from_raw_os_error(errno)
                ))));
            }
        }
        result
    }

    fn destroy(&mut self) {
        self.log_op(format_args!("destroy"));
        self.inner.destroy();
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        self.log_op(format_args!("lookup parent={} name={:?}", parent, name));
        self.inner.lookup(req, parent, name, reply);
    }

    fn forget(&mut self, req: &Request<'_>, ino: u64, nlookup: u64) {
        self.log_op(format_args!("forget ino={} nlookup={}", ino, nlookup));
        self.inner.forget(req, ino, nlookup);
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        self.log_op(format_args!("getattr ino={}", ino));
        self.inner.getattr(req, ino, reply);
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        ctime: Option<SystemTime>,
        fh: Option<u64>,
        crtime: Option<SystemTime>,
        chgtime: Option<SystemTime>,
        bkuptime: Option<SystemTime>,
        flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        self.log_op(format_args!("setattr ino={}", ino));
        self.inner.setattr(
            req,
            ino,
            mode,
            uid,
            gid,
            size,
            atime,
            mtime,
            ctime,
            fh,
            crtime,
            chgtime,
            bkuptime,
            flags,
            reply,
        );
    }

    fn readlink(&mut self, req: &Request<'_>, ino: u64, reply: ReplyData) {
        self.log_op(format_args!("readlink ino={}", ino));
        self.inner.readlink(req, ino, reply);
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        self.log_op(format_args!("mknod parent={} name={:?}", parent, name));
        self.inner.mknod(req, parent, name, mode, umask, rdev, reply);
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        self.log_op(format_args!("mkdir parent={} name={:?}", parent, name));
        self.inner.mkdir(req, parent, name, mode, umask, reply);
    }

    fn unlink(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        self.log_op(format_args!("unlink parent={} name={:?}", parent, name));
        self.inner.unlink(req, parent, name, reply);
    }

    fn rmdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        self.log_op(format_args!("rmdir parent={} name={:?}", parent, name));
        self.inner.rmdir(req, parent, name, reply);
    }

    fn symlink(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        self.log_op(format_args!("symlink {:?} -> {:?}", link_name, target));
        self.inner.symlink(req, parent, link_name, target, reply);
    }

    fn rename(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        self.log_op(format_args!("rename {:?} -> {:?}", name, newname));
        self.inner.rename(req, parent, name, newparent, newname, flags, reply);
    }

    fn link(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        self.log_op(format_args!("link ino={} name={:?}", ino, newname));
        self.inner.link(req, ino, newparent, newname, reply);
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        self.log_op(format_args!("open ino={}", ino));
        self.inner.open(req, ino, flags, reply);
    }

    fn read(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        self.log_op(format_args!("read ino={} offset={} size={}", ino, offset, size));
        self.inner.read(req, ino, fh, offset, size, flags, lock_owner, reply);
    }

    fn write(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        write_flags: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let size = data.len();
        self.log_op(format_args!("write ino={} offset={} size={}", ino, offset, size));
        self.inner.write(
            req,
            ino,
            fh,
            offset,
            data,
            write_flags,
            flags,
            lock_owner,
            reply,
        );
    }

    fn flush(&mut self, req: &Request<'_>, ino: u64, fh: u64, lock_owner: u64, reply: ReplyEmpty) {
        self.log_op(format_args!("flush ino={}", ino));
        self.inner.flush(req, ino, fh, lock_owner, reply);
    }

    fn release(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        flags: i32,
        lock_owner: Option<u64>,
        flush: bool,
        reply: ReplyEmpty,
    ) {
        self.log_op(format_args!("release ino={}", ino));
        self.inner.release(req, ino, fh, flags, lock_owner, flush, reply);
    }

    fn fsync(&mut self, req: &Request<'_>, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        self.log_op(format_args!("fsync ino={}", ino));
        self.inner.fsync(req, ino, fh, datasync, reply);
    }

    fn opendir(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        self.log_op(format_args!("opendir ino={}", ino));
        self.inner.opendir(req, ino, flags, reply);
    }

    fn readdir(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        reply: ReplyDirectory,
    ) {
        self.log_op(format_args!("readdir ino={} offset={}", ino, offset));
        self.inner.readdir(req, ino, fh, offset, reply);
    }

    fn readdirplus(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        reply: ReplyDirectoryPlus,
    ) {
        self.log_op(format_args!("readdirplus ino={} offset={}", ino, offset));
        self.inner.readdirplus(req, ino, fh, offset, reply);
    }

    fn releasedir(&mut self, req: &Request<'_>, ino: u64, fh: u64, flags: i32, reply: ReplyEmpty) {
        self.log_op(format_args!("releasedir ino={}", ino));
        self.inner.releasedir(req, ino, fh, flags, reply);
    }

    fn fsyncdir(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        datasync: bool,
        reply: ReplyEmpty,
    ) {
        self.log_op(format_args!("fsyncdir ino={}", ino));
        self.inner.fsyncdir(req, ino, fh, datasync, reply);
    }

    fn statfs(&mut self, req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        self.log_op(format_args!("statfs ino={}", ino));
        self.inner.statfs(req, ino, reply);
    }

    fn setxattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        flags: i32,
        position: u32,
        reply: ReplyEmpty,
    ) {
        self.log_op(format_args!("setxattr ino={} name={:?}", ino, name));
        self.inner.setxattr(req, ino, name, value, flags, position, reply);
    }

    fn getxattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        size: u32,
        reply: ReplyXattr,
    ) {
        self.log_op(format_args!("getxattr ino={} name={:?}", ino, name));
        self.inner.getxattr(req, ino, name, size, reply);
    }

    fn listxattr(&mut self, req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        self.log_op(format_args!("listxattr ino={}", ino));
        self.inner.listxattr(req, ino, size, reply);
    }

    fn removexattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        self.log_op(format_args!("removexattr ino={} name={:?}", ino, name));
        self.inner.removexattr(req, ino, name, reply);
    }

    fn access(&mut self, req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        self.log_op(format_args!("access ino={} mask={:o}", ino, mask));
        self.inner.access(req, ino, mask, reply);
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        self.log_op(format_args!("create parent={} name={:?}", parent, name));
        self.inner.create(req, parent, name, mode, umask, flags, reply);
    }

    fn getlk(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        lock_owner: u64,
        start: u64,
        end: u64,
        typ: i32,
        pid: u32,
        reply: ReplyLock,
    ) {
        self.log_op(format_args!("getlk ino={}", ino));
        self.inner.getlk(req, ino, fh, lock_owner, start, end, typ, pid, reply);
    }

    fn setlk(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        lock_owner: u64,
        start: u64,
        end: u64,
        typ: i32,
        pid: u32,
        sleep: bool,
        reply: ReplyEmpty,
    ) {
        self.log_op(format_args!("setlk ino={}", ino));
        self.inner.setlk(req, ino, fh, lock_owner, start, end, typ, pid, sleep, reply);
    }

    fn bmap(&mut self, req: &Request<'_>, ino: u64, blocksize: u32, idx: u64, reply: ReplyBmap) {
        self.log_op(format_args!("bmap ino={}", ino));
        self.inner.bmap(req, ino, blocksize, idx, reply);
    }

    fn ioctl(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        flags: u32,
        cmd: u32,
        in_data: &[u8],
        out_size: u32,
        reply: ReplyIoctl,
    ) {
        self.log_op(format_args!("ioctl ino={} cmd={:#x}", ino, cmd));
        self.inner.ioctl(req, ino, fh, flags, cmd, in_data, out_size, reply);
    }

    fn fallocate(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        length: i64,
        mode: i32,
        reply: ReplyEmpty,
    ) {
        self.log_op(format_args!("fallocate ino={}", ino));
        self.inner.fallocate(req, ino, fh, offset, length, mode, reply);
    }

    fn lseek(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        whence: i32,
        reply: ReplyLseek,
    ) {
        self.log_op(format_args!("lseek ino={} offset={}", ino, offset));
        self.inner.lseek(req, ino, fh, offset, whence, reply);
    }

    fn copy_file_range(
        &mut self,
        req: &Request<'_>,
        ino_in: u64,
        fh_in: u64,
        offset_in: i64,
        ino_out: u64,
        fh_out: u64,
        offset_out: i64,
        len: u64,
        flags: u32,
        reply: ReplyWrite,
    ) {
        self.log_op(format_args!("copy_file_range {} -> {}", ino_in, ino_out));
        self.inner.copy_file_range(
            req,
            ino_in,
            fh_in,
            offset_in,
            ino_out,
            fh_out,
            offset_out,
            len,
            flags,
            reply,
        );
    }
}
