//! FUSE filesystem adapter over a bucket
//!
//! [`FuseFs`] presents a bucket's root as a read-only directory. Translating
//! object listings and reads into FUSE replies is outside this crate; the
//! adapter answers the requests the kernel needs to complete a mount and to
//! stat or list the mount point.

use std::ffi::OsStr;
use std::time::Duration;

use async_trait::async_trait;
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    ReplyStatfs, Request,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, trace};

use crate::config::{Config, MountSettings};
use crate::connector::gcs::{Bucket, BucketMetadata};
use crate::error::{GcsFuseError, Result};

/// Root directory inode (always 1 in FUSE)
pub const ROOT_INODE: u64 = 1;

/// How long the kernel may cache root attributes
const ATTR_TTL: Duration = Duration::from_secs(1);

/// Reported block and fragment size
const BLOCK_SIZE: u32 = 4096;

/// Mode of the bucket root (r-xr-xr-x)
const ROOT_MODE: u16 = 0o555;

/// Maximum file name length reported by statfs (object name component limit)
const NAME_MAX: u32 = 1024;

/// Allowed characters, starting and ending with a letter or digit
static BUCKET_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*[a-z0-9]$").unwrap());

/// Dotted-decimal IPv4 address
static IPV4_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+$").unwrap());

/// Check a bucket name against Cloud Storage naming rules.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(GcsFuseError::InvalidBucketName(format!(
            "{:?}: {}",
            name, reason
        )))
    };

    let max_len = if name.contains('.') { 222 } else { 63 };
    if name.len() < 3 || name.len() > max_len {
        return invalid(&format!("must be between 3 and {} characters", max_len));
    }
    if !BUCKET_NAME_PATTERN.is_match(name) {
        return invalid(
            "may only contain lowercase letters, digits, '-', '_' and '.', \
             and must start and end with a letter or digit",
        );
    }
    if name.split('.').any(|component| component.len() > 63) {
        return invalid("dot-separated components must be at most 63 characters");
    }
    if IPV4_PATTERN.is_match(name) {
        return invalid("must not be an IP address");
    }
    if name.starts_with("goog") || name.contains("google") {
        return invalid("must not start with \"goog\" or contain \"google\"");
    }

    Ok(())
}

/// Builds a filesystem from a bucket handle
#[async_trait]
pub trait FilesystemFactory<B: Send + 'static>: Send + Sync {
    /// Filesystem produced for a bucket
    type Filesystem: Send + 'static;

    async fn new_filesystem(&self, bucket: B, config: &Config) -> Result<Self::Filesystem>;
}

/// Factory for [`FuseFs`] over Cloud Storage buckets
#[derive(Debug, Clone, Copy, Default)]
pub struct FuseFsFactory;

#[async_trait]
impl FilesystemFactory<Bucket> for FuseFsFactory {
    type Filesystem = FuseFs;

    /// Validate the bucket name and confirm the bucket exists and is readable.
    async fn new_filesystem(&self, bucket: Bucket, config: &Config) -> Result<FuseFs> {
        validate_bucket_name(bucket.name())?;

        let metadata = bucket.metadata().await?;
        info!(
            "Bucket {:?} found (location: {}, storage class: {})",
            metadata.name,
            metadata.location.as_deref().unwrap_or("unknown"),
            metadata.storage_class.as_deref().unwrap_or("unknown")
        );

        Ok(FuseFs::new(metadata, config.mount_settings()))
    }
}

/// FUSE filesystem exposing a bucket root
pub struct FuseFs {
    bucket: BucketMetadata,
    /// User ID to report for all inodes
    uid: u32,
    /// Group ID to report for all inodes
    gid: u32,
}

impl FuseFs {
    /// Create a filesystem for `bucket`.
    ///
    /// Ownership comes from `settings`, falling back to the process owner.
    pub fn new(bucket: BucketMetadata, settings: &MountSettings) -> Self {
        let uid = settings.uid.unwrap_or_else(|| unsafe { libc::getuid() });
        let gid = settings.gid.unwrap_or_else(|| unsafe { libc::getgid() });

        Self { bucket, uid, gid }
    }

    pub fn bucket(&self) -> &BucketMetadata {
        &self.bucket
    }

    fn root_attr(&self) -> FileAttr {
        FileAttr {
            ino: ROOT_INODE,
            size: 0,
            blocks: 0,
            atime: self.bucket.updated,
            mtime: self.bucket.updated,
            ctime: self.bucket.updated,
            crtime: self.bucket.created,
            kind: FileType::Directory,
            perm: ROOT_MODE,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }
}

impl Filesystem for FuseFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        trace!("lookup: parent={} name={:?}", parent, name);
        reply.error(libc::ENOENT);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        trace!("getattr: ino={}", ino);
        if ino == ROOT_INODE {
            reply.attr(&ATTR_TTL, &self.root_attr());
        } else {
            reply.error(libc::ENOENT);
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        if ino == ROOT_INODE {
            reply.opened(0, 0);
        } else {
            reply.error(libc::ENOENT);
        }
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        trace!("readdir: ino={} offset={}", ino, offset);
        if ino != ROOT_INODE {
            reply.error(libc::ENOENT);
            return;
        }

        for (idx, name) in [".", ".."].iter().enumerate().skip(offset as usize) {
            if reply.add(ROOT_INODE, idx as i64 + 1, FileType::Directory, name) {
                break;
            }
        }
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        if ino != ROOT_INODE {
            reply.error(libc::ENOENT);
        } else if mask & libc::W_OK != 0 {
            reply.error(libc::EROFS);
        } else {
            reply.ok();
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        debug!("statfs: bucket={}", self.bucket.name);
        // Buckets have no capacity limit
        let unlimited = u64::MAX;
        reply.statfs(
            unlimited, // blocks
            unlimited, // bfree
            unlimited, // bavail
            unlimited, // files
            unlimited, // ffree
            BLOCK_SIZE,
            NAME_MAX,
            BLOCK_SIZE,
        );
    }
}
