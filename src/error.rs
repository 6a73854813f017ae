use std::io;
use thiserror::Error;

/// Main error type for gcsfuse components
#[derive(Error, Debug)]
pub enum GcsFuseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Mount error: {0}")]
    Mount(String),

    #[error("FUSE session error: {0}")]
    Session(String),

    #[error("Invalid mount state: {0}")]
    InvalidState(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl GcsFuseError {
    /// Convert error to libc errno for FUSE responses
    pub fn to_errno(&self) -> i32 {
        match self {
            GcsFuseError::Config(_) => libc::EINVAL,
            GcsFuseError::Auth(_) => libc::EACCES,
            GcsFuseError::InvalidBucketName(_) => libc::EINVAL,
            GcsFuseError::NotFound(_) => libc::ENOENT,
            GcsFuseError::PermissionDenied(_) => libc::EACCES,
            GcsFuseError::Backend(_) => libc::EIO,
            GcsFuseError::Mount(_) => libc::EIO,
            GcsFuseError::Session(_) => libc::EIO,
            GcsFuseError::InvalidState(_) => libc::EINVAL,
            GcsFuseError::Cancelled => libc::EINTR,
            GcsFuseError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

/// Result type alias for gcsfuse operations
pub type Result<T> = std::result::Result<T, GcsFuseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(GcsFuseError::NotFound("x".into()).to_errno(), libc::ENOENT);
        assert_eq!(
            GcsFuseError::PermissionDenied("x".into()).to_errno(),
            libc::EACCES
        );
        assert_eq!(GcsFuseError::Cancelled.to_errno(), libc::EINTR);
    }

    #[test]
    fn test_io_error_keeps_os_errno() {
        let err = GcsFuseError::from(io::Error::from_raw_os_error(libc::EBUSY));
        assert_eq!(err.to_errno(), libc::EBUSY);

        let err = GcsFuseError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.to_errno(), libc::EIO);
    }
}
