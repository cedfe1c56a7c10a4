//! Error mapping from device-protocol failures to POSIX error codes.

use adbfs_core::AdbError;
use std::io;
use thiserror::Error;

/// Errors surfaced by the FUSE layer.
#[derive(Debug, Error)]
pub enum FuseError {
    /// Remote protocol or device error.
    #[error("device operation failed: {0}")]
    Adb(#[from] AdbError),

    /// Local mirror I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The kernel referenced an inode this table never produced (or one
    /// that was evicted).
    #[error("invalid inode: {0}")]
    InvalidInode(u64),

    /// The kernel referenced an unknown file handle.
    #[error("invalid file handle: {0}")]
    InvalidHandle(u64),

    /// The remote path already has a live session; concurrent sessions on
    /// one path are rejected.
    #[error("session already open for {0}")]
    SessionBusy(String),
}

impl FuseError {
    /// Converts this error to a libc error code for FUSE.
    pub fn to_errno(&self) -> i32 {
        match self {
            FuseError::Adb(e) => adb_error_to_errno(e),
            FuseError::Io(e) => io_error_to_errno(e),
            FuseError::InvalidInode(_) => libc::ENOENT,
            FuseError::InvalidHandle(_) => libc::EBADF,
            FuseError::SessionBusy(_) => libc::EBUSY,
        }
    }
}

/// Maps the device-protocol taxonomy onto errno values.
///
/// An unreachable device is a transient resource problem (`EAGAIN`), an
/// oversized translated link target is reported as unsupported (`ENOSYS`),
/// and executor failures degrade to a generic I/O error.
pub fn adb_error_to_errno(e: &AdbError) -> i32 {
    match e {
        AdbError::NoDevice => libc::EAGAIN,
        AdbError::PermissionDenied(_) => libc::EACCES,
        AdbError::NotFound(_) => libc::ENOENT,
        AdbError::NotASymlink => libc::EINVAL,
        AdbError::TargetTooLong { .. } => libc::ENOSYS,
        AdbError::Exec(_) => libc::EIO,
    }
}

/// Maps an IO error to its raw OS errno, or EIO when there is none.
pub fn io_error_to_errno(e: &io::Error) -> i32 {
    e.raw_os_error().unwrap_or(libc::EIO)
}

/// Result type for FUSE operations.
pub type FuseResult<T> = Result<T, FuseError>;

/// Extension trait to convert errors to errno.
pub trait ToErrno {
    /// Converts this error to a libc error code.
    fn to_errno(&self) -> i32;
}

impl ToErrno for AdbError {
    fn to_errno(&self) -> i32 {
        adb_error_to_errno(self)
    }
}

impl ToErrno for io::Error {
    fn to_errno(&self) -> i32 {
        io_error_to_errno(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adb_error_mapping() {
        assert_eq!(adb_error_to_errno(&AdbError::NoDevice), libc::EAGAIN);
        assert_eq!(
            adb_error_to_errno(&AdbError::PermissionDenied("/efs".into())),
            libc::EACCES
        );
        assert_eq!(
            adb_error_to_errno(&AdbError::NotFound("/x".into())),
            libc::ENOENT
        );
        assert_eq!(adb_error_to_errno(&AdbError::NotASymlink), libc::EINVAL);
        assert_eq!(
            adb_error_to_errno(&AdbError::TargetTooLong {
                needed: 5000,
                capacity: 4096
            }),
            libc::ENOSYS
        );
        let exec = AdbError::Exec(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(adb_error_to_errno(&exec), libc::EIO);
    }

    #[test]
    fn test_fuse_error_variants() {
        assert_eq!(FuseError::InvalidInode(42).to_errno(), libc::ENOENT);
        assert_eq!(FuseError::InvalidHandle(7).to_errno(), libc::EBADF);
        assert_eq!(
            FuseError::SessionBusy("/f".into()).to_errno(),
            libc::EBUSY
        );
    }

    #[test]
    fn test_io_error_passthrough() {
        let e = io::Error::from_raw_os_error(libc::ENOSPC);
        assert_eq!(io_error_to_errno(&e), libc::ENOSPC);

        let e = io::Error::other("custom error");
        assert_eq!(io_error_to_errno(&e), libc::EIO);
    }

    #[test]
    fn test_from_conversions() {
        let e: FuseError = AdbError::NoDevice.into();
        assert_eq!(e.to_errno(), libc::EAGAIN);

        let e: FuseError = io::Error::from_raw_os_error(libc::EACCES).into();
        assert_eq!(e.to_errno(), libc::EACCES);
    }
}
