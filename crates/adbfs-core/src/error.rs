//! Error taxonomy for remote device operations.
//!
//! Parsing and heuristic failures never show up here: the listing parser
//! degrades to defaults instead of failing. These variants cover the cases
//! where an operation cannot produce an answer at all and a kernel error
//! code must eventually be returned.

use std::io;
use thiserror::Error;

/// Errors produced while talking to the remote device or interpreting
/// its listing protocol.
#[derive(Debug, Error)]
pub enum AdbError {
    /// The remote command produced no output at all. The device is not
    /// connected, not authorized, or the adb server is down.
    #[error("remote device did not respond")]
    NoDevice,

    /// The remote tool reported a recognized permission-denied diagnostic
    /// for this path.
    #[error("permission denied on remote path {0}")]
    PermissionDenied(String),

    /// The listing output for this path was a diagnostic line of unknown
    /// shape; treated conservatively as a missing entry.
    #[error("remote path not found: {0}")]
    NotFound(String),

    /// A readlink was issued against an entry whose attribute line carries
    /// no link-target marker.
    #[error("entry is not a symlink")]
    NotASymlink,

    /// The translated symlink target (including any `../` re-anchoring
    /// prefix) does not fit the caller-supplied capacity.
    #[error("translated link target needs {needed} bytes, capacity is {capacity}")]
    TargetTooLong { needed: usize, capacity: usize },

    /// The command executor itself failed (spawn error, broken pipe, ...).
    /// Remote failures are not retried; the next call simply tries again.
    #[error("command execution failed: {0}")]
    Exec(#[from] io::Error),
}

/// Result alias for device-facing operations.
pub type AdbResult<T> = Result<T, AdbError>;
