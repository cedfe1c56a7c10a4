//! FUSE filesystem for Android devices over adb.
//!
//! This crate mounts a remote Android device's file tree as a local
//! filesystem. The device is reachable only through `adb` shell commands;
//! the protocol parsing, caching and session logic live in `adbfs-core`,
//! and this crate binds them to the fuser `Filesystem` trait: inode and
//! handle bookkeeping, errno mapping, and the `adbmount` binary.
//!
//! # Usage
//!
//! ```ignore
//! use adbfs_fuse::{AdbFS, MountConfig};
//!
//! let fs = AdbFS::new(MountConfig::default())?;
//! fuser::mount2(fs, mountpoint, &options)?;
//! ```

pub mod config;
pub mod error;
pub mod filesystem;
pub mod handles;
pub mod inode;

pub use config::MountConfig;
pub use error::{FuseError, FuseResult, ToErrno};
pub use filesystem::AdbFS;
pub use handles::{HandleTable, OpenFile};
pub use inode::{InodeEntry, InodeTable, ROOT_INODE};
