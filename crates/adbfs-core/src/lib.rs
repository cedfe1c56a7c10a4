//! Core logic for adbfs: exposing an Android device's file tree, reachable
//! only through `adb` shell commands, as data a local filesystem layer can
//! serve.
//!
//! The hard part lives here: the kernel side wants synchronous, typed,
//! low-latency answers, while the only channel is a high-latency,
//! line-oriented command protocol whose output mixes data with diagnostics
//! of near-identical shape. This crate provides:
//!
//! - the detailed-listing parser and its validity heuristics ([`listing`])
//! - the per-path attribute cache with TTL freshness and optimistic
//!   forward-dating on local mutation ([`cache`])
//! - the symlink-target path translator ([`symlink`])
//! - the local mirror file manager ([`mirror`]) and the per-session
//!   dirty/truncation/exclusivity state ([`session`])
//! - the directory listing assembler ([`dirlist`]) and the cached
//!   getattr/readlink flows ([`ops`])
//! - the adb command channel behind an injected executor ([`device`]),
//!   with a scripted fake in [`testing`]
//!
//! Everything blocks: each remote operation costs one full command round
//! trip on the calling thread. Staleness within the cache TTL is an
//! accepted trade-off for round-trip avoidance.

pub mod cache;
pub mod device;
pub mod dirlist;
pub mod error;
pub mod escape;
pub mod listing;
pub mod mirror;
pub mod ops;
pub mod path;
pub mod session;
pub mod symlink;
pub mod testing;

pub use cache::{AttrCache, CachedLine, ATTR_TTL, MUTATION_EXTENSION};
pub use device::{AdbDevice, CommandRunner, HostShell};
pub use dirlist::{list_directory, DirEntry};
pub use error::{AdbError, AdbResult};
pub use listing::{FileKind, ParsedAttributes, UNKNOWN_ID};
pub use mirror::MirrorDir;
pub use ops::{attributes, read_link, AttrOutcome};
pub use session::SessionTracker;
pub use symlink::translate_target;
