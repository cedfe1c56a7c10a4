//! Local mirror files.
//!
//! Remote read/write is impractical over a stateless command channel, so
//! each open remote file is shadowed by one local mirror file holding its
//! content for the lifetime of the session. All mirrors live in a single
//! private temporary directory created at startup and removed on clean
//! shutdown (RAII via [`tempfile::TempDir`]).
//!
//! The remote-path -> mirror-path mapping is a pure function and must be
//! collision-free: path separators and the escape character itself are
//! percent-encoded, so `/a/b`, `/a%2Fb` and `/a-b` all map to distinct
//! mirror files.

use crate::device::AdbDevice;
use crate::error::AdbResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The process-wide mirror directory and the path mapping into it.
#[derive(Debug)]
pub struct MirrorDir {
    dir: TempDir,
}

impl MirrorDir {
    /// Creates the private mirror directory for this mount.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("adbfs-").tempdir()?;
        info!(dir = %dir.path().display(), "mirror directory created");
        Ok(Self { dir })
    }

    /// Pure derivation of the mirror path for a remote path. No I/O.
    pub fn path_for(&self, remote: &str) -> PathBuf {
        self.dir.path().join(encode(remote))
    }

    /// Pulls the current remote content into the mirror file.
    ///
    /// Pull failures are not fatal here: for a freshly created or empty
    /// remote file the transfer may legitimately produce nothing, and the
    /// session then starts from an empty mirror.
    pub fn populate(&self, device: &AdbDevice, remote: &str) -> AdbResult<PathBuf> {
        let local = self.path_for(remote);
        device.pull(remote, &local)?;
        Ok(local)
    }

    /// Makes sure the mirror file exists (possibly empty) and returns it.
    pub fn ensure_exists(&self, remote: &str) -> io::Result<PathBuf> {
        let local = self.path_for(remote);
        if !local.exists() {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&local)?;
        }
        Ok(local)
    }

    /// Deletes the mirror file at session release. Missing files are fine;
    /// a session that never pulled has nothing to discard.
    pub fn discard(&self, remote: &str) {
        let local = self.path_for(remote);
        if let Err(e) = fs::remove_file(&local) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(remote, error = %e, "mirror discard failed");
            }
        }
    }

    /// The mirror directory itself.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

fn encode(remote: &str) -> String {
    let mut out = String::with_capacity(remote.len());
    for c in remote.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}
