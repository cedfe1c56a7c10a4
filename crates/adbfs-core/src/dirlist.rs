//! Directory listing assembler.
//!
//! One `ls -l -a` round trip per directory. Each output line is classified
//! by the listing heuristic: data lines yield an entry name and populate
//! the attribute cache for `directory/name` with the full raw line;
//! permission-denied diagnostics still yield their recoverable entry name
//! but cache an absent-data mark, so a later getattr on that child answers
//! "exists, no metadata" without another round trip. Anything else is
//! dropped as noise.

use crate::cache::AttrCache;
use crate::device::AdbDevice;
use crate::error::AdbResult;
use crate::escape::escape_path;
use crate::listing::{self, denied_entry_name};
use crate::path::join_child;
use tracing::{debug, trace};

/// Lines shorter than this cannot carry either recognized shape.
const MIN_LINE_LEN: usize = 3;

/// One reported directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Bare entry name, symlink-target suffix stripped.
    pub name: String,
    /// The raw attribute line, or `None` for a permission-denied entry.
    pub raw: Option<String>,
}

/// Lists `path` on the device and populates the attribute cache per child.
///
/// An empty command output is indistinguishable from an empty directory
/// over this protocol and is reported as an empty listing. Entry order is
/// whatever the remote tool produced.
pub fn list_directory(
    device: &AdbDevice,
    cache: &AttrCache,
    path: &str,
) -> AdbResult<Vec<DirEntry>> {
    let lines = device.shell(&format!("ls -l -a '{}'", escape_path(path)))?;
    debug!(path, lines = lines.len(), "readdir listing");

    let mut entries = Vec::new();
    for line in lines {
        if line.len() < MIN_LINE_LEN {
            continue;
        }
        if listing::is_listing_data(&line) {
            let Some(parsed) = listing::parse_line(&line) else {
                continue;
            };
            if parsed.name.is_empty() {
                trace!(path, line, "skipping unparseable listing line");
                continue;
            }
            cache.store(&join_child(path, &parsed.name), Some(line.clone()));
            entries.push(DirEntry {
                name: parsed.name,
                raw: Some(line),
            });
        } else if let Some(name) = denied_entry_name(&line) {
            // Listed with no attribute data rather than omitted.
            cache.store(&join_child(path, name), None);
            entries.push(DirEntry {
                name: name.to_string(),
                raw: None,
            });
        } else {
            trace!(path, line, "dropping diagnostic line");
        }
    }
    Ok(entries)
}
