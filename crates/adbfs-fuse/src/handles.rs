//! Open-file handles over local mirror files.
//!
//! A handle is one open descriptor onto the mirror file of one remote
//! path. Read and write are plain positional I/O on that descriptor; all
//! remote traffic happens at open (pull) and flush (push) time.

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};

/// One open session's descriptor onto its mirror file.
#[derive(Debug)]
pub struct OpenFile {
    /// The remote path this session shadows.
    pub path: String,
    /// The open mirror-file descriptor. Closed when the entry is removed
    /// from the table and dropped.
    pub file: File,
}

/// Thread-safe table of open file handles with auto-incrementing ids.
#[derive(Debug, Default)]
pub struct HandleTable {
    entries: DashMap<u64, OpenFile>,
    next: AtomicU64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next: AtomicU64::new(1),
        }
    }

    /// Inserts an open file and returns its handle id.
    pub fn insert(&self, open_file: OpenFile) -> u64 {
        let fh = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(fh, open_file);
        fh
    }

    /// Looks up a handle.
    pub fn get(&self, fh: u64) -> Option<Ref<'_, u64, OpenFile>> {
        self.entries.get(&fh)
    }

    /// Removes a handle, returning it so the caller can finish the
    /// release protocol before the descriptor drops.
    pub fn remove(&self, fh: u64) -> Option<OpenFile> {
        self.entries.remove(&fh).map(|(_, open_file)| open_file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_file(path: &str) -> OpenFile {
        OpenFile {
            path: path.to_string(),
            file: tempfile::tempfile().unwrap(),
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let table = HandleTable::new();
        assert!(table.is_empty());

        let fh = table.insert(open_file("/f"));
        assert_eq!(fh, 1);
        assert_eq!(table.get(fh).unwrap().path, "/f");
        assert_eq!(table.len(), 1);

        let removed = table.remove(fh).unwrap();
        assert_eq!(removed.path, "/f");
        assert!(table.is_empty());
        assert!(table.remove(fh).is_none());
    }

    #[test]
    fn test_handles_are_unique() {
        let table = HandleTable::new();
        let a = table.insert(open_file("/a"));
        let b = table.insert(open_file("/b"));
        assert_ne!(a, b);
    }
}
