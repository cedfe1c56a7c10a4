//! Inode management: the mapping between FUSE inode numbers and remote
//! device paths.
//!
//! The remote protocol is purely path-based and its inode numbers are
//! fakes, so this table is the only place an inode means anything: it is a
//! process-local handle for one remote path, reference-counted with the
//! kernel's `nlookup` protocol and evicted on `forget`.

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// The root inode number (FUSE convention).
pub const ROOT_INODE: u64 = 1;

/// An entry in the inode table.
#[derive(Debug)]
pub struct InodeEntry {
    /// The remote path this inode stands for.
    pub path: String,
    /// Lookup count for proper `forget()` handling.
    nlookup: AtomicU64,
}

impl InodeEntry {
    fn new(path: String, nlookup: u64) -> Self {
        Self {
            path,
            nlookup: AtomicU64::new(nlookup),
        }
    }

    /// Increments the lookup count.
    pub fn inc_nlookup(&self) {
        self.nlookup.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the lookup count by `count`, saturating at zero, and
    /// returns the new value.
    pub fn dec_nlookup(&self, count: u64) -> u64 {
        let old = self.nlookup.fetch_sub(count, Ordering::AcqRel);
        if old < count {
            self.nlookup.store(0, Ordering::Relaxed);
            0
        } else {
            old - count
        }
    }

    /// Returns the current lookup count.
    pub fn nlookup(&self) -> u64 {
        self.nlookup.load(Ordering::Relaxed)
    }
}

/// Thread-safe bidirectional inode <-> remote-path table.
pub struct InodeTable {
    by_ino: DashMap<u64, InodeEntry>,
    by_path: DashMap<String, u64>,
    next: AtomicU64,
}

impl InodeTable {
    /// Creates a new table with the root path pre-allocated.
    pub fn new() -> Self {
        let table = Self {
            by_ino: DashMap::new(),
            by_path: DashMap::new(),
            next: AtomicU64::new(ROOT_INODE + 1),
        };
        table
            .by_ino
            .insert(ROOT_INODE, InodeEntry::new("/".to_string(), 1));
        table.by_path.insert("/".to_string(), ROOT_INODE);
        table
    }

    /// Returns the inode for `path`, allocating one if needed, and
    /// increments its lookup count (the `lookup`/`mkdir`/`mknod` flavor).
    pub fn get_or_insert(&self, path: &str) -> u64 {
        self.get_or_insert_inner(path, true)
    }

    /// Like [`Self::get_or_insert`] but without touching the lookup count:
    /// per the FUSE protocol, entries returned from `readdir` must not
    /// affect `nlookup`.
    pub fn get_or_insert_no_lookup_inc(&self, path: &str) -> u64 {
        self.get_or_insert_inner(path, false)
    }

    fn get_or_insert_inner(&self, path: &str, inc: bool) -> u64 {
        match self.by_path.entry(path.to_string()) {
            dashmap::Entry::Occupied(slot) => {
                let ino = *slot.get();
                if inc {
                    if let Some(entry) = self.by_ino.get(&ino) {
                        entry.inc_nlookup();
                    }
                }
                ino
            }
            dashmap::Entry::Vacant(slot) => {
                let ino = self.next.fetch_add(1, Ordering::Relaxed);
                self.by_ino
                    .insert(ino, InodeEntry::new(path.to_string(), u64::from(inc)));
                slot.insert(ino);
                ino
            }
        }
    }

    /// Looks up an entry by inode number.
    pub fn get(&self, ino: u64) -> Option<Ref<'_, u64, InodeEntry>> {
        self.by_ino.get(&ino)
    }

    /// The remote path for an inode, cloned out of the table.
    pub fn path_of(&self, ino: u64) -> Option<String> {
        self.by_ino.get(&ino).map(|entry| entry.path.clone())
    }

    /// Looks up an inode by remote path.
    pub fn get_inode(&self, path: &str) -> Option<u64> {
        self.by_path.get(path).map(|ino| *ino)
    }

    /// Decrements the lookup count; evicts the inode when it reaches zero.
    /// Returns true if the inode was evicted. The root is never evicted.
    pub fn forget(&self, ino: u64, nlookup: u64) -> bool {
        if ino == ROOT_INODE {
            return false;
        }
        let evict = match self.by_ino.get(&ino) {
            Some(entry) => entry.dec_nlookup(nlookup) == 0,
            None => false,
        };
        if !evict {
            return false;
        }
        if let Some((_, entry)) = self.by_ino.remove(&ino) {
            self.by_path.remove_if(&entry.path, |_, mapped| *mapped == ino);
            return true;
        }
        false
    }

    /// Drops the path -> inode mapping after a delete, leaving the inode
    /// entry itself for the kernel to `forget` at its own pace.
    pub fn invalidate_path(&self, path: &str) {
        self.by_path.remove(path);
    }

    /// Re-points an inode at a new path after a rename.
    pub fn rename_path(&self, from: &str, to: &str) {
        let Some((_, ino)) = self.by_path.remove(from) else {
            return;
        };
        if let Some(mut entry) = self.by_ino.get_mut(&ino) {
            entry.path = to.to_string();
        }
        self.by_path.insert(to.to_string(), ino);
    }

    /// Number of live inodes.
    pub fn len(&self) -> usize {
        self.by_ino.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ino.is_empty()
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
