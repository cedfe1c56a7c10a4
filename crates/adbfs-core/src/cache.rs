//! Per-path attribute cache with TTL freshness and optimistic
//! forward-dating.
//!
//! Every entry stores the most recently observed raw attribute line for one
//! remote path and when it was fetched. A stored `None` line is a distinct
//! state from "no entry": it means the path exists per a listing, but no
//! attribute line could be obtained (a permission-denied subtree, for
//! example), and callers must not re-query for it while fresh.
//!
//! Local mutations do not delete entries; they advance `fetched_at` by
//! [`MUTATION_EXTENSION`] so the very next reader does not race a remote
//! side that is still settling. Deletion ([`AttrCache::invalidate`]) is
//! reserved for operations whose correctness requires the next reader to
//! re-fetch, such as pushing new file content.
//!
//! Expiry is lazy, checked per lookup; there is no bulk sweep.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Freshness window for a cached attribute line.
pub const ATTR_TTL: Duration = Duration::from_secs(30);

/// Forward-dating offset applied before a local mutation.
pub const MUTATION_EXTENSION: Duration = Duration::from_secs(50);

#[derive(Debug, Clone)]
struct CacheEntry {
    /// `None` = path exists but no attribute line was retrievable.
    raw: Option<String>,
    fetched_at: Instant,
}

/// What a cache lookup observed for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLine {
    /// The stored raw line; `None` means "known to lack data".
    pub raw: Option<String>,
    /// Whether the entry is still within its TTL. Callers must re-fetch
    /// when this is false.
    pub fresh: bool,
}

/// Thread-safe map from canonical remote path to its last observed
/// attribute line. Each operation is a single atomic map access; the
/// lookup-then-store sequence of a cold path never exposes intermediate
/// state to concurrent readers of the same path.
#[derive(Debug, Default)]
pub struct AttrCache {
    entries: DashMap<String, CacheEntry>,
}

impl AttrCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached line for `path` and whether it is fresh, or
    /// `None` when the path has never been stored (or was invalidated).
    pub fn lookup(&self, path: &str) -> Option<CachedLine> {
        self.lookup_at(path, Instant::now())
    }

    /// Records a fetch observation at the current time. Storing `None`
    /// records "exists, no attribute data".
    pub fn store(&self, path: &str, raw: Option<String>) {
        self.store_at(path, raw, Instant::now());
    }

    /// Removes the entry entirely, forcing the next reader to re-fetch.
    pub fn invalidate(&self, path: &str) {
        trace!(path, "cache invalidate");
        self.entries.remove(path);
    }

    /// Advances `fetched_at` by `offset` without touching the stored line.
    ///
    /// A no-op for unknown paths: forward-dating must never fabricate a
    /// fresh entry out of nothing.
    pub fn extend(&self, path: &str, offset: Duration) {
        if let Some(mut entry) = self.entries.get_mut(path) {
            trace!(path, ?offset, "cache extend");
            entry.fetched_at = entry
                .fetched_at
                .checked_add(offset)
                .unwrap_or(entry.fetched_at);
        }
    }

    /// Time-injectable lookup used by tests and by [`Self::lookup`].
    pub fn lookup_at(&self, path: &str, now: Instant) -> Option<CachedLine> {
        self.entries.get(path).map(|entry| CachedLine {
            raw: entry.raw.clone(),
            // Saturates to zero elapsed for forward-dated entries.
            fresh: now.saturating_duration_since(entry.fetched_at) < ATTR_TTL,
        })
    }

    /// Time-injectable store used by tests and by [`Self::store`].
    pub fn store_at(&self, path: &str, raw: Option<String>, now: Instant) {
        trace!(path, has_line = raw.is_some(), "cache store");
        self.entries.insert(
            path.to_string(),
            CacheEntry {
                raw,
                fetched_at: now,
            },
        );
    }

    /// Number of cached paths, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
