//! File-session state: dirty flags, truncation-pending marks, and the
//! exclusive-open claim per remote path.
//!
//! The session state machine:
//!
//! ```text
//! Closed -open-> Open/clean -write-> Open/dirty
//!   Open/dirty -flush(push, sync, invalidate)-> Open/clean
//!   Open/* -release(close fd, delete mirror)-> Closed
//! ```
//!
//! A session may cycle dirty<->clean any number of times before release.
//! Releasing a dirty session without a flush silently drops the unpushed
//! writes; that is a documented property of the design, not a defect.
//!
//! All three tables are shared across kernel worker threads; every
//! operation here is a single atomic map access.

use dashmap::DashMap;
use tracing::trace;

/// Tracks per-handle and per-path session state.
#[derive(Debug, Default)]
pub struct SessionTracker {
    /// Open handle -> dirty flag. Present exactly while the handle is open.
    dirty: DashMap<u64, bool>,
    /// Remote paths whose next open must not pull remote content because
    /// the local mirror already holds the intended (possibly empty) bytes.
    truncation_pending: DashMap<String, ()>,
    /// Remote paths with a live session. A second open is rejected.
    claimed: DashMap<String, ()>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `path` for a new session. Returns false when another session
    /// already owns it; concurrent sessions on one path are rejected, not
    /// serialized.
    pub fn try_claim(&self, path: &str) -> bool {
        match self.claimed.entry(path.to_string()) {
            dashmap::Entry::Occupied(_) => false,
            dashmap::Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }

    /// Drops the exclusive claim at release.
    pub fn release_claim(&self, path: &str) {
        self.claimed.remove(path);
    }

    /// Registers a freshly opened handle as clean.
    pub fn open_session(&self, fh: u64) {
        trace!(fh, "session open");
        self.dirty.insert(fh, false);
    }

    /// Marks the handle dirty after a successful write.
    pub fn mark_dirty(&self, fh: u64) {
        if let Some(mut flag) = self.dirty.get_mut(&fh) {
            *flag = true;
        }
    }

    /// Atomically reads and clears the dirty flag at flush time.
    pub fn take_dirty(&self, fh: u64) -> bool {
        match self.dirty.get_mut(&fh) {
            Some(mut flag) => std::mem::replace(&mut *flag, false),
            None => false,
        }
    }

    /// Destroys the handle's session entry at release.
    pub fn close_session(&self, fh: u64) {
        trace!(fh, "session close");
        self.dirty.remove(&fh);
    }

    /// Marks `path` so its next open skips the remote pull.
    pub fn set_truncation_pending(&self, path: &str) {
        self.truncation_pending.insert(path.to_string(), ());
    }

    /// Atomically consumes the truncation-pending mark, reporting whether
    /// it was set. The mark is one-shot: the open that observes it clears
    /// it.
    pub fn take_truncation_pending(&self, path: &str) -> bool {
        self.truncation_pending.remove(path).is_some()
    }

    /// Number of live sessions.
    pub fn open_count(&self) -> usize {
        self.dirty.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_lifecycle() {
        let sessions = SessionTracker::new();
        sessions.open_session(7);

        // Clean until written.
        assert!(!sessions.take_dirty(7));
        sessions.mark_dirty(7);
        assert!(sessions.take_dirty(7));
        // Take clears: a second flush sees a clean session.
        assert!(!sessions.take_dirty(7));

        // Dirty/clean can cycle before release.
        sessions.mark_dirty(7);
        assert!(sessions.take_dirty(7));

        sessions.close_session(7);
        assert_eq!(sessions.open_count(), 0);
    }

    #[test]
    fn test_mark_dirty_requires_open_session() {
        let sessions = SessionTracker::new();
        sessions.mark_dirty(99);
        assert!(!sessions.take_dirty(99));
    }

    #[test]
    fn test_truncation_pending_is_one_shot() {
        let sessions = SessionTracker::new();
        sessions.set_truncation_pending("/sdcard/f");

        assert!(sessions.take_truncation_pending("/sdcard/f"));
        // Cleared by the take: the next open pulls again.
        assert!(!sessions.take_truncation_pending("/sdcard/f"));
    }

    #[test]
    fn test_exclusive_claim_per_path() {
        let sessions = SessionTracker::new();
        assert!(sessions.try_claim("/sdcard/f"));
        assert!(!sessions.try_claim("/sdcard/f"));
        // A different path is unaffected.
        assert!(sessions.try_claim("/sdcard/g"));

        sessions.release_claim("/sdcard/f");
        assert!(sessions.try_claim("/sdcard/f"));
    }

    #[test]
    fn test_concurrent_claims_admit_exactly_one() {
        use std::sync::Arc;
        use std::thread;

        let sessions = Arc::new(SessionTracker::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let sessions = Arc::clone(&sessions);
            handles.push(thread::spawn(move || sessions.try_claim("/contended")));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(wins, 1);
    }
}
