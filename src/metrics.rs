//! Process-local counters for sessions, items, and score submissions.
//! Cheap atomics, read via [`snapshot`]; a future status surface can expose
//! them without touching the hot paths.
use std::sync::atomic::{AtomicU64, Ordering};

static SESSIONS_STARTED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static ITEMS_SPAWNED: AtomicU64 = AtomicU64::new(0);
static ITEMS_CLICKED: AtomicU64 = AtomicU64::new(0);
static ITEMS_EXPIRED: AtomicU64 = AtomicU64::new(0);
static SUBMISSIONS_REMOTE: AtomicU64 = AtomicU64::new(0);
static SUBMISSIONS_DEGRADED: AtomicU64 = AtomicU64::new(0);

pub fn record_session_start() {
    SESSIONS_STARTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_session_end() {
    SESSIONS_COMPLETED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_items_spawned(count: u64) {
    ITEMS_SPAWNED.fetch_add(count, Ordering::Relaxed);
}

pub fn record_item_clicked() {
    ITEMS_CLICKED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_item_expired() {
    ITEMS_EXPIRED.fetch_add(1, Ordering::Relaxed);
}

/// Record a submission outcome. `degraded` means the remote write failed
/// and only the local fallback record was kept.
pub fn record_submission(degraded: bool) {
    if degraded {
        SUBMISSIONS_DEGRADED.fetch_add(1, Ordering::Relaxed);
    } else {
        SUBMISSIONS_REMOTE.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub items_spawned: u64,
    pub items_clicked: u64,
    pub items_expired: u64,
    pub submissions_remote: u64,
    pub submissions_degraded: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        sessions_started: SESSIONS_STARTED.load(Ordering::Relaxed),
        sessions_completed: SESSIONS_COMPLETED.load(Ordering::Relaxed),
        items_spawned: ITEMS_SPAWNED.load(Ordering::Relaxed),
        items_clicked: ITEMS_CLICKED.load(Ordering::Relaxed),
        items_expired: ITEMS_EXPIRED.load(Ordering::Relaxed),
        submissions_remote: SUBMISSIONS_REMOTE.load(Ordering::Relaxed),
        submissions_degraded: SUBMISSIONS_DEGRADED.load(Ordering::Relaxed),
    }
}
