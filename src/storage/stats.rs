//! Storage Statistics Module
//!
//! Tracks operation counters. Counters are atomics because `get` only holds
//! the shared side of the store lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Storage Stats ==
/// Live operation counters.
#[derive(Debug, Default)]
pub struct StorageStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    expired: AtomicU64,
    dumps: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Successful reads
    pub hits: u64,
    /// Reads of absent or expired keys
    pub misses: u64,
    pub sets: u64,
    /// Explicit deletes that removed a key
    pub deletes: u64,
    /// Keys removed by the expiry sweep
    pub expired: u64,
    /// Snapshots written
    pub dumps: u64,
    /// Keys currently stored
    pub total_entries: usize,
}

impl StorageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self, count: usize) {
        self.expired.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_dump(&self) {
        self.dumps.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters, stamping in the current entry count.
    pub fn snapshot(&self, total_entries: usize) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            dumps: self.dumps.load(Ordering::Relaxed),
            total_entries,
        }
    }
}
