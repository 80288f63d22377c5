//! Storage Service Module
//!
//! Concurrency-safe facade over the cache, the expiration index and the
//! snapshot file. All three live behind one reader/writer lock: reads take
//! the shared side, every mutation (including snapshot I/O) takes the
//! exclusive side and holds it until done.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StorageError};
use crate::storage::cache::Cache;
use crate::storage::expirations::ExpirationIndex;
use crate::storage::item::{Item, Key};
use crate::storage::snapshot::{SnapshotDocument, SnapshotFile};
use crate::storage::stats::{StatsSnapshot, StorageStats};

/// State guarded by the service lock.
#[derive(Debug)]
struct State {
    cache: Cache,
    expirations: ExpirationIndex,
    snapshot: SnapshotFile,
}

impl State {
    /// Removes `key` from the cache and from its expiration group.
    fn remove_key(&mut self, key: &[u8]) -> Result<()> {
        let item = self
            .cache
            .delete(key)
            .ok_or_else(|| StorageError::KeyNotFound(Bytes::copy_from_slice(key)))?;
        self.expirations.remove(item.expires_at, key);
        Ok(())
    }

    /// Removes each key in turn, stopping at the first absent one.
    ///
    /// Keys removed before the failure stay removed.
    fn remove_keys<I, K>(&mut self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut removed = 0;
        for key in keys {
            self.remove_key(key.as_ref())?;
            removed += 1;
        }
        Ok(removed)
    }
}

// == Storage Service ==
/// Thread-safe key-value store with TTL expiration and snapshots.
///
/// Construct once, wrap in an `Arc`, and hand clones to the command layer
/// and to the background tasks.
pub struct StorageService {
    state: RwLock<State>,
    clock: Arc<dyn Clock>,
    stats: StorageStats,
}

impl StorageService {
    // == Constructors ==
    /// Opens (or creates) the snapshot file at `path` and builds an empty
    /// store using the system clock.
    ///
    /// Call [`load`](Self::load) afterwards to restore a previous snapshot.
    pub fn open(path: impl AsRef<Path>, bucket_count: usize) -> Result<Self> {
        let snapshot = SnapshotFile::open(path)?;
        Ok(Self::new(
            Cache::with_buckets(bucket_count),
            snapshot,
            Arc::new(SystemClock),
        ))
    }

    /// Builds a store from its parts.
    pub fn new(cache: Cache, snapshot: SnapshotFile, clock: Arc<dyn Clock>) -> Self {
        let mut expirations = ExpirationIndex::new();
        for (key, item) in cache.iter() {
            expirations.insert(item.expires_at, key.clone());
        }
        Self {
            state: RwLock::new(State {
                cache,
                expirations,
                snapshot,
            }),
            clock,
            stats: StorageStats::new(),
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous item.
    ///
    /// A `ttl_secs` of zero means the item never expires.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Bytes>, ttl_secs: u64) {
        let key = key.into();
        let item = Item::new(value.into(), ttl_secs, self.clock.now_nanos());
        let expires_at = item.expires_at;

        let mut state = self.write();
        if let Some(previous) = state.cache.put(key.clone(), item) {
            state.expirations.remove(previous.expires_at, &key);
        }
        state.expirations.insert(expires_at, key);
        drop(state);

        self.stats.record_set();
    }

    // == Get ==
    /// Returns the value for `key` if present and not yet expired.
    ///
    /// Expired items are reported as absent but left in place for the sweep.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let now = self.clock.now_nanos();
        let value = {
            let state = self.read();
            state
                .cache
                .get(key)
                .filter(|item| !item.is_expired_at(now))
                .map(|item| item.value.clone())
        };

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    // == Delete ==
    /// Removes `key`, failing with `KeyNotFound` if it has no entry.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write().remove_key(key)?;
        self.stats.record_delete();
        Ok(())
    }

    // == Delete Batch ==
    /// Removes every key in `keys` in order.
    ///
    /// Stops with `KeyNotFound` at the first absent key; earlier removals are
    /// not rolled back.
    pub fn delete_batch<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut state = self.write();
        let mut removed = 0;
        let mut outcome = Ok(());
        for key in keys {
            if let Err(err) = state.remove_key(key.as_ref()) {
                outcome = Err(err);
                break;
            }
            removed += 1;
        }
        drop(state);

        for _ in 0..removed {
            self.stats.record_delete();
        }
        outcome
    }

    // == Delete Expired ==
    /// Physically removes every key whose expiration instant has passed.
    ///
    /// Returns the number of keys removed. Never-expiring keys are not
    /// considered.
    pub fn delete_expired(&self) -> Result<usize> {
        let now = self.clock.now_nanos();
        let mut state = self.write();

        let mut removed = 0;
        for instant in state.expirations.expired_before(now) {
            let keys = state
                .expirations
                .group(instant)
                .map(<[Key]>::to_vec)
                .unwrap_or_default();
            removed += state.remove_keys(&keys)?;
        }
        drop(state);

        self.stats.record_expired(removed);
        Ok(removed)
    }

    // == Dump ==
    /// Writes the entire cache to the snapshot file, replacing its content.
    pub fn dump(&self) -> Result<()> {
        let mut state = self.write();
        let document = SnapshotDocument::capture(&state.cache);
        let raw = document.encode()?;
        state.snapshot.replace(&raw)?;
        drop(state);

        self.stats.record_dump();
        debug!(
            entries = document.entries.len(),
            bytes = raw.len(),
            "Snapshot written"
        );
        Ok(())
    }

    // == Load ==
    /// Replaces the in-memory state with the snapshot file's content.
    ///
    /// An empty file means there is no prior state and nothing changes. A
    /// file that fails to decode leaves the current state untouched. Returns
    /// the number of entries restored.
    pub fn load(&self) -> Result<usize> {
        let mut state = self.write();
        let raw = state.snapshot.read_all()?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            info!(path = %state.snapshot.path().display(), "No snapshot to load");
            return Ok(0);
        }

        let document = SnapshotDocument::decode(&raw)?;
        let mut cache = Cache::with_buckets(state.cache.bucket_count());
        let mut expirations = ExpirationIndex::new();
        for (key, item) in document.into_items() {
            let expires_at = item.expires_at;
            if let Some(previous) = cache.put(key.clone(), item) {
                expirations.remove(previous.expires_at, &key);
            }
            expirations.insert(expires_at, key);
        }

        let restored = cache.len();
        state.cache = cache;
        state.expirations = expirations;
        info!(
            path = %state.snapshot.path().display(),
            entries = restored,
            "Snapshot loaded"
        );
        Ok(restored)
    }

    // == Stop ==
    /// Releases the snapshot file. Later dumps and loads fail.
    pub fn stop(&self) {
        let mut state = self.write();
        if state.snapshot.close() {
            info!(path = %state.snapshot.path().display(), "Snapshot file closed");
        }
    }

    // == Inspection ==
    /// Number of stored entries, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.read().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().cache.is_empty()
    }

    /// Expiration instant stored for `key`, expired or not.
    pub fn expires_at(&self, key: &[u8]) -> Option<i64> {
        self.read().cache.get(key).map(|item| item.expires_at)
    }

    /// Keys scheduled to expire at exactly `instant`.
    pub fn expiration_group(&self, instant: i64) -> Vec<Key> {
        self.read()
            .expirations
            .group(instant)
            .map(<[Key]>::to_vec)
            .unwrap_or_default()
    }

    pub fn stats(&self) -> StatsSnapshot {
        let total_entries = self.len();
        self.stats.snapshot(total_entries)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.read().snapshot.path().to_path_buf()
    }

    // A panic while the lock is held cannot leave the cache and index out of
    // step: every mutation finishes both before any fallible I/O runs.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks that every cached key sits in exactly one expiration group,
    /// the one matching its item.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let state = self.read();
        let indexed: usize = state.expirations.iter().map(|(_, keys)| keys.len()).sum();
        assert_eq!(indexed, state.cache.len(), "index and cache sizes differ");

        for (key, item) in state.cache.iter() {
            let group = state
                .expirations
                .group(item.expires_at)
                .unwrap_or_else(|| panic!("no group for {:?}", key));
            let hits = group.iter().filter(|k| *k == key).count();
            assert_eq!(hits, 1, "key {:?} appears {} times in its group", key, hits);
        }
    }
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("entries", &self.len())
            .field("snapshot", &self.snapshot_path())
            .finish()
    }
}
