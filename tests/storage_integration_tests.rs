//! Integration Tests for the Storage Service
//!
//! Exercises the public store API end to end: expiry, deletes, snapshots and
//! concurrent access.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use ttl_store::clock::{Clock, ManualClock, NANOS_PER_SEC};
use ttl_store::storage::{Cache, SnapshotDocument, SnapshotFile, NEVER_EXPIRES};
use ttl_store::{StorageError, StorageService};

// == Helper Functions ==

struct TestStore {
    service: StorageService,
    clock: Arc<ManualClock>,
    dir: TempDir,
}

impl TestStore {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000 * NANOS_PER_SEC));
        let service = open_service(&dir, &clock);
        Self {
            service,
            clock,
            dir,
        }
    }

    /// A second service sharing the same snapshot file and clock.
    fn reopen(&self) -> StorageService {
        open_service(&self.dir, &self.clock)
    }

    fn snapshot(&self) -> SnapshotDocument {
        let raw = std::fs::read(self.dir.path().join("dump.json")).unwrap();
        SnapshotDocument::decode(&raw).unwrap()
    }
}

fn open_service(dir: &TempDir, clock: &Arc<ManualClock>) -> StorageService {
    let snapshot = SnapshotFile::open(dir.path().join("dump.json")).unwrap();
    StorageService::new(Cache::new(), snapshot, clock.clone())
}

// == Scenarios ==

#[test]
fn test_set_then_get_without_ttl() {
    let store = TestStore::new();

    store.service.set("a", "1", 0);

    assert_eq!(store.service.get(b"a"), Some(Bytes::from("1")));
}

#[test]
fn test_get_after_ttl_elapsed() {
    let store = TestStore::new();

    store.service.set("b", "2", 1);
    store.clock.advance(Duration::from_secs(2));

    assert_eq!(store.service.get(b"b"), None);
}

#[test]
fn test_delete_missing_key() {
    let store = TestStore::new();

    let err = assert_err!(store.service.delete(b"missing"));
    assert!(matches!(err, StorageError::KeyNotFound(_)));
}

#[test]
fn test_snapshot_survives_restart() {
    let store = TestStore::new();

    store.service.set("c", "x", 0);
    assert_ok!(store.service.dump());

    let restarted = store.reopen();
    assert_ok!(restarted.load());
    assert_eq!(restarted.get(b"c"), Some(Bytes::from("x")));
}

// == Properties ==

#[test]
fn test_persistent_key_outlives_any_sweep() {
    let store = TestStore::new();
    store.service.set("forever", "v", 0);

    for _ in 0..5 {
        store.clock.advance(Duration::from_secs(86_400));
        assert_ok!(store.service.delete_expired());
        assert_eq!(store.service.get(b"forever"), Some(Bytes::from("v")));
    }
    assert_eq!(
        store.service.expiration_group(NEVER_EXPIRES),
        vec![Bytes::from("forever")]
    );
}

#[test]
fn test_overwrite_changes_group_membership() {
    let store = TestStore::new();

    store.service.set("k", "v1", 0);
    store.service.set("k", "v2", 5);

    let instant = store.clock.now_nanos() + 5 * NANOS_PER_SEC;
    assert_eq!(store.service.get(b"k"), Some(Bytes::from("v2")));
    assert!(store.service.expiration_group(NEVER_EXPIRES).is_empty());
    assert_eq!(store.service.expiration_group(instant), vec![Bytes::from("k")]);
}

#[test]
fn test_swept_key_absent_from_next_snapshot() {
    let store = TestStore::new();

    store.service.set("gone", "v", 1);
    store.service.set("kept", "v", 0);
    store.clock.advance(Duration::from_secs(2));

    assert_eq!(assert_ok!(store.service.delete_expired()), 1);
    assert_eq!(store.service.get(b"gone"), None);
    assert_ok!(store.service.dump());

    let keys: Vec<Vec<u8>> = store
        .snapshot()
        .entries
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    assert_eq!(keys, vec![b"kept".to_vec()]);
}

#[test]
fn test_round_trip_preserves_expiry_instants() {
    let store = TestStore::new();

    store.service.set("a", "1", 0);
    store.service.set("b", "2", 10);
    store.service.set("c", "3", 20);
    assert_ok!(store.service.dump());

    let restarted = store.reopen();
    assert_eq!(assert_ok!(restarted.load()), 3);

    for key in [&b"a"[..], &b"b"[..], &b"c"[..]] {
        assert_eq!(restarted.get(key), store.service.get(key));
        assert_eq!(restarted.expires_at(key), store.service.expires_at(key));
    }

    // Restored groups drive the sweep just like the original ones
    store.clock.advance(Duration::from_secs(15));
    assert_eq!(assert_ok!(restarted.delete_expired()), 1);
    assert_eq!(restarted.len(), 2);
}

#[test]
fn test_load_from_missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.json");

    let service = assert_ok!(StorageService::open(&path, 16));
    assert_eq!(assert_ok!(service.load()), 0);
    assert!(service.is_empty());
    assert!(path.exists(), "Open should create the snapshot file");
}

#[test]
fn test_delete_batch_partial_failure_keeps_earlier_removals() {
    let store = TestStore::new();
    store.service.set("a", "1", 0);
    store.service.set("b", "2", 0);

    let err = assert_err!(store.service.delete_batch(["a", "nope", "b"]));

    assert!(err.is_key_not_found());
    assert_eq!(store.service.get(b"a"), None);
    assert_eq!(store.service.get(b"b"), Some(Bytes::from("2")));
}

// == Concurrency ==

#[test]
fn test_concurrent_disjoint_writers() {
    let store = TestStore::new();
    let service = Arc::new(store.reopen());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("w{}-k{}", worker, i);
                    service.set(key.clone(), format!("v{}", i), 0);
                    assert_eq!(service.get(key.as_bytes()), Some(Bytes::from(format!("v{}", i))));
                    if i % 2 == 0 {
                        service.delete(key.as_bytes()).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(service.len(), 8 * 100);
    for worker in 0..8 {
        for i in (1..200).step_by(2) {
            let key = format!("w{}-k{}", worker, i);
            assert_eq!(service.get(key.as_bytes()), Some(Bytes::from(format!("v{}", i))));
        }
    }
}

#[test]
fn test_reader_sees_whole_values_during_overwrites() {
    let store = TestStore::new();
    let service = Arc::new(store.reopen());
    let old = Bytes::from(vec![b'o'; 4096]);
    let new = Bytes::from(vec![b'n'; 4096]);
    service.set("shared", old.clone(), 0);

    let writer = {
        let service = Arc::clone(&service);
        let (old, new) = (old.clone(), new.clone());
        thread::spawn(move || {
            for i in 0..500 {
                let value = if i % 2 == 0 { new.clone() } else { old.clone() };
                service.set("shared", value, 0);
            }
        })
    };

    for _ in 0..500 {
        let value = service.get(b"shared").unwrap();
        assert!(value == old || value == new, "Observed a torn value");
    }
    writer.join().unwrap();
}

#[test]
fn test_dump_concurrent_with_writes() {
    let store = TestStore::new();
    let service = Arc::new(store.reopen());

    let writer = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for i in 0..300 {
                service.set(format!("k{}", i), "v", 0);
            }
        })
    };
    for _ in 0..10 {
        assert_ok!(service.dump());
    }
    writer.join().unwrap();
    assert_ok!(service.dump());

    assert_eq!(store.snapshot().entries.len(), 300);
}
