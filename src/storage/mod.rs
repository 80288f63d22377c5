//! Storage Module
//!
//! In-memory key-value storage with TTL expiration and snapshot persistence.
//!
//! `StorageService` is the only entry point that is safe to share between
//! threads; the cache and the expiration index it wraps have no locking of
//! their own.

mod cache;
mod expirations;
mod item;
mod service;
mod snapshot;
mod stats;


// Re-export public types
pub use cache::{Cache, DEFAULT_BUCKET_COUNT};
pub use expirations::ExpirationIndex;
pub use item::{expiration_instant, Item, Key, NEVER_EXPIRES};
pub use service::StorageService;
pub use snapshot::{SnapshotDocument, SnapshotEntry, SnapshotFile};
pub use stats::{StatsSnapshot, StorageStats};
