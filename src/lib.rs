//! TTL Store - an in-memory key-value store
//!
//! Provides byte-string storage with per-key TTL expiration, a periodic
//! expiry sweep and periodic full snapshots to disk.

pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod tasks;

pub use config::Config;
pub use error::{Result, StorageError};
pub use storage::StorageService;
pub use tasks::{Deleter, Dumper};
