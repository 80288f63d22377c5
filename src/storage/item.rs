//! Item Module
//!
//! Defines the stored value together with its expiration instant.

use bytes::Bytes;

use crate::clock::NANOS_PER_SEC;

/// Keys are arbitrary byte strings compared by exact equality.
pub type Key = Bytes;

/// Expiration instant meaning "never expires".
pub const NEVER_EXPIRES: i64 = 0;

// == Item ==
/// A stored value and the instant after which it is logically gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// The stored value
    pub value: Bytes,
    /// Expiration instant in Unix nanoseconds, `NEVER_EXPIRES` = no expiration
    pub expires_at: i64,
}

impl Item {
    // == Constructor ==
    /// Creates an item that expires `ttl_secs` after `now_nanos`.
    ///
    /// A TTL of zero produces an item that never expires.
    pub fn new(value: Bytes, ttl_secs: u64, now_nanos: i64) -> Self {
        Self {
            value,
            expires_at: expiration_instant(ttl_secs, now_nanos),
        }
    }

    /// Creates an item that never expires.
    pub fn persistent(value: Bytes) -> Self {
        Self {
            value,
            expires_at: NEVER_EXPIRES,
        }
    }

    // == Is Expired ==
    /// Checks if the item has expired as of `now_nanos`.
    ///
    /// An item is expired once `now` is strictly past its expiration instant.
    pub fn is_expired_at(&self, now_nanos: i64) -> bool {
        self.expires_at != NEVER_EXPIRES && now_nanos > self.expires_at
    }
}

/// Computes the expiration instant for a TTL, saturating on overflow.
pub fn expiration_instant(ttl_secs: u64, now_nanos: i64) -> i64 {
    if ttl_secs == 0 {
        return NEVER_EXPIRES;
    }
    let ttl_nanos = i64::try_from(ttl_secs)
        .ok()
        .and_then(|secs| secs.checked_mul(NANOS_PER_SEC))
        .unwrap_or(i64::MAX);
    now_nanos.saturating_add(ttl_nanos)
}
