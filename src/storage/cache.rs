//! Cache Module
//!
//! Chained hash table mapping byte-string keys to items. Buckets are chosen
//! from a 64-bit hash of the key contents; each bucket keeps its entries in
//! insertion order.
//!
//! The table has no locking of its own. It is only touched through
//! `StorageService`, which holds the lock.

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::storage::item::{Item, Key};

/// Number of buckets used when none is configured.
pub const DEFAULT_BUCKET_COUNT: usize = 64;

/// A single chain entry.
#[derive(Debug, Clone)]
struct Node {
    key: Key,
    item: Item,
}

// == Cache ==
/// Fixed-size chained hash table.
#[derive(Debug)]
pub struct Cache {
    buckets: Vec<Vec<Node>>,
    len: usize,
}

impl Cache {
    // == Constructor ==
    /// Creates an empty cache with `DEFAULT_BUCKET_COUNT` buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKET_COUNT)
    }

    /// Creates an empty cache with `bucket_count` buckets (at least one).
    pub fn with_buckets(bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        Self {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    // == Put ==
    /// Stores `item` under `key`.
    ///
    /// An existing entry is replaced in place and its previous item returned;
    /// otherwise a new node is appended at the tail of the chain.
    pub fn put(&mut self, key: Key, item: Item) -> Option<Item> {
        let bucket = self.bucket_index(&key);
        let chain = &mut self.buckets[bucket];

        if let Some(node) = chain.iter_mut().find(|node| node.key == key) {
            return Some(std::mem::replace(&mut node.item, item));
        }

        chain.push(Node { key, item });
        self.len += 1;
        None
    }

    // == Get ==
    /// Returns the item stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&Item> {
        self.buckets[self.bucket_index(key)]
            .iter()
            .find(|node| node.key.as_ref() == key)
            .map(|node| &node.item)
    }

    // == Delete ==
    /// Removes `key`, keeping the rest of its chain in order.
    pub fn delete(&mut self, key: &[u8]) -> Option<Item> {
        let bucket = self.bucket_index(key);
        let chain = &mut self.buckets[bucket];
        let position = chain.iter().position(|node| node.key.as_ref() == key)?;

        self.len -= 1;
        Some(chain.remove(position).item)
    }

    /// Iterates every entry, bucket by bucket, each chain in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Item)> {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter().map(|node| (&node.key, &node.item)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_index(&self, key: &[u8]) -> usize {
        (hash_key(key) % self.buckets.len() as u64) as usize
    }

    #[cfg(test)]
    fn chain_len(&self, key: &[u8]) -> usize {
        self.buckets[self.bucket_index(key)].len()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable 64-bit hash of the key contents.
fn hash_key(key: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn item(value: &'static str) -> Item {
        Item::persistent(Bytes::from_static(value.as_bytes()))
    }

    #[test]
    fn test_cache_new() {
        let cache = Cache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.bucket_count(), DEFAULT_BUCKET_COUNT);
    }

    #[test]
    fn test_zero_buckets_clamped() {
        let cache = Cache::with_buckets(0);
        assert_eq!(cache.bucket_count(), 1);
    }

    #[test]
    fn test_put_and_get() {
        let mut cache = Cache::new();

        assert!(cache.put(Bytes::from("key1"), item("value1")).is_none());

        assert_eq!(cache.get(b"key1"), Some(&item("value1")));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(b"key2").is_none());
    }

    #[test]
    fn test_put_replaces_in_place() {
        let mut cache = Cache::new();

        cache.put(Bytes::from("key1"), item("value1"));
        let previous = cache.put(Bytes::from("key1"), item("value2"));

        assert_eq!(previous, Some(item("value1")));
        assert_eq!(cache.get(b"key1"), Some(&item("value2")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut cache = Cache::new();

        cache.put(Bytes::from("key1"), item("value1"));

        assert_eq!(cache.delete(b"key1"), Some(item("value1")));
        assert!(cache.is_empty());
        assert!(cache.delete(b"key1").is_none());
    }

    #[test]
    fn test_single_bucket_chain_keeps_order() {
        let mut cache = Cache::with_buckets(1);

        for key in ["a", "b", "c", "d"] {
            cache.put(Bytes::from(key), item("v"));
        }
        cache.delete(b"b");
        cache.put(Bytes::from("c"), item("w"));

        let keys: Vec<&[u8]> = cache.iter().map(|(k, _)| k.as_ref()).collect();
        assert_eq!(keys, vec![&b"a"[..], &b"c"[..], &b"d"[..]]);
        assert_eq!(cache.get(b"c"), Some(&item("w")));
    }

    #[test]
    fn test_same_length_keys_spread_across_buckets() {
        let mut cache = Cache::with_buckets(16);

        for i in 0..256 {
            cache.put(Bytes::from(format!("k{:03}", i)), item("v"));
        }

        // Every key has length 4; content hashing must still spread them out
        assert!(cache.chain_len(b"k000") < 256);
        let used = (0..256)
            .map(|i| cache.bucket_index(format!("k{:03}", i).as_bytes()))
            .collect::<std::collections::HashSet<_>>();
        assert!(used.len() > 1);
    }

    #[test]
    fn test_binary_keys_compared_exactly() {
        let mut cache = Cache::new();

        cache.put(Bytes::from_static(b"\x00\x01"), item("a"));
        cache.put(Bytes::from_static(b"\x00\x01\x00"), item("b"));

        assert_eq!(cache.get(b"\x00\x01"), Some(&item("a")));
        assert_eq!(cache.get(b"\x00\x01\x00"), Some(&item("b")));
        assert!(cache.get(b"\x00").is_none());
    }
}
