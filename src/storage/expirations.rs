//! Expiration Index Module
//!
//! Groups keys by the exact instant they expire at. Kept in lockstep with the
//! `Cache` by `StorageService`: every cached key sits in exactly one group,
//! the one matching its item's `expires_at`.

use std::collections::BTreeMap;

use crate::storage::item::{Key, NEVER_EXPIRES};

// == Expiration Index ==
/// Ordered map from expiration instant to the keys expiring at that instant.
///
/// Within a group keys keep the order they were added in.
#[derive(Debug, Default)]
pub struct ExpirationIndex {
    groups: BTreeMap<i64, Vec<Key>>,
}

impl ExpirationIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Appends `key` to the group for `instant`.
    pub fn insert(&mut self, instant: i64, key: Key) {
        self.groups.entry(instant).or_default().push(key);
    }

    // == Remove ==
    /// Splices `key` out of the group for `instant`.
    ///
    /// The group is dropped once empty. Returns false if the key was not a
    /// member of that group.
    pub fn remove(&mut self, instant: i64, key: &[u8]) -> bool {
        let Some(group) = self.groups.get_mut(&instant) else {
            return false;
        };
        let Some(position) = group.iter().position(|k| k.as_ref() == key) else {
            return false;
        };

        group.remove(position);
        if group.is_empty() {
            self.groups.remove(&instant);
        }
        true
    }

    // == Expired Before ==
    /// Returns every instant strictly before `now`, oldest first.
    ///
    /// The never-expires group is excluded; instants before the epoch are
    /// not.
    pub fn expired_before(&self, now: i64) -> Vec<i64> {
        self.groups
            .range(..now)
            .map(|(instant, _)| *instant)
            .filter(|instant| *instant != NEVER_EXPIRES)
            .collect()
    }

    /// Keys currently scheduled to expire at `instant`.
    pub fn group(&self, instant: i64) -> Option<&[Key]> {
        self.groups.get(&instant).map(Vec::as_slice)
    }

    /// Number of non-empty groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates `(instant, keys)` in ascending instant order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &[Key])> {
        self.groups
            .iter()
            .map(|(instant, keys)| (*instant, keys.as_slice()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn key(s: &'static str) -> Key {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn test_insert_groups_by_instant() {
        let mut index = ExpirationIndex::new();

        index.insert(10, key("a"));
        index.insert(10, key("b"));
        index.insert(20, key("c"));

        assert_eq!(index.len(), 2);
        assert_eq!(index.group(10), Some(&[key("a"), key("b")][..]));
        assert_eq!(index.group(20), Some(&[key("c")][..]));
    }

    #[test]
    fn test_remove_splices_and_drops_empty_group() {
        let mut index = ExpirationIndex::new();

        index.insert(10, key("a"));
        index.insert(10, key("b"));
        index.insert(10, key("c"));

        assert!(index.remove(10, b"b"));
        assert_eq!(index.group(10), Some(&[key("a"), key("c")][..]));

        assert!(index.remove(10, b"a"));
        assert!(index.remove(10, b"c"));
        assert!(index.group(10).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_missing() {
        let mut index = ExpirationIndex::new();
        index.insert(10, key("a"));

        assert!(!index.remove(10, b"z"));
        assert!(!index.remove(11, b"a"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_expired_before_skips_never_group() {
        let mut index = ExpirationIndex::new();

        index.insert(NEVER_EXPIRES, key("forever"));
        index.insert(5, key("old"));
        index.insert(10, key("edge"));
        index.insert(15, key("future"));

        assert_eq!(index.expired_before(10), vec![5]);
        assert_eq!(index.expired_before(11), vec![5, 10]);
        assert!(index.expired_before(1).is_empty());
        assert!(index.expired_before(i64::MIN).is_empty());
    }

    #[test]
    fn test_expired_before_includes_pre_epoch_instants() {
        let mut index = ExpirationIndex::new();

        index.insert(-5, key("ancient"));
        index.insert(NEVER_EXPIRES, key("forever"));
        index.insert(5, key("recent"));

        assert_eq!(index.expired_before(0), vec![-5]);
        assert_eq!(index.expired_before(10), vec![-5, 5]);
        assert!(index.expired_before(-5).is_empty());
    }

    #[test]
    fn test_iter_ascending() {
        let mut index = ExpirationIndex::new();
        index.insert(30, key("c"));
        index.insert(10, key("a"));

        let instants: Vec<i64> = index.iter().map(|(instant, _)| instant).collect();
        assert_eq!(instants, vec![10, 30]);
    }
}
