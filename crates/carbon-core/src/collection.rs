//! Ordered keyed container used by every resource cache.
//!
//! `Collection` wraps an insertion-ordered map and exposes lookup, snapshot
//! views and a set of functional helpers (filter, map, partition, ...).
//! The underlying map is never handed out mutably, so owners such as
//! [`Manager`](crate::manager::Manager) can keep their own keying rules.
//!
//! Predicates receive `(key, value, collection)` so a filter can look at the
//! rest of the collection while deciding.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::BucketOutOfRange;

/// Upper bound (exclusive) on the bucket indices [`Collection::partition`]
/// accepts.
pub const MAX_PARTITION_BUCKETS: usize = 1 << 16;

#[derive(Debug, Clone)]
pub struct Collection<K, V> {
    inner: IndexMap<K, V>,
}

impl<K, V> Default for Collection<K, V> {
    fn default() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq, V> Collection<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn set(&mut self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Remove one entry, preserving the order of the others.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.shift_remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, K, V> {
        self.inner.iter()
    }

    /// Snapshot of the values in iteration order.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.values().cloned().collect()
    }

    /// Snapshot of the keys in iteration order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.keys().cloned().collect()
    }

    /// Snapshot of the key-value pairs in iteration order.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn find<F>(&self, mut predicate: F) -> Option<&V>
    where
        F: FnMut(&K, &V, &Self) -> bool,
    {
        self.inner
            .iter()
            .find(|(k, v)| predicate(k, v, self))
            .map(|(_, v)| v)
    }

    pub fn find_key<F>(&self, mut predicate: F) -> Option<&K>
    where
        F: FnMut(&K, &V, &Self) -> bool,
    {
        self.inner
            .iter()
            .find(|(k, v)| predicate(k, v, self))
            .map(|(k, _)| k)
    }

    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&K, &V, &Self) -> bool,
        K: Clone,
        V: Clone,
    {
        self.inner
            .iter()
            .filter(|(k, v)| predicate(k, v, self))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Delete every matching entry in place.
    ///
    /// The predicate sees the collection as it was before any removal.
    pub fn remove<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&K, &V, &Self) -> bool,
    {
        let doomed: Vec<bool> = {
            let this = &*self;
            this.inner
                .iter()
                .map(|(k, v)| predicate(k, v, this))
                .collect()
        };
        let mut doomed = doomed.into_iter();
        self.inner.retain(|_, _| !doomed.next().unwrap_or(false));
    }

    /// Transform values, keeping keys and order.
    pub fn map<U, F>(&self, mut mapper: F) -> Collection<K, U>
    where
        F: FnMut(&K, &V, &Self) -> U,
        K: Clone,
    {
        self.inner
            .iter()
            .map(|(k, v)| (k.clone(), mapper(k, v, self)))
            .collect()
    }

    /// Transform keys. When two entries map to the same new key the later
    /// one (in iteration order) wins, at the position of the first.
    pub fn map_keys<K2, F>(&self, mut mapper: F) -> Collection<K2, V>
    where
        K2: Hash + Eq,
        F: FnMut(&K, &V, &Self) -> K2,
        V: Clone,
    {
        self.inner
            .iter()
            .map(|(k, v)| (mapper(k, v, self), v.clone()))
            .collect()
    }

    pub fn reduce<T, F>(&self, seed: T, mut callback: F) -> T
    where
        F: FnMut(T, &V, &K, &Self) -> T,
    {
        self.inner
            .iter()
            .fold(seed, |acc, (k, v)| callback(acc, v, k, self))
    }

    /// Stops at the first entry that fails the predicate.
    pub fn every<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&K, &V, &Self) -> bool,
    {
        self.inner.iter().all(|(k, v)| predicate(k, v, self))
    }

    /// Stops at the first entry that satisfies the predicate.
    pub fn some<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&K, &V, &Self) -> bool,
    {
        self.inner.iter().any(|(k, v)| predicate(k, v, self))
    }

    pub fn includes(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.inner.values().any(|v| v == value)
    }

    pub fn key_of(&self, value: &V) -> Option<&K>
    where
        V: PartialEq,
    {
        self.inner
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(k, _)| k)
    }

    /// Invert keys and values. Duplicate values collapse to a single entry
    /// holding the last key seen for that value.
    pub fn swap(&self) -> Collection<V, K>
    where
        K: Clone,
        V: Clone + Hash + Eq,
    {
        self.inner
            .iter()
            .map(|(k, v)| (v.clone(), k.clone()))
            .collect()
    }

    /// Bucket entries by the index the predicate returns.
    ///
    /// Indices that no entry maps to stay `None`. Indices must be below
    /// [`MAX_PARTITION_BUCKETS`]; the first one that is not aborts the whole
    /// partition.
    pub fn partition<F>(&self, mut bucket: F) -> Result<Vec<Option<Self>>, BucketOutOfRange>
    where
        F: FnMut(&K, &V, &Self) -> usize,
        K: Clone,
        V: Clone,
    {
        let mut buckets: Vec<Option<Self>> = Vec::new();
        for (k, v) in &self.inner {
            let index = bucket(k, v, self);
            if index >= MAX_PARTITION_BUCKETS {
                return Err(BucketOutOfRange {
                    index,
                    limit: MAX_PARTITION_BUCKETS,
                });
            }
            if buckets.len() <= index {
                buckets.resize_with(index + 1, || None);
            }
            buckets[index]
                .get_or_insert_with(Self::new)
                .set(k.clone(), v.clone());
        }
        Ok(buckets)
    }

    /// Group entries into sub-collections by a derived key.
    pub fn partition_by_key<T, F>(&self, mut group: F) -> Collection<T, Self>
    where
        T: Hash + Eq,
        F: FnMut(&K, &V, &Self) -> T,
        K: Clone,
        V: Clone,
    {
        let mut groups: Collection<T, Self> = Collection::new();
        for (k, v) in &self.inner {
            groups
                .inner
                .entry(group(k, v, self))
                .or_default()
                .set(k.clone(), v.clone());
        }
        groups
    }

    /// Plain JSON object with every key rendered as a string.
    pub fn to_record(&self) -> serde_json::Result<Map<String, Value>>
    where
        K: fmt::Display,
        V: Serialize,
    {
        self.inner
            .iter()
            .map(|(k, v)| Ok((k.to_string(), serde_json::to_value(v)?)))
            .collect()
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for Collection<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<K: Hash + Eq, V: Eq> Eq for Collection<K, V> {}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for Collection<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for Collection<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<K, V> IntoIterator for Collection<K, V> {
    type Item = (K, V);
    type IntoIter = indexmap::map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a Collection<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = indexmap::map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<K: Serialize, V: Serialize> Serialize for Collection<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.inner.len()))?;
        for (k, v) in &self.inner {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Collection<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Collection [")?;
        for (i, (k, v)) in self.inner.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} => {}", k, v)?;
        }
        write!(f, "]>")
    }
}

// ============================================================================
// Tests
// ============================================================================
