//! Byte-budgeted LRU (Least Recently Used) cache.
//!
//! Used for decoded image bitmaps, where the budget is a memory size rather
//! than an entry count.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::Bitmap;

/// Default budget for decoded images (20 MiB)
pub const DEFAULT_IMAGE_CACHE_BYTES: usize = 20 * 1024 * 1024;

/// Values that know how many bytes they occupy.
pub trait Weighted {
    fn weight(&self) -> usize;
}

impl Weighted for Bitmap {
    fn weight(&self) -> usize {
        self.byte_size()
    }
}

struct Entry<V> {
    value: V,
    tick: u64,
    weight: usize,
}

/// An LRU cache bounded by the summed weight of its values.
///
/// Lookups through `get` promote the entry. A value heavier than the whole
/// budget is not stored.
pub struct LruCache<K: Hash + Eq + Clone, V: Weighted> {
    entries: HashMap<K, Entry<V>>,
    order: BTreeMap<u64, K>,
    next_tick: u64,
    used: usize,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V: Weighted> LruCache<K, V> {
    /// Create a cache holding at most `capacity` bytes.
    ///
    /// A capacity of 0 disables caching entirely.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
            used: 0,
            capacity,
        }
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Look up a value and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.bump();
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.tick);
        entry.tick = tick;
        self.order.insert(tick, key.clone());
        Some(&entry.value)
    }

    /// Look up a value without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Insert or replace a value, evicting least recently used entries.
    /// Returns `false` when the value cannot fit at all.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let weight = value.weight();
        if self.capacity == 0 || weight > self.capacity {
            self.remove(&key);
            return false;
        }
        self.remove(&key);
        let tick = self.bump();
        self.order.insert(tick, key.clone());
        self.entries.insert(key, Entry { value, tick, weight });
        self.used += weight;
        self.enforce_cap();
        true
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.tick);
        self.used -= entry.weight;
        Some(entry.value)
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.used = 0;
    }

    /// Evict oldest entries until we're at or below capacity.
    fn enforce_cap(&mut self) {
        while self.used > self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                self.used -= entry.weight;
            }
        }
    }
}
