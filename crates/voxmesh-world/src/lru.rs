use std::collections::VecDeque;
use std::hash::Hash;

use hashbrown::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

struct Entry<V> {
    value: V,
    stamp: u64,
}

/// Fixed-capacity least-recently-used map.
///
/// Recency is a queue of `(key, stamp)` records; a record is live only while
/// its stamp matches the entry's current stamp. Stale records are skipped on
/// eviction and dropped when the queue grows past twice the capacity.
pub struct LruCache<K, V> {
    map: HashMap<K, Entry<V>>,
    order: VecDeque<(K, u64)>,
    capacity: usize,
    next_stamp: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity * 2),
            capacity,
            next_stamp: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Read without touching recency or counters.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|e| &e.value)
    }

    /// Read and mark `key` most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.map.contains_key(key) {
            self.misses += 1;
            return None;
        }
        self.hits += 1;
        self.touch(key);
        self.map.get(key).map(|e| &e.value)
    }

    /// Insert or replace; returns the evicted entry when a new key overflowed capacity.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(e) = self.map.get_mut(&key) {
            e.value = value;
            self.touch(&key);
            return None;
        }
        let evicted = if self.map.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };
        let stamp = self.bump();
        self.order.push_back((key.clone(), stamp));
        self.map.insert(key, Entry { value, stamp });
        self.maybe_compact();
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.map.len(),
        }
    }

    fn bump(&mut self) -> u64 {
        let s = self.next_stamp;
        self.next_stamp += 1;
        s
    }

    fn touch(&mut self, key: &K) {
        let stamp = self.bump();
        if let Some(e) = self.map.get_mut(key) {
            e.stamp = stamp;
            self.order.push_back((key.clone(), stamp));
        }
        self.maybe_compact();
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        while let Some((k, stamp)) = self.order.pop_front() {
            let live = self.map.get(&k).is_some_and(|e| e.stamp == stamp);
            if live {
                self.evictions += 1;
                return self.map.remove(&k).map(|e| (k, e.value));
            }
        }
        None
    }

    fn maybe_compact(&mut self) {
        if self.order.len() <= self.capacity * 2 + 16 {
            return;
        }
        let map = &self.map;
        self.order
            .retain(|(k, stamp)| map.get(k).is_some_and(|e| e.stamp == *stamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_touched() {
        let mut c = LruCache::new(2);
        c.insert(1, "a");
        c.insert(2, "b");
        assert_eq!(c.get(&1), Some(&"a"));
        let evicted = c.insert(3, "c");
        assert_eq!(evicted, Some((2, "b")));
        assert!(c.contains(&1) && c.contains(&3));
        assert_eq!(c.stats().evictions, 1);
    }

    #[test]
    fn peek_does_not_touch() {
        let mut c = LruCache::new(2);
        c.insert(1, ());
        c.insert(2, ());
        assert!(c.peek(&1).is_some());
        c.insert(3, ());
        assert!(!c.contains(&1));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut c = LruCache::new(0);
        assert_eq!(c.capacity(), 1);
        c.insert(1, 1);
        c.insert(2, 2);
        assert_eq!(c.len(), 1);
        assert_eq!(c.peek(&2), Some(&2));
    }

    #[test]
    fn repeated_hits_stay_bounded() {
        let mut c = LruCache::new(4);
        for i in 0..4 {
            c.insert(i, i);
        }
        for _ in 0..10_000 {
            c.get(&0);
        }
        assert!(c.order.len() <= c.capacity * 2 + 16);
        c.insert(99, 99);
        assert!(c.contains(&0));
        assert!(!c.contains(&1));
    }

    #[test]
    fn removed_key_does_not_count_for_eviction() {
        let mut c = LruCache::new(2);
        c.insert(1, ());
        c.insert(2, ());
        c.remove(&1);
        assert_eq!(c.insert(3, ()), None);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn hit_miss_counters() {
        let mut c = LruCache::new(2);
        c.insert("k", 1);
        c.get(&"k");
        c.get(&"missing");
        let s = c.stats();
        assert_eq!((s.hits, s.misses, s.entries), (1, 1, 1));
    }
}
