//! Bounded LRU cache with disposal hooks
//!
//! Keeps expensive decoded artifacts (opened datasets, manifest blobs) in
//! memory without unbounded growth:
//!
//! - Fixed capacity, true least-recently-used eviction (no sampling)
//! - Optional disposal callback that receives every evicted value
//! - Thread-safe: all bookkeeping is serialized under one mutex per instance
//! - `max_size == 0` is a valid "disabled cache" configuration
//!
//! Values are stored by clone; callers that cache heavyweight artifacts
//! should store `Arc<T>` so that promotion and lookup stay cheap.
//!
//! The cache is intentionally not serializable: there is no `Serialize`
//! impl, so any attempt to persist one is a compile error.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;

/// Cleanup function invoked with each value evicted from the cache.
pub type DisposeFn<V> = Box<dyn Fn(V) + Send + Sync>;

/// A fixed-capacity cache with least-recently-used eviction.
///
/// The set of held keys equals the set of keys most recently touched by
/// `get`/`put`, capped at `max_size`, ordered most-recently-used first.
/// Evicted values are handed to the disposal callback, which owns any
/// release logic (e.g. closing a handle); the cache never inspects value
/// semantics itself.
pub struct LruCache<K, V> {
    max_size: usize,
    dispose: Option<DisposeFn<V>>,
    state: Mutex<CacheState<K, V>>,
}

/// Key order and value map, guarded together so that no entry is ever
/// observable in both old and new state.
struct CacheState<K, V> {
    /// Most-recently-used key at the front.
    keys: VecDeque<K>,
    values: HashMap<K, V>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    /// Create a cache holding at most `max_size` entries, with no disposal
    /// callback. A `max_size` of zero disables the cache entirely.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            dispose: None,
            state: Mutex::new(CacheState {
                keys: VecDeque::new(),
                values: HashMap::new(),
            }),
        }
    }

    /// Create a cache that passes every evicted value to `dispose`.
    pub fn with_dispose(max_size: usize, dispose: impl Fn(V) + Send + Sync + 'static) -> Self {
        Self {
            max_size,
            dispose: Some(Box::new(dispose)),
            state: Mutex::new(CacheState {
                keys: VecDeque::new(),
                values: HashMap::new(),
            }),
        }
    }

    /// Maximum number of entries this cache will hold.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Current number of entries.
    pub fn size(&self) -> usize {
        self.lock().keys.len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Whether `key` is currently held. Does not affect recency.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().values.contains_key(key)
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    ///
    /// Returns `None` on a miss or when the cache is disabled. Promotion
    /// reorders the entry but never changes membership and never invokes
    /// the disposal callback.
    pub fn get(&self, key: &K) -> Option<V> {
        if self.max_size == 0 {
            return None;
        }
        let mut state = self.lock();
        let value = state.values.get(key)?.clone();
        if state.keys.front() != Some(key) {
            state.detach_key(key);
            state.keys.push_front(key.clone());
        }
        Some(value)
    }

    /// Insert or replace `key`.
    ///
    /// Replacing an existing key disposes the old value only when it
    /// differs from the new one. Inserting into a full cache first evicts
    /// the single least-recently-used entry. The new entry becomes
    /// most-recently-used. No-op when the cache is disabled.
    pub fn put(&self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }
        let disposed = {
            let mut state = self.lock();
            let mut disposed = None;
            if state.values.contains_key(&key) {
                let prev = state.values.remove(&key);
                state.detach_key(&key);
                if prev.as_ref() != Some(&value) {
                    disposed = prev;
                }
            } else if state.keys.len() == self.max_size {
                if let Some(oldest) = state.keys.pop_back() {
                    disposed = state.values.remove(&oldest);
                }
            }
            state.keys.push_front(key.clone());
            state.values.insert(key, value);
            disposed
        };
        // Callback runs after the lock is released so that user code can
        // never deadlock the cache.
        if let Some(value) = disposed {
            self.dispose_value(value);
        }
    }

    /// Remove `key`, passing its value to the disposal callback.
    ///
    /// Returns whether the key was present.
    pub fn remove(&self, key: &K) -> bool {
        let removed = {
            let mut state = self.lock();
            let removed = state.values.remove(key);
            if removed.is_some() {
                state.detach_key(key);
            }
            removed
        };
        match removed {
            Some(value) => {
                self.dispose_value(value);
                true
            }
            None => false,
        }
    }

    /// Evict every entry, invoking the disposal callback once per entry in
    /// most-recently-used-first order. The iteration is skipped entirely
    /// when no disposal callback was supplied.
    pub fn clear(&self) {
        let disposed = {
            let mut state = self.lock();
            let disposed = if self.dispose.is_some() {
                let mut values = Vec::with_capacity(state.keys.len());
                for key in &state.keys {
                    if let Some(value) = state.values.get(key) {
                        values.push(value.clone());
                    }
                }
                values
            } else {
                Vec::new()
            };
            state.keys.clear();
            state.values.clear();
            disposed
        };
        for value in disposed {
            self.dispose_value(value);
        }
    }

    /// Snapshot of the held keys, most-recently-used first.
    ///
    /// Each call re-reads current state; the result is not a live view.
    pub fn keys(&self) -> Vec<K> {
        self.lock().keys.iter().cloned().collect()
    }

    /// Snapshot of the held values, most-recently-used first.
    pub fn values(&self) -> Vec<V> {
        let state = self.lock();
        state
            .keys
            .iter()
            .filter_map(|k| state.values.get(k).cloned())
            .collect()
    }

    fn dispose_value(&self, value: V) {
        if let Some(dispose) = &self.dispose {
            dispose(value);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<K, V>> {
        // A panic inside the disposal callback must not wedge the cache.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<K, V> CacheState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn detach_key(&mut self, key: &K) {
        if let Some(pos) = self.keys.iter().position(|k| k == key) {
            self.keys.remove(pos);
        }
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = match self.state.lock() {
            Ok(state) => state.keys.len(),
            Err(poisoned) => poisoned.into_inner().keys.len(),
        };
        f.debug_struct("LruCache")
            .field("max_size", &self.max_size)
            .field("size", &size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Cache whose disposal callback records every disposed value.
    fn recording_cache(max_size: usize) -> (LruCache<String, i32>, Arc<Mutex<Vec<i32>>>) {
        let disposed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&disposed);
        let cache = LruCache::with_dispose(max_size, move |v| {
            sink.lock().unwrap().push(v);
        });
        (cache, disposed)
    }

    #[test]
    fn test_get_miss() {
        let cache: LruCache<String, i32> = LruCache::new(3);
        assert_eq!(cache.max_size(), 3);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get(&"x".to_string()), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_put_orders_most_recent_first() {
        let cache = LruCache::new(3);

        cache.put("x".to_string(), 13);
        assert_eq!(cache.get(&"x".to_string()), Some(13));
        assert_eq!(cache.keys(), vec!["x"]);

        cache.put("y".to_string(), 58);
        assert_eq!(cache.keys(), vec!["y", "x"]);

        cache.put("z".to_string(), 32);
        assert_eq!(cache.keys(), vec!["z", "y", "x"]);
        assert_eq!(cache.values(), vec![32, 58, 13]);

        // Full: inserting "u" drops the least recently used "x"
        cache.put("u".to_string(), 81);
        assert_eq!(cache.size(), 3);
        assert_eq!(cache.keys(), vec!["u", "z", "y"]);

        // Reading "y" makes it most recently used
        assert_eq!(cache.get(&"y".to_string()), Some(58));
        assert_eq!(cache.keys(), vec!["y", "u", "z"]);
    }

    #[test]
    fn test_capacity_invariant() {
        let cache = LruCache::new(4);
        for i in 0..100 {
            cache.put(format!("k{i}"), i);
            assert!(cache.size() <= cache.max_size());
        }
        assert_eq!(cache.size(), 4);
    }

    #[test]
    fn test_lru_eviction_disposes_oldest() {
        let (cache, disposed) = recording_cache(2);

        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);
        cache.put("c".to_string(), 3);

        assert_eq!(cache.keys(), vec!["c", "b"]);
        assert!(!cache.contains(&"a".to_string()));
        assert_eq!(*disposed.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_promotion_on_read_protects_entry() {
        let cache = LruCache::new(2);

        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);

        // Touch "a", then overflow: "b" must be the one evicted
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        cache.put("c".to_string(), 3);

        assert!(cache.contains(&"a".to_string()));
        assert!(!cache.contains(&"b".to_string()));
        assert!(cache.contains(&"c".to_string()));
    }

    #[test]
    fn test_zero_size_disables_cache() {
        let (cache, disposed) = recording_cache(0);

        cache.put("x".to_string(), 13);
        cache.put("y".to_string(), 58);

        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get(&"x".to_string()), None);
        assert_eq!(cache.get(&"y".to_string()), None);
        assert!(cache.keys().is_empty());
        assert!(cache.values().is_empty());
        assert!(disposed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_replace_disposes_old_value() {
        let (cache, disposed) = recording_cache(3);

        cache.put("x".to_string(), 13);
        cache.put("y".to_string(), 58);
        cache.put("z".to_string(), 32);
        assert!(disposed.lock().unwrap().is_empty());

        cache.put("y".to_string(), 59);
        assert_eq!(cache.keys(), vec!["y", "z", "x"]);
        assert_eq!(cache.values(), vec![59, 32, 13]);
        assert_eq!(*disposed.lock().unwrap(), vec![58]);
    }

    #[test]
    fn test_replace_with_equal_value_skips_disposal() {
        let (cache, disposed) = recording_cache(3);

        cache.put("x".to_string(), 13);
        cache.put("x".to_string(), 13);

        assert_eq!(cache.size(), 1);
        assert!(disposed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clear_disposes_in_recency_order() {
        let (cache, disposed) = recording_cache(3);

        cache.put("x".to_string(), 13);
        cache.put("y".to_string(), 58);
        cache.put("z".to_string(), 32);

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert!(cache.keys().is_empty());
        assert_eq!(*disposed.lock().unwrap(), vec![32, 58, 13]);
    }

    #[test]
    fn test_clear_without_dispose() {
        let cache = LruCache::new(3);
        cache.put("x".to_string(), 13);
        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_remove_disposes_value() {
        let (cache, disposed) = recording_cache(3);

        cache.put("x".to_string(), 13);
        cache.put("y".to_string(), 58);

        assert!(cache.remove(&"x".to_string()));
        assert!(!cache.remove(&"x".to_string()));
        assert_eq!(cache.keys(), vec!["y"]);
        assert_eq!(*disposed.lock().unwrap(), vec![13]);
    }

    #[test]
    fn test_concurrent_access_keeps_invariants() {
        let cache = Arc::new(LruCache::new(8));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let key = format!("k{}", (t * 31 + i) % 16);
                        cache.put(key.clone(), i);
                        cache.get(&key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.size() <= cache.max_size());
        // Every listed key must resolve
        for key in cache.keys() {
            assert!(cache.get(&key).is_some());
        }
    }
}
