//! Entity Cache
//!
//! In-process identifier → entity map with one coarse lock per entity type.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::infrastructure::metrics;

/// Write-through cache of one entity type.
///
/// Cloning yields another handle to the same map. Values are cloned out on
/// read so no lock outlives a call; nothing here ever awaits or touches
/// storage. Entries are never evicted on their own.
pub struct EntityCache<K, V> {
    name: &'static str,
    entries: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for EntityCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> EntityCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache; `name` labels its metrics.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Clone out the entry stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let value = self.entries.read().get(key).cloned();
        metrics::record_cache_lookup(self.name, value.is_some());
        value
    }

    /// Insert or overwrite the entry under `key`.
    pub fn put(&self, key: K, value: V) {
        let len = {
            let mut entries = self.entries.write();
            entries.insert(key, value);
            entries.len()
        };
        metrics::set_cache_entries(self.name, len);
    }

    /// Evict the entry under `key`, returning it if present.
    pub fn invalidate<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let (removed, len) = {
            let mut entries = self.entries.write();
            (entries.remove(key), entries.len())
        };
        metrics::set_cache_entries(self.name, len);
        removed
    }

    /// Evict every entry matching `pred`, returning the evicted values.
    pub fn invalidate_where<F>(&self, mut pred: F) -> Vec<V>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let (evicted, len) = {
            let mut entries = self.entries.write();
            let mut evicted = Vec::new();
            entries.retain(|k, v| {
                if pred(k, v) {
                    evicted.push(v.clone());
                    false
                } else {
                    true
                }
            });
            (evicted, entries.len())
        };
        metrics::set_cache_entries(self.name, len);
        evicted
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        metrics::set_cache_entries(self.name, 0);
    }
}
