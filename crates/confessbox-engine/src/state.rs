use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

/// Keyed per-actor state (sessions, rate-limit stamps).
///
/// The engine only talks to this trait, so the in-memory map can be swapped
/// for a shared store when running more than one instance.
pub trait StateStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or overwrite, marking the entry as touched at `now`.
    fn set(&self, key: K, value: V, now: DateTime<Utc>);

    fn delete(&self, key: &K);

    /// Drop entries last touched before `cutoff`. Returns how many were removed.
    fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize;
}

/// Process-local `StateStore`.
pub struct MemoryStore<K, V> {
    entries: RwLock<HashMap<K, (V, DateTime<Utc>)>>,
}

impl<K, V> MemoryStore<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StateStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|(value, _)| value.clone())
    }

    fn set(&self, key: K, value: V, now: DateTime<Utc>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, (value, now));
    }

    fn delete(&self, key: &K) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, (_, touched)| *touched >= cutoff);
        before - entries.len()
    }
}
