use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// Single cached value that goes stale `ttl` after it was stored.
pub struct TtlCell<T> {
    ttl: Duration,
    slot: RwLock<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCell<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn put(&self, value: T) {
        *self.slot.write().await = Some((Instant::now(), value));
    }

    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }
}

/// Keyed variant of [`TtlCell`]; each key expires on its own.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn put(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        // drop anything already stale while we hold the lock
        let ttl = self.ttl;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(key, (Instant::now(), value));
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }
}
