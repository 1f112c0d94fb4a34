use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::StoreResult;

struct CacheHolder<V> {
    /// `None` is a live negative entry: the backing read answered "nothing
    /// here" and we remember that until expiry.
    value: Option<V>,
    expires: Instant,
}

/// Read-through cache with a liveness window per entry and one gate per pool.
///
/// The fast path is a lock-free-ish read under a `RwLock`. On a miss, a
/// single task at a time goes to the backing read (double-checked behind the
/// gate); the others either wait on the gate or, if a stale entry exists,
/// keep serving it for a short refresh window while the reload runs.
pub struct CachePool<K, V> {
    name: &'static str,
    entries: RwLock<HashMap<K, CacheHolder<V>>>,
    gate: Mutex<()>,
    life_span: Duration,
    refresh: Duration,
}

impl<K, V> CachePool<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, life_span: Duration, refresh: Duration) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            gate: Mutex::new(()),
            life_span,
            refresh,
        }
    }

    /// Live entry for `key`, if any. Outer `None` = miss; inner `None` = a
    /// live negative entry.
    pub fn peek(&self, key: &K) -> Option<Option<V>> {
        let entries = self.entries.read();
        let holder = entries.get(key)?;
        if holder.expires > Instant::now() {
            Some(holder.value.clone())
        } else {
            None
        }
    }

    /// Cache-first read. `read_data` runs at most once per expiry window per
    /// pool, no matter how many tasks ask concurrently.
    pub async fn load<F, Fut>(&self, key: &K, read_data: F) -> StoreResult<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<Option<V>>>,
    {
        if let Some(hit) = self.peek(key) {
            return Ok(hit);
        }
        let _gate = self.gate.lock().await;
        // Another task may have refreshed while we waited on the gate.
        if let Some(hit) = self.peek(key) {
            return Ok(hit);
        }
        self.extend_stale(key);
        let value = read_data().await?;
        self.store(key.clone(), value.clone());
        tracing::trace!(pool = self.name, "cache refill");
        Ok(value)
    }

    /// Write-through: run the backing write under the gate and, on success,
    /// replace the cached entry with `value` for a fresh liveness window.
    pub async fn save<F, Fut, T>(&self, key: K, value: Option<V>, write_data: F) -> StoreResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let _gate = self.gate.lock().await;
        let out = write_data().await?;
        self.store(key, value);
        Ok(out)
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.write().remove(key);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn store(&self, key: K, value: Option<V>) {
        self.entries.write().insert(
            key,
            CacheHolder {
                value,
                expires: Instant::now() + self.life_span,
            },
        );
    }

    /// Grant an expired entry the refresh grace window so fast-path readers
    /// keep the old value while this task reloads.
    fn extend_stale(&self, key: &K) {
        let mut entries = self.entries.write();
        if let Some(holder) = entries.get_mut(key) {
            let now = Instant::now();
            if holder.expires <= now {
                holder.expires = now + self.refresh;
            }
        }
    }
}
