//! Per-key async critical sections.
//!
//! Each key maps to its own `tokio::sync::Mutex`, created on first use and kept
//! in a `DashMap` so lookups for different keys do not contend. Guards are
//! owned, so they can be held across `.await` points and moved into batches.

use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct LockRegistry<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> fmt::Debug for LockRegistry<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry")
            .field("keys", &self.locks.len())
            .finish()
    }
}

impl<K> Default for LockRegistry<K>
where
    K: Eq + Hash + Clone + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LockRegistry<K>
where
    K: Eq + Hash + Clone + Ord,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn handle(&self, key: &K) -> Arc<Mutex<()>> {
        // The DashMap shard guard must be dropped before awaiting the mutex.
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        self.handle(key).lock_owned().await
    }

    /// Locks every key in ascending order, each at most once.
    pub async fn lock_many<'a, I>(&self, keys: I) -> Vec<OwnedMutexGuard<()>>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut keys: Vec<&K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
