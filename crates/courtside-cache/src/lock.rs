//! Per-key coordination.
//!
//! A map of async mutexes keyed by [`ResourceKey`]. The map itself is only held
//! long enough to clone or drop an entry; the per-key mutex is what callers
//! hold across an upstream fetch or a store write. Each mutex guards a slot
//! the holder can leave a value in for whoever is waiting next. Entries are
//! removed when the last holder releases, so idle keys cost nothing and slots
//! never outlive the callers that could read them.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::key::ResourceKey;

type Slot<T> = Arc<AsyncMutex<Option<T>>>;
type LockMap<T> = HashMap<ResourceKey, Slot<T>>;

#[derive(Debug)]
pub struct KeyLocks<T = ()> {
    inner: Arc<Mutex<LockMap<T>>>,
}

impl<T> Default for KeyLocks<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> Clone for KeyLocks<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> KeyLocks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &ResourceKey) -> KeyGuard<T> {
        let slot = {
            let mut map = lock_map(&self.inner);
            Arc::clone(
                map.entry(key.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(None))),
            )
        };

        let guard = slot.lock_owned().await;
        KeyGuard {
            key: key.clone(),
            map: Arc::clone(&self.inner),
            guard,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        lock_map(&self.inner).len()
    }
}

fn lock_map<T>(map: &Mutex<LockMap<T>>) -> MutexGuard<'_, LockMap<T>> {
    // The map holds no invariants a panicking holder could break.
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive access to one key and its slot; released on drop.
#[derive(Debug)]
pub struct KeyGuard<T = ()> {
    key: ResourceKey,
    map: Arc<Mutex<LockMap<T>>>,
    guard: OwnedMutexGuard<Option<T>>,
}

impl<T> Deref for KeyGuard<T> {
    type Target = Option<T>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for KeyGuard<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T> Drop for KeyGuard<T> {
    fn drop(&mut self) {
        let mut map = lock_map(&self.map);
        // Map entry + this guard. Anyone else waiting holds a third clone,
        // and new arrivals need the map lock we hold. The mutex itself is
        // released when the field drops right after this.
        if Arc::strong_count(OwnedMutexGuard::mutex(&self.guard)) == 2 {
            map.remove(&self.key);
        }
    }
}
