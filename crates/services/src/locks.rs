//! Per-key async mutual exclusion.
//!
//! The table only holds weak handles; a key's mutex lives as long as someone
//! holds or waits on it.

use std::hash::Hash;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

const CLEANUP_THRESHOLD: usize = 1024;

/// Released on drop.
pub struct KeyGuard(#[allow(dead_code)] OwnedMutexGuard<()>);

pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Weak<Mutex<()>>>,
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: K) -> KeyGuard {
        KeyGuard(self.handle(key).lock_owned().await)
    }

    fn handle(&self, key: K) -> Arc<Mutex<()>> {
        let lock = {
            let mut entry = self.locks.entry(key).or_default();
            match entry.upgrade() {
                Some(lock) => return lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    *entry = Arc::downgrade(&lock);
                    lock
                }
            }
        };

        if self.locks.len() > CLEANUP_THRESHOLD {
            self.locks.retain(|_, weak| weak.strong_count() > 0);
        }
        lock
    }
}
