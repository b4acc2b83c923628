//! Table of named mutexes for read-check-write sequences against Vault.
//!
//! Handlers that must check remote state before creating something (for
//! example "does an alias with this name exist on this mount") lock a key
//! derived from the remote identity so that concurrent applies of the same
//! kind of object cannot both pass the check. Keys are created on first use
//! and kept for the life of the table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct MutexKv {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    held: Mutex<HashMap<String, OwnedMutexGuard<()>>>,
}

impl MutexKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `key`, then takes it.
    ///
    /// The lock stays held until [`unlock`](Self::unlock) is called for the
    /// same key.
    pub async fn lock(&self, key: &str) {
        log::debug!("Locking {:?}", key);
        let guard = self.get(key).lock_owned().await;
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), guard);
        log::debug!("Locked {:?}", key);
    }

    /// Releases `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not currently locked. A stray unlock means two
    /// call sites disagree about who owns the critical section.
    pub fn unlock(&self, key: &str) {
        let guard = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        match guard {
            Some(guard) => {
                drop(guard);
                log::debug!("Unlocked {:?}", key);
            }
            None => panic!("unlock of unlocked key {:?}", key),
        }
    }

    /// Whether `key` is currently held.
    pub fn is_locked(&self, key: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of keys the table has seen.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
