//! Per-filename locks
//!
//! Serializes writers of one name against each other and against readers of
//! that name. Different names never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Table of reader/writer locks keyed by filename
///
/// Entries are created on demand and removed once no caller holds them, so
/// the table only ever contains names with in-flight operations.
#[derive(Default)]
pub struct NameLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the shared lock for `name`
    pub fn with_read<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.acquire(name);
        let result = {
            let _guard = lock.read();
            f()
        };
        self.release(name, lock);
        result
    }

    /// Run `f` while holding the exclusive lock for `name`
    pub fn with_write<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.acquire(name);
        let result = {
            let _guard = lock.write();
            f()
        };
        self.release(name, lock);
        result
    }

    /// Number of names with an in-flight operation
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire(&self, name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    fn release(&self, name: &str, lock: Arc<RwLock<()>>) {
        drop(lock);

        // Clones only happen under the table mutex, so a count of one here
        // means the table holds the last reference.
        let mut locks = self.locks.lock();
        if locks.get(name).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(name);
        }
    }
}
