//! Per-key async locks
//!
//! Guards check-then-create sequences so concurrent callers racing on the
//! same key build one object. A table belongs to a single report and only
//! grows while that report lives.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct LockTable<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The lock for `key`, created on first use.
    pub async fn lock_for(&self, key: &K) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K: Eq + Hash + Clone> Default for LockTable<K> {
    fn default() -> Self {
        Self::new()
    }
}
