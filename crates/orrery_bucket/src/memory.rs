//! In-memory bucket for testing.

use crate::bucket::Bucket;
use crate::error::BucketResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory bucket.
///
/// This bucket keeps all values in a map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sources that don't need to survive a restart
///
/// Values outlive the log or queue that wrote them, so handing the same
/// bucket to a second instance simulates a process restart.
#[derive(Debug, Default)]
pub struct InMemoryBucket {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBucket {
    /// Creates a new empty in-memory bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns true if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }

    /// Removes every stored value.
    pub fn clear(&self) {
        self.items.write().clear();
    }
}

#[async_trait]
impl Bucket for InMemoryBucket {
    async fn get_item(&self, key: &str) -> BucketResult<Option<Vec<u8>>> {
        Ok(self.items.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: Vec<u8>) -> BucketResult<()> {
        self.items.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> BucketResult<()> {
        self.items.write().remove(key);
        Ok(())
    }
}
