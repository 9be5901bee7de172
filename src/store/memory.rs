// In-process cache store
// Author: kelexine (https://github.com/kelexine)

use super::{CacheKey, CacheStore, CachedResponse};
use crate::epoch::CacheEpoch;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Partition = HashMap<CacheKey, CachedResponse>;

/// Epoch → (key → response). Lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    epochs: Arc<RwLock<HashMap<CacheEpoch, Partition>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, epoch: &CacheEpoch) -> Result<()> {
        self.epochs.write().entry(epoch.clone()).or_default();
        Ok(())
    }

    async fn get(&self, epoch: &CacheEpoch, key: &CacheKey) -> Result<Option<CachedResponse>> {
        Ok(self
            .epochs
            .read()
            .get(epoch)
            .and_then(|partition| partition.get(key))
            .cloned())
    }

    async fn put(&self, epoch: &CacheEpoch, key: CacheKey, entry: CachedResponse) -> Result<()> {
        debug!("Storing {} in epoch {}", key, epoch);
        self.epochs
            .write()
            .entry(epoch.clone())
            .or_default()
            .insert(key, entry);
        Ok(())
    }

    async fn epochs(&self) -> Result<Vec<CacheEpoch>> {
        let mut epochs: Vec<CacheEpoch> = self.epochs.read().keys().cloned().collect();
        epochs.sort();
        Ok(epochs)
    }

    async fn delete_epoch(&self, epoch: &CacheEpoch) -> Result<bool> {
        Ok(self.epochs.write().remove(epoch).is_some())
    }

    async fn len(&self, epoch: &CacheEpoch) -> Result<usize> {
        Ok(self.epochs.read().get(epoch).map(HashMap::len).unwrap_or(0))
    }
}
