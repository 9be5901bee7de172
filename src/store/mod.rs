//! Cache storage, partitioned by [`CacheEpoch`].
//!
//! The router only ever talks to the [`CacheStore`] trait, so it can run
//! against the in-process [`MemoryStore`], the persistent [`DiskStore`], or a
//! test double. Entries are whole responses keyed by (method, absolute URL).
//! A `put` replaces any previous entry for the key; there is no per-entry
//! eviction. Dropping an epoch is the only way entries go away.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::config::{CacheConfig, StoreBackend};
use crate::epoch::CacheEpoch;
use crate::error::Result;
use crate::fetch::HttpResponse;
use async_trait::async_trait;
use axum::http::Method;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Identity of a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// SHA256 of `"<METHOD> <url>"`, hex encoded. Used as a file name.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Per-client headers that are never kept in a shared cache.
const UNCACHEABLE_HEADERS: &[&str] = &["set-cookie", "set-cookie2"];

/// A stored copy of a response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub response: HttpResponse,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Snapshot `response` for storage. Cookies set for the client that
    /// triggered the fetch are dropped so a hit never replays them.
    pub fn new(mut response: HttpResponse) -> Self {
        for name in UNCACHEABLE_HEADERS {
            response.headers.remove(*name);
        }
        Self {
            response,
            stored_at: Utc::now(),
        }
    }
}

/// Epoch-partitioned key-value store for responses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the epoch if it does not exist yet.
    async fn open(&self, epoch: &CacheEpoch) -> Result<()>;

    /// Look up `key` within `epoch`. A missing epoch is a miss, not an error.
    async fn get(&self, epoch: &CacheEpoch, key: &CacheKey) -> Result<Option<CachedResponse>>;

    /// Store `entry` under `key`, creating the epoch if needed and replacing
    /// any previous entry.
    async fn put(&self, epoch: &CacheEpoch, key: CacheKey, entry: CachedResponse) -> Result<()>;

    /// Every epoch currently held.
    async fn epochs(&self) -> Result<Vec<CacheEpoch>>;

    /// Drop an epoch with all of its entries. Returns false if it did not exist.
    async fn delete_epoch(&self, epoch: &CacheEpoch) -> Result<bool>;

    /// Number of entries in `epoch` (0 if it does not exist).
    async fn len(&self, epoch: &CacheEpoch) -> Result<usize>;
}

/// Build the store selected by `cache.backend`.
pub fn from_config(config: &CacheConfig) -> Arc<dyn CacheStore> {
    match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Disk => Arc::new(DiskStore::new(&config.directory)),
    }
}
