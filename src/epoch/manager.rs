// Epoch manager - install and activate lifecycle
// Author: kelexine (https://github.com/kelexine)

use super::CacheEpoch;
use crate::error::{OfflineError, Result};
use crate::fetch::{Fetcher, InterceptedRequest};
use crate::metrics;
use crate::store::{CacheKey, CacheStore, CachedResponse};
use parking_lot::RwLock;
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the current router instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    /// Clients are claimed; requests are intercepted.
    Activated,
    /// Install failed; this instance never takes control.
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        }
    }
}

/// Owns the current epoch: pre-populates it on install and garbage-collects
/// every other epoch on activate.
pub struct EpochManager {
    current: CacheEpoch,
    origin: Url,
    precache: Vec<String>,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<LifecycleState>,
}

impl EpochManager {
    pub fn new(
        current: CacheEpoch,
        origin: Url,
        precache: Vec<String>,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            current,
            origin,
            precache,
            store,
            fetcher,
            state: RwLock::new(LifecycleState::Parsed),
        }
    }

    pub fn current(&self) -> &CacheEpoch {
        &self.current
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// True once clients have been claimed.
    pub fn controls_clients(&self) -> bool {
        self.state() == LifecycleState::Activated
    }

    fn set_state(&self, state: LifecycleState) {
        debug!("Epoch {} lifecycle -> {}", self.current, state.as_str());
        *self.state.write() = state;
    }

    /// Open the current epoch and fill it with the app shell.
    ///
    /// All-or-nothing: if any precache path cannot be fetched with a 2xx
    /// status, nothing is stored and the instance becomes redundant. On
    /// success the instance skips waiting and is ready to activate at once.
    pub async fn install(&self) -> Result<()> {
        self.set_state(LifecycleState::Installing);
        info!("Installing cache epoch {}", self.current);

        match self.precache_shell().await {
            Ok(count) => {
                info!("Precached {} shell entries into {}", count, self.current);
                self.set_state(LifecycleState::Installed);
                Ok(())
            }
            Err(e) => {
                warn!("Install of epoch {} failed: {}", self.current, e);
                self.set_state(LifecycleState::Redundant);
                Err(e)
            }
        }
    }

    async fn precache_shell(&self) -> Result<usize> {
        self.store.open(&self.current).await?;

        let mut fetched = Vec::with_capacity(self.precache.len());
        for path in &self.precache {
            let url = self
                .origin
                .join(path)
                .map_err(|e| OfflineError::Url(format!("{}: {}", path, e)))?;
            let request = InterceptedRequest::get(url.clone());

            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| OfflineError::Precache {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            if !response.status.is_success() {
                return Err(OfflineError::Precache {
                    url: url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            fetched.push((CacheKey::new(request.method, url.as_str()), response));
        }

        let count = fetched.len();
        for (key, response) in fetched {
            self.store
                .put(&self.current, key, CachedResponse::new(response))
                .await?;
        }
        Ok(count)
    }

    /// Delete every epoch except the current one, then claim clients.
    /// Returns the epochs that were removed.
    pub async fn activate(&self) -> Result<Vec<CacheEpoch>> {
        self.set_state(LifecycleState::Activating);

        let mut removed = Vec::new();
        for epoch in self.store.epochs().await? {
            if epoch == self.current {
                continue;
            }
            if self.store.delete_epoch(&epoch).await? {
                info!("Deleted stale cache epoch {}", epoch);
                metrics::record_epoch_deleted();
                removed.push(epoch);
            }
        }

        self.set_state(LifecycleState::Activated);
        info!("Epoch {} active, clients claimed", self.current);
        Ok(removed)
    }
}
