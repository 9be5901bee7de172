//! The offline request router.
//!
//! Each intercepted request goes `Received → Classified` and then ends in one
//! of the [`RouteOutcome`] states:
//!
//! | policy        | method  | cache read | cache write        | on network failure          |
//! |---------------|---------|------------|--------------------|-----------------------------|
//! | `NeverCache`  | any     | never      | never              | synthetic 503 JSON          |
//! | `AlwaysFresh` | any     | never      | never              | error propagated            |
//! | `CacheFirst`  | GET     | first      | 2xx, same origin   | cached copy, else 503 text  |
//! | `CacheFirst`  | non-GET | never      | never              | error propagated            |
//!
//! Cache hits are never revalidated. Nothing is retried.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod synthetic;

use crate::epoch::EpochManager;
use crate::error::Result;
use crate::fetch::{Fetcher, HttpResponse, InterceptedRequest};
use crate::metrics;
use crate::policy::{RouteClassifier, RoutePolicy};
use crate::store::{CacheKey, CacheStore, CachedResponse};
use axum::http::Method;
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Terminal state of one routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteOutcome {
    ServedFromCache,
    FetchedAndCached,
    FetchedUncached,
    /// The network failed and a synthetic response was returned.
    Failed,
}

impl RouteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteOutcome::ServedFromCache => "served-from-cache",
            RouteOutcome::FetchedAndCached => "fetched-and-cached",
            RouteOutcome::FetchedUncached => "fetched-uncached",
            RouteOutcome::Failed => "failed",
        }
    }
}

/// A response together with how it was produced.
#[derive(Debug, Clone)]
pub struct Routed {
    pub policy: RoutePolicy,
    pub outcome: RouteOutcome,
    pub response: HttpResponse,
}

/// Intercepts requests and executes the classified policy against the cache
/// store and the network.
pub struct OfflineRouter {
    classifier: RouteClassifier,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    epochs: Arc<EpochManager>,
    origin: Url,
}

impl OfflineRouter {
    pub fn new(
        classifier: RouteClassifier,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        epochs: Arc<EpochManager>,
        origin: Url,
    ) -> Self {
        Self {
            classifier,
            store,
            fetcher,
            epochs,
            origin,
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn epochs(&self) -> &EpochManager {
        &self.epochs
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Route one request.
    ///
    /// `Err` is only returned when a failure is meant to reach the caller
    /// unchanged (`AlwaysFresh`, non-GET `CacheFirst`, or any request before
    /// the epoch has claimed clients).
    pub async fn handle(&self, request: InterceptedRequest) -> Result<Routed> {
        let policy = self.classifier.classify(&request.method, request.path());

        let routed = if !self.epochs.controls_clients() {
            debug!("Not yet activated, passing {} {} through", request.method, request.url);
            self.passthrough(policy, &request).await
        } else {
            debug!("{} {} classified as {}", request.method, request.url, policy);
            match policy {
                RoutePolicy::NeverCache => Ok(self.network_only(&request).await),
                RoutePolicy::AlwaysFresh => self.passthrough(policy, &request).await,
                RoutePolicy::CacheFirst if request.method == Method::GET => {
                    Ok(self.cache_first(&request).await)
                }
                RoutePolicy::CacheFirst => self.passthrough(policy, &request).await,
            }
        };

        match &routed {
            Ok(routed) => metrics::record_routed(routed.policy.as_str(), routed.outcome.as_str()),
            Err(_) => metrics::record_routed(policy.as_str(), RouteOutcome::Failed.as_str()),
        }
        routed
    }

    /// Live fetch; a network failure becomes the synthetic API error.
    async fn network_only(&self, request: &InterceptedRequest) -> Routed {
        match self.fetcher.fetch(request).await {
            Ok(response) => Routed {
                policy: RoutePolicy::NeverCache,
                outcome: RouteOutcome::FetchedUncached,
                response,
            },
            Err(e) => {
                warn!("API request {} failed: {}", request.url, e);
                Routed {
                    policy: RoutePolicy::NeverCache,
                    outcome: RouteOutcome::Failed,
                    response: synthetic::api_unavailable(),
                }
            }
        }
    }

    /// Live fetch with no cache interaction; failures propagate.
    async fn passthrough(&self, policy: RoutePolicy, request: &InterceptedRequest) -> Result<Routed> {
        let response = self.fetcher.fetch(request).await?;
        Ok(Routed {
            policy,
            outcome: RouteOutcome::FetchedUncached,
            response,
        })
    }

    async fn cache_first(&self, request: &InterceptedRequest) -> Routed {
        let epoch = self.epochs.current();
        let key = CacheKey::new(request.method.clone(), request.url.as_str());

        match self.store.get(epoch, &key).await {
            Ok(Some(cached)) => {
                debug!("Cache hit: {}", key);
                metrics::record_cache_operation("hit");
                return Routed {
                    policy: RoutePolicy::CacheFirst,
                    outcome: RouteOutcome::ServedFromCache,
                    response: cached.response,
                };
            }
            Ok(None) => {
                debug!("Cache miss: {}", key);
                metrics::record_cache_operation("miss");
            }
            Err(e) => {
                warn!("Cache read for {} failed, treating as miss: {}", key, e);
                metrics::record_cache_operation("read_error");
            }
        }

        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Offline with no cached copy of {}: {}", key, e);
                return Routed {
                    policy: RoutePolicy::CacheFirst,
                    outcome: RouteOutcome::Failed,
                    response: synthetic::offline_miss(),
                };
            }
        };

        let outcome = if self.is_cacheable(request, &response) {
            self.store_copy(key, &response).await
        } else {
            RouteOutcome::FetchedUncached
        };

        Routed {
            policy: RoutePolicy::CacheFirst,
            outcome,
            response,
        }
    }

    fn is_cacheable(&self, request: &InterceptedRequest, response: &HttpResponse) -> bool {
        response.status.is_success()
            && response.is_same_origin(&self.origin)
            && !self.classifier.is_api_path(request.path())
    }

    /// Best-effort write; a failure is logged and never reaches the caller.
    async fn store_copy(&self, key: CacheKey, response: &HttpResponse) -> RouteOutcome {
        let entry = CachedResponse::new(response.clone());
        match self.store.put(self.epochs.current(), key, entry).await {
            Ok(()) => {
                metrics::record_cache_operation("store");
                RouteOutcome::FetchedAndCached
            }
            Err(e) => {
                warn!("Cache write failed: {}", e);
                metrics::record_cache_operation("store_error");
                RouteOutcome::FetchedUncached
            }
        }
    }
}
