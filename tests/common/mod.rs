// Shared test doubles for the router integration tests
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use lebrq_offline::config::AppConfig;
use lebrq_offline::epoch::CacheEpoch;
use lebrq_offline::error::{OfflineError, Result};
use lebrq_offline::fetch::{Fetcher, HttpResponse, InterceptedRequest};
use lebrq_offline::router::OfflineRouter;
use lebrq_offline::store::{CacheKey, CacheStore, CachedResponse, MemoryStore};
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ORIGIN: &str = "https://lebrq.test";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn config(epoch: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.upstream.origin = ORIGIN.to_string();
    config.cache.epoch = epoch.to_string();
    config
}

/// Scripted network. Every fetched request is recorded.
#[derive(Default)]
pub struct StubFetcher {
    offline: AtomicBool,
    responses: Mutex<HashMap<String, (StatusCode, String)>>,
    redirects: Mutex<HashMap<String, Url>>,
    headers: Mutex<HashMap<String, Vec<(&'static str, String)>>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl StubFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, status: StatusCode, body: &str) {
        self.responses
            .lock()
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Pretend the response for `path` ended up at `final_url` after redirects.
    pub fn redirect(&self, path: &str, final_url: &str) {
        self.redirects
            .lock()
            .insert(path.to_string(), Url::parse(final_url).unwrap());
    }

    /// Add a response header for `path`. `{n}` in `value` is replaced by the
    /// zero-based index of the fetch, so each response can differ.
    pub fn header(&self, path: &str, name: &'static str, value: &str) {
        self.headers
            .lock()
            .entry(path.to_string())
            .or_default()
            .push((name, value.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<HttpResponse> {
        let path = request.url.path().to_string();
        let index = {
            let mut calls = self.calls.lock();
            calls.push((request.method.clone(), request.url.to_string()));
            calls.len() - 1
        };

        if self.offline.load(Ordering::SeqCst) {
            return Err(OfflineError::Network("connection refused".to_string()));
        }

        let (status, body) = self
            .responses
            .lock()
            .get(&path)
            .cloned()
            .unwrap_or((StatusCode::OK, format!("live {}", path)));
        let final_url = self
            .redirects
            .lock()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| request.url.clone());

        let mut response = HttpResponse::new(status, body).with_url(final_url);
        if let Some(headers) = self.headers.lock().get(&path) {
            for (name, value) in headers {
                let value = value.replace("{n}", &index.to_string());
                response.headers.append(*name, value.parse().unwrap());
            }
        }
        Ok(response)
    }
}

/// Store whose writes (and optionally reads) always fail.
#[derive(Default)]
pub struct BrokenStore {
    fail_reads: bool,
    inner: MemoryStore,
}

impl BrokenStore {
    pub fn failing_writes() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_reads_and_writes() -> Arc<Self> {
        Arc::new(Self {
            fail_reads: true,
            inner: MemoryStore::new(),
        })
    }
}

#[async_trait]
impl CacheStore for BrokenStore {
    async fn open(&self, epoch: &CacheEpoch) -> Result<()> {
        self.inner.open(epoch).await
    }

    async fn get(&self, epoch: &CacheEpoch, key: &CacheKey) -> Result<Option<CachedResponse>> {
        if self.fail_reads {
            return Err(OfflineError::Store("disk on fire".to_string()));
        }
        self.inner.get(epoch, key).await
    }

    async fn put(&self, _: &CacheEpoch, _: CacheKey, _: CachedResponse) -> Result<()> {
        Err(OfflineError::Store("read-only filesystem".to_string()))
    }

    async fn epochs(&self) -> Result<Vec<CacheEpoch>> {
        self.inner.epochs().await
    }

    async fn delete_epoch(&self, epoch: &CacheEpoch) -> Result<bool> {
        self.inner.delete_epoch(epoch).await
    }

    async fn len(&self, epoch: &CacheEpoch) -> Result<usize> {
        self.inner.len(epoch).await
    }
}

/// Build and activate a router over the given store and stub network.
pub async fn active_router(
    epoch: &str,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<StubFetcher>,
) -> Arc<OfflineRouter> {
    let router = lebrq_offline::app::build(&config(epoch), store, fetcher).unwrap();
    lebrq_offline::app::start(&router).await.unwrap();
    router
}

pub fn get_key(path: &str) -> CacheKey {
    CacheKey::new(Method::GET, url(path).as_str())
}

pub fn epoch(id: &str) -> CacheEpoch {
    CacheEpoch::new(id).unwrap()
}
