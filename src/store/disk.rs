// Persistent cache store backed by JSON files
// Author: kelexine (https://github.com/kelexine)
//
// Layout: <root>/<hex(epoch)>/<sha256(method url)>.json
// The epoch directory name is hex encoded so any identifier maps to a safe
// path and can be decoded back when listing epochs.

use super::{CacheKey, CacheStore, CachedResponse};
use crate::epoch::CacheEpoch;
use crate::error::{OfflineError, Result};
use crate::fetch::HttpResponse;
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

const ENTRY_EXT: &str = "json";

/// On-disk form of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    method: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    /// Base64 encoded body.
    body: String,
    response_url: Option<String>,
    stored_at: DateTime<Utc>,
}

impl DiskRecord {
    fn from_entry(key: &CacheKey, entry: &CachedResponse) -> Self {
        let response = &entry.response;
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(v) => Some((name.as_str().to_string(), v.to_string())),
                Err(_) => {
                    debug!("Dropping non-text header {} from {}", name, key);
                    None
                }
            })
            .collect();

        Self {
            method: key.method.to_string(),
            url: key.url.clone(),
            status: response.status.as_u16(),
            headers,
            body: STANDARD.encode(&response.body),
            response_url: response.url.as_ref().map(Url::to_string),
            stored_at: entry.stored_at,
        }
    }

    fn into_entry(self) -> Result<CachedResponse> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| OfflineError::Store(format!("bad status in record: {}", e)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        let body = STANDARD
            .decode(&self.body)
            .map_err(|e| OfflineError::Store(format!("bad body encoding in record: {}", e)))?;

        let url = match &self.response_url {
            Some(u) => Some(Url::parse(u).map_err(|e| OfflineError::Url(e.to_string()))?),
            None => None,
        };

        Ok(CachedResponse {
            response: HttpResponse {
                status,
                headers,
                body: body.into(),
                url,
            },
            stored_at: self.stored_at,
        })
    }
}

/// Keeps each epoch in its own directory so the offline shell survives
/// process restarts.
pub struct DiskStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn epoch_dir(&self, epoch: &CacheEpoch) -> PathBuf {
        self.root.join(hex::encode(epoch.as_str()))
    }

    fn entry_path(&self, epoch: &CacheEpoch, key: &CacheKey) -> PathBuf {
        self.epoch_dir(epoch)
            .join(format!("{}.{}", key.digest(), ENTRY_EXT))
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn open(&self, epoch: &CacheEpoch) -> Result<()> {
        fs::create_dir_all(self.epoch_dir(epoch)).await?;
        Ok(())
    }

    async fn get(&self, epoch: &CacheEpoch, key: &CacheKey) -> Result<Option<CachedResponse>> {
        let path = self.entry_path(epoch, key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: DiskRecord = serde_json::from_slice(&raw)?;
        if record.method != key.method.as_str() || record.url != key.url {
            warn!("Entry at {} does not belong to {}, ignoring", path.display(), key);
            return Ok(None);
        }
        record.into_entry().map(Some)
    }

    async fn put(&self, epoch: &CacheEpoch, key: CacheKey, entry: CachedResponse) -> Result<()> {
        let dir = self.epoch_dir(epoch);
        fs::create_dir_all(&dir).await?;

        let json = serde_json::to_vec(&DiskRecord::from_entry(&key, &entry))?;
        let path = self.entry_path(epoch, &key);

        // Write then rename, so a concurrent reader never sees half an entry.
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!("{}.{}.tmp", key.digest(), n));
        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Stored {} at {}", key, path.display());
        Ok(())
    }

    async fn epochs(&self) -> Result<Vec<CacheEpoch>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut epochs = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            if !item.file_type().await?.is_dir() {
                continue;
            }
            let name = item.file_name();
            let decoded = hex::decode(name.to_string_lossy().as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .and_then(|id| CacheEpoch::new(id).ok());
            match decoded {
                Some(epoch) => epochs.push(epoch),
                None => debug!("Skipping foreign directory {:?} in cache root", name),
            }
        }

        epochs.sort();
        Ok(epochs)
    }

    async fn delete_epoch(&self, epoch: &CacheEpoch) -> Result<bool> {
        match fs::remove_dir_all(self.epoch_dir(epoch)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn len(&self, epoch: &CacheEpoch) -> Result<usize> {
        let mut dir = match fs::read_dir(self.epoch_dir(epoch)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(item) = dir.next_entry().await? {
            if item.path().extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT) {
                count += 1;
            }
        }
        Ok(count)
    }
}
