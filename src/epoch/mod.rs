// Cache epochs and their lifecycle
// Author: kelexine (https://github.com/kelexine)

mod manager;

pub use manager::{EpochManager, LifecycleState};

use crate::error::{OfflineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one cache generation, usually a build tag such as `lebrq-v3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheEpoch(String);

impl CacheEpoch {
    /// Surrounding whitespace is trimmed; a blank identifier is rejected.
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(OfflineError::InvalidEpoch(
                "epoch identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
