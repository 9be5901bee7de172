// Wiring: classifier, store, fetcher, epoch lifecycle and router
// Author: kelexine (https://github.com/kelexine)

use crate::config::AppConfig;
use crate::epoch::{CacheEpoch, EpochManager};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::policy::RouteClassifier;
use crate::router::OfflineRouter;
use crate::store::CacheStore;
use std::sync::Arc;
use tracing::warn;

/// Assemble a router from configuration. The router passes every request
/// straight through until [`start`] has run.
pub fn build(
    config: &AppConfig,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
) -> Result<Arc<OfflineRouter>> {
    config.validate()?;

    let origin = config.origin_url()?;
    let epoch = CacheEpoch::new(&config.cache.epoch)?;

    let epochs = Arc::new(EpochManager::new(
        epoch,
        origin.clone(),
        config.cache.precache.clone(),
        store.clone(),
        fetcher.clone(),
    ));

    Ok(Arc::new(OfflineRouter::new(
        RouteClassifier::from_config(&config.cache),
        store,
        fetcher,
        epochs,
        origin,
    )))
}

/// Run install then activate.
///
/// A failed install (origin unreachable at startup) does not stop the
/// process: the epoch is still activated and fills lazily as cache-first
/// routes are fetched. Store failures during activation are returned.
pub async fn start(router: &OfflineRouter) -> Result<()> {
    let epochs = router.epochs();

    if let Err(e) = epochs.install().await {
        warn!(
            "Shell precache for {} failed, continuing with an empty epoch: {}",
            epochs.current(),
            e
        );
    }

    epochs.activate().await?;
    Ok(())
}
