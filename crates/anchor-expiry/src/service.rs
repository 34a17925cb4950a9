use std::sync::Arc;
use std::time::Duration;

use anchor_common::time::unix_now;
use anchor_store::KvStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::ExpiryResult;
use crate::permit::Coordinator;
use crate::sweep::{RegisteredStore, Sweepable};

/// §4.F: a single periodic task that decides, via the cluster permit, which
/// node sweeps on a given tick, then runs every registered store's sweep.
pub struct ExpiryService<C: KvStore> {
    interval: Duration,
    coordinator: Coordinator<C>,
    stores: Mutex<Vec<Arc<dyn Sweepable>>>,
}

impl<C: KvStore> ExpiryService<C> {
    pub fn new(coordination_store: Arc<C>, holder_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            interval,
            coordinator: Coordinator::new(coordination_store, holder_id, 3),
            stores: Mutex::new(Vec::new()),
        }
    }

    /// `Register(store, expiryTagName, storeName, opts...)` (§4.F.1).
    pub async fn register<S: KvStore + 'static>(
        &self,
        store: Arc<S>,
        expiry_tag_name: impl Into<String>,
        store_name: impl Into<String>,
    ) {
        self.stores
            .lock()
            .await
            .push(Arc::new(RegisteredStore::new(store, expiry_tag_name, store_name)));
    }

    pub async fn register_with_handler<S: KvStore + 'static>(
        &self,
        store: Arc<S>,
        expiry_tag_name: impl Into<String>,
        store_name: impl Into<String>,
        handler: impl Fn(&[String]) + Send + Sync + 'static,
    ) {
        self.stores.lock().await.push(Arc::new(
            RegisteredStore::new(store, expiry_tag_name, store_name).with_handler(handler),
        ));
    }

    /// Runs one tick: decides via the permit whether to sweep, then sweeps
    /// every registered store if so. Returns whether a sweep actually ran,
    /// mainly for tests; the periodic task ignores it.
    pub async fn run_once(&self, now: i64) -> ExpiryResult<bool> {
        let interval_secs = self.interval.as_secs() as i64;
        if !self.coordinator.acquire(now, interval_secs).await? {
            return Ok(false);
        }
        let stores = self.stores.lock().await;
        for store in stores.iter() {
            info!(store = store.name(), "running expiry sweep");
            store.sweep(now).await?;
        }
        Ok(true)
    }

    /// Spawns the periodic tick loop on the current `tokio` runtime.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once(unix_now()).await {
                    tracing::warn!(error = %e, "expiry sweep tick failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_store::{InMemoryStore, Tag};

    #[tokio::test]
    async fn registered_store_is_swept_when_permit_acquired() {
        let coordination = Arc::new(InMemoryStore::new());
        let data_store = Arc::new(InMemoryStore::new());
        data_store.put("a", b"1".to_vec(), vec![Tag::new("expiry", "100")]).await.unwrap();

        let service = ExpiryService::new(coordination, "node-a", Duration::from_secs(60));
        service.register(data_store.clone(), "expiry", "anchors").await;

        let ran = service.run_once(150).await.unwrap();
        assert!(ran);
        assert_eq!(data_store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_holder_skips_run_before_steal_window() {
        let coordination = Arc::new(InMemoryStore::new());
        let a = ExpiryService::new(coordination.clone(), "node-a", Duration::from_secs(60));
        let b = ExpiryService::new(coordination, "node-b", Duration::from_secs(60));

        assert!(a.run_once(1000).await.unwrap());
        assert!(!b.run_once(1010).await.unwrap());
    }
}
