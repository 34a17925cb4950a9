use std::sync::Arc;

use anchor_store::{BatchOp, KvStore};
use async_trait::async_trait;
use tracing::warn;

use crate::error::ExpiryResult;

/// A store registered for periodic expiry sweeping, type-erased so the
/// service can hold a heterogeneous set (§4.F.1).
#[async_trait]
pub trait Sweepable: Send + Sync {
    fn name(&self) -> &str;
    async fn sweep(&self, now: i64) -> ExpiryResult<()>;
}

/// Binds one `KvStore` to the tag it expires under, plus an optional
/// callback invoked with the keys that were deleted this sweep.
pub struct RegisteredStore<S: KvStore> {
    store: Arc<S>,
    expiry_tag_name: String,
    store_name: String,
    handler: Option<Arc<dyn Fn(&[String]) + Send + Sync>>,
}

impl<S: KvStore> RegisteredStore<S> {
    pub fn new(store: Arc<S>, expiry_tag_name: impl Into<String>, store_name: impl Into<String>) -> Self {
        Self {
            store,
            expiry_tag_name: expiry_tag_name.into(),
            store_name: store_name.into(),
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

#[async_trait]
impl<S: KvStore> Sweepable for RegisteredStore<S> {
    fn name(&self) -> &str {
        &self.store_name
    }

    /// §4.F.4: query by tag, iterate, collect keys, invoke the expiry
    /// handler, then batch-delete. Query/iterator errors are logged and end
    /// the sweep for this store without propagating — one store's trouble
    /// must not abort the others'.
    async fn sweep(&self, now: i64) -> ExpiryResult<()> {
        let expr = format!("{}<={}", self.expiry_tag_name, now);
        let rows = match self.store.query(&expr).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(store = %self.store_name, error = %e, "expiry query failed");
                return Ok(());
            }
        };
        if rows.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = rows.iter().map(|r| r.key.clone()).collect();
        if let Some(handler) = &self.handler {
            handler(&keys);
        }
        let ops = keys.iter().cloned().map(BatchOp::delete).collect();
        if let Err(e) = self.store.batch(ops).await {
            warn!(store = %self.store_name, error = %e, "expiry batch-delete failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_store::{InMemoryStore, Tag};
    use std::sync::Mutex;

    #[tokio::test]
    async fn sweep_deletes_expired_rows_and_notifies_handler() {
        let store = Arc::new(InMemoryStore::new());
        store.put("a", b"1".to_vec(), vec![Tag::new("expiry", "100")]).await.unwrap();
        store.put("b", b"2".to_vec(), vec![Tag::new("expiry", "999")]).await.unwrap();

        let notified = Arc::new(Mutex::new(Vec::new()));
        let notified_clone = notified.clone();
        let registered = RegisteredStore::new(store.clone(), "expiry", "anchors")
            .with_handler(move |keys| notified_clone.lock().unwrap().extend_from_slice(keys));

        registered.sweep(150).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(*notified.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn sweep_with_no_expired_rows_is_a_noop() {
        let store = Arc::new(InMemoryStore::new());
        store.put("a", b"1".to_vec(), vec![Tag::new("expiry", "999")]).await.unwrap();
        let registered = RegisteredStore::new(store.clone(), "expiry", "anchors");
        registered.sweep(100).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
    }
}
