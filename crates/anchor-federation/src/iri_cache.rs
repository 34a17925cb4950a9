use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::directory::ActorDirectory;
use crate::error::FederationResult;

/// Memoizes `ActorDirectory::resolve_actor_iris` (§4.C.3: "an IRI-resolution
/// cache memoizes the IRI -> [actor IRIs] mapping", defaults size 100 / TTL
/// 1 minute). `moka`'s W-TinyLFU eviction is the off-the-shelf stand-in for
/// the spec's ARC policy; see DESIGN.md.
pub struct IriResolutionCache<D: ActorDirectory> {
    cache: Cache<String, Arc<Vec<String>>>,
    directory: Arc<D>,
}

impl<D: ActorDirectory> IriResolutionCache<D> {
    pub fn new(directory: Arc<D>, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).time_to_live(ttl).build(),
            directory,
        }
    }

    pub async fn resolve(&self, iri: &str) -> FederationResult<Arc<Vec<String>>> {
        let directory = self.directory.clone();
        let key = iri.to_string();
        self.cache
            .try_get_with(iri.to_string(), async move {
                directory.resolve_actor_iris(&key).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<crate::error::FederationError>| match &*e {
                crate::error::FederationError::Transient(_) => {
                    crate::error::FederationError::Transient(anyhow::anyhow!("{e}"))
                }
                other => crate::error::FederationError::Other(anyhow::anyhow!("{other}")),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActorDirectory for CountingDirectory {
        async fn resolve_actor_iris(&self, iri: &str) -> FederationResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![iri.to_string()])
        }

        async fn fetch_actor(&self, _actor_iri: &str) -> FederationResult<anchor_vocab::Actor> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn repeated_resolves_hit_the_cache() {
        let directory = Arc::new(CountingDirectory { calls: AtomicUsize::new(0) });
        let cache = IriResolutionCache::new(directory.clone(), 100, Duration::from_secs(60));

        cache.resolve("https://b.example/actor").await.unwrap();
        cache.resolve("https://b.example/actor").await.unwrap();

        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }
}
