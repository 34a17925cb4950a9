use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::error::{WitnessError, WitnessResult};
use crate::policy::{parse_policy, Policy};

/// Where the policy cache's loader reads the raw (JSON-quoted) policy string
/// from when it misses (§4.E.5). Usually backed by `anchor-store::KvStore`,
/// kept as a narrow trait so the cache doesn't depend on the storage crate.
#[async_trait]
pub trait PolicyConfigSource: Send + Sync {
    async fn get_policy_string(&self, key: &str) -> WitnessResult<Option<String>>;
}

pub const WITNESS_POLICY_KEY: &str = "WitnessPolicyKey";

/// TTL-backed cache of parsed policies (§4.E.5). `moka::future::Cache`
/// de-duplicates concurrent loads for the same key on its own.
pub struct PolicyCache<C: PolicyConfigSource> {
    cache: Cache<String, Arc<Policy>>,
    source: Arc<C>,
}

impl<C: PolicyConfigSource> PolicyCache<C> {
    pub fn new(source: Arc<C>, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(ttl).build(),
            source,
        }
    }

    pub async fn get(&self, key: &str) -> WitnessResult<Arc<Policy>> {
        let source = self.source.clone();
        let key_owned = key.to_string();
        self.cache
            .try_get_with(key.to_string(), async move {
                let raw = source.get_policy_string(&key_owned).await?;
                let policy = match raw {
                    Some(quoted) => {
                        let unquoted: String = serde_json::from_str(&quoted)
                            .map_err(|e| WitnessError::PolicyParseError(e.to_string()))?;
                        parse_policy(&unquoted)?
                    }
                    None => Policy::default_policy(),
                };
                Ok::<Arc<Policy>, WitnessError>(Arc::new(policy))
            })
            .await
            .map_err(|e: Arc<WitnessError>| match &*e {
                WitnessError::Transient(_) => WitnessError::Transient(anyhow::anyhow!("{e}")),
                WitnessError::PolicyParseError(msg) => WitnessError::PolicyParseError(msg.clone()),
                other => WitnessError::Other(anyhow::anyhow!("{other}")),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        value: Option<String>,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl PolicyConfigSource for FixedSource {
        async fn get_policy_string(&self, _key: &str) -> WitnessResult<Option<String>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.value.clone())
        }
    }

    #[tokio::test]
    async fn missing_entry_yields_default_policy() {
        let source = Arc::new(FixedSource { value: None, loads: AtomicUsize::new(0) });
        let cache = PolicyCache::new(source, Duration::from_secs(60));
        let policy = cache.get(WITNESS_POLICY_KEY).await.unwrap();
        assert_eq!(*policy, Policy::default_policy());
    }

    #[tokio::test]
    async fn repeated_gets_load_once() {
        let source = Arc::new(FixedSource {
            value: Some("\"OutOf(1, batch)\"".to_string()),
            loads: AtomicUsize::new(0),
        });
        let cache = PolicyCache::new(source.clone(), Duration::from_secs(60));
        cache.get(WITNESS_POLICY_KEY).await.unwrap();
        cache.get(WITNESS_POLICY_KEY).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }
}
