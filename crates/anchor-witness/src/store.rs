use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use base64::Engine;
use std::sync::Arc;

use anchor_store::{BatchOp, KvStore, Tag};

use crate::error::{WitnessError, WitnessResult};
use crate::proof::WitnessProof;

const ANCHOR_TAG: &str = "anchor";

fn anchor_tag_value(anchor_id: &str) -> String {
    Base64Url.encode(anchor_id.as_bytes())
}

/// §4.E.1 store contract, independent of the concrete `KvStore` backend.
#[async_trait]
pub trait WitnessProofStore: Send + Sync {
    async fn put(&self, anchor_id: &str, witnesses: Vec<WitnessProof>) -> WitnessResult<()>;
    async fn get(&self, anchor_id: &str) -> WitnessResult<Vec<WitnessProof>>;
    async fn delete(&self, anchor_id: &str) -> WitnessResult<()>;
    async fn add_proof(&self, anchor_id: &str, witness_uri: &str, proof: Vec<u8>) -> WitnessResult<()>;
    async fn handle_expired_keys(&self, keys: &[String]) -> WitnessResult<()>;
}

/// A `WitnessProofStore` over `anchor-store`'s tagged `KvStore`: each proof
/// is its own record, keyed `witness:{anchor_id}:{witness_uri}` and tagged
/// with the base64url-encoded `anchor_id` so `Get`/`Delete` can query the
/// whole set in one call (§4.E.1).
pub struct KvWitnessProofStore<S: KvStore> {
    store: Arc<S>,
    expiry_handler: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl<S: KvStore> KvWitnessProofStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            expiry_handler: None,
        }
    }

    /// Invoked once per anchor whose last remaining proof record is deleted
    /// by `handle_expired_keys` (§4.E.1).
    pub fn with_expiry_handler(mut self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.expiry_handler = Some(Arc::new(handler));
        self
    }

    fn record_key(anchor_id: &str, witness_uri: &str) -> String {
        format!("witness:{anchor_id}:{witness_uri}")
    }
}

#[async_trait]
impl<S: KvStore> WitnessProofStore for KvWitnessProofStore<S> {
    async fn put(&self, anchor_id: &str, witnesses: Vec<WitnessProof>) -> WitnessResult<()> {
        let tag_value = anchor_tag_value(anchor_id);
        let ops = witnesses
            .into_iter()
            .map(|proof| {
                let key = Self::record_key(anchor_id, &proof.witness);
                let value = serde_json::to_vec(&proof)
                    .map_err(|e| WitnessError::Other(e.into()))?;
                Ok(BatchOp::put(key, value, vec![Tag::new(ANCHOR_TAG, tag_value.clone())]))
            })
            .collect::<WitnessResult<Vec<_>>>()?;
        self.store.batch(ops).await?;
        Ok(())
    }

    async fn get(&self, anchor_id: &str) -> WitnessResult<Vec<WitnessProof>> {
        let rows = self
            .store
            .query(&format!("{ANCHOR_TAG}:{}", anchor_tag_value(anchor_id)))
            .await?;
        if rows.is_empty() {
            return Err(WitnessError::NotFound(anchor_id.to_string()));
        }
        rows.into_iter()
            .map(|r| serde_json::from_slice(&r.value).map_err(|e| WitnessError::Other(e.into())))
            .collect()
    }

    async fn delete(&self, anchor_id: &str) -> WitnessResult<()> {
        let rows = self
            .store
            .query(&format!("{ANCHOR_TAG}:{}", anchor_tag_value(anchor_id)))
            .await?;
        let ops = rows.into_iter().map(|r| BatchOp::delete(r.key)).collect();
        self.store.batch(ops).await?;
        Ok(())
    }

    async fn add_proof(&self, anchor_id: &str, witness_uri: &str, proof: Vec<u8>) -> WitnessResult<()> {
        let rows = self
            .store
            .query(&format!("{ANCHOR_TAG}:{}", anchor_tag_value(anchor_id)))
            .await?;
        let tag_value = anchor_tag_value(anchor_id);
        for row in rows {
            let mut parsed: WitnessProof =
                serde_json::from_slice(&row.value).map_err(|e| WitnessError::Other(e.into()))?;
            if parsed.witness == witness_uri {
                parsed.proof = Some(proof);
                let value = serde_json::to_vec(&parsed).map_err(|e| WitnessError::Other(e.into()))?;
                self.store
                    .put(&row.key, value, vec![Tag::new(ANCHOR_TAG, tag_value)])
                    .await?;
                return Ok(());
            }
        }
        Err(WitnessError::WitnessNotFound(witness_uri.to_string()))
    }

    async fn handle_expired_keys(&self, keys: &[String]) -> WitnessResult<()> {
        for key in keys {
            let tags = self.store.get_tags(key).await?;
            self.store.delete(key).await?;
            if let Some(anchor_tag) = tags.iter().find(|t| t.name == ANCHOR_TAG) {
                let remaining = self
                    .store
                    .query(&format!("{ANCHOR_TAG}:{}", anchor_tag.value))
                    .await?;
                if remaining.is_empty() {
                    if let Some(handler) = &self.expiry_handler {
                        handler(key);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_store::InMemoryStore;
    use crate::proof::Role;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = KvWitnessProofStore::new(Arc::new(InMemoryStore::new()));
        store
            .put(
                "hl:abc",
                vec![WitnessProof::new("https://w1.example/actor", Role::Batch, false)],
            )
            .await
            .unwrap();
        let proofs = store.get("hl:abc").await.unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].witness, "https://w1.example/actor");
    }

    #[tokio::test]
    async fn get_on_empty_anchor_is_not_found() {
        let store = KvWitnessProofStore::new(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            store.get("hl:missing").await,
            Err(WitnessError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn add_proof_updates_matching_witness() {
        let store = KvWitnessProofStore::new(Arc::new(InMemoryStore::new()));
        store
            .put(
                "hl:abc",
                vec![WitnessProof::new("https://w1.example/actor", Role::Batch, false)],
            )
            .await
            .unwrap();
        store
            .add_proof("hl:abc", "https://w1.example/actor", b"sig".to_vec())
            .await
            .unwrap();
        let proofs = store.get("hl:abc").await.unwrap();
        assert!(proofs[0].signed());
    }

    #[tokio::test]
    async fn add_proof_for_unknown_witness_fails() {
        let store = KvWitnessProofStore::new(Arc::new(InMemoryStore::new()));
        store
            .put(
                "hl:abc",
                vec![WitnessProof::new("https://w1.example/actor", Role::Batch, false)],
            )
            .await
            .unwrap();
        assert!(matches!(
            store.add_proof("hl:abc", "https://unknown.example/actor", vec![]).await,
            Err(WitnessError::WitnessNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_all_records_for_anchor() {
        let store = KvWitnessProofStore::new(Arc::new(InMemoryStore::new()));
        store
            .put(
                "hl:abc",
                vec![
                    WitnessProof::new("https://w1.example/actor", Role::Batch, false),
                    WitnessProof::new("https://w2.example/actor", Role::System, false),
                ],
            )
            .await
            .unwrap();
        store.delete("hl:abc").await.unwrap();
        assert!(matches!(store.get("hl:abc").await, Err(WitnessError::NotFound(_))));
    }

    #[tokio::test]
    async fn handle_expired_keys_notifies_when_anchor_fully_drained() {
        let store = Arc::new(KvWitnessProofStore::new(Arc::new(InMemoryStore::new())));
        store
            .put(
                "hl:abc",
                vec![WitnessProof::new("https://w1.example/actor", Role::Batch, false)],
            )
            .await
            .unwrap();
        let key = KvWitnessProofStore::<InMemoryStore>::record_key("hl:abc", "https://w1.example/actor");

        let notified = Arc::new(std::sync::Mutex::new(false));
        let notified_clone = notified.clone();
        let store = Arc::try_unwrap(store)
            .ok()
            .unwrap()
            .with_expiry_handler(move |_| {
                *notified_clone.lock().unwrap() = true;
            });

        store.handle_expired_keys(&[key]).await.unwrap();
        assert!(*notified.lock().unwrap());
    }
}
