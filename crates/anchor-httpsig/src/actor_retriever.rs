use async_trait::async_trait;

use anchor_vocab::{Actor, PublicKey};

use crate::error::SignatureResult;

/// Resolves public keys and actors by IRI for the verifier (§4.B.2, §9).
/// Dereferencing actors through this abstraction rather than an in-memory
/// reference keeps cyclic Actor<->PublicKey references IRI-addressed.
#[async_trait]
pub trait ActorRetriever: Send + Sync {
    async fn get_public_key(&self, key_id: &str) -> SignatureResult<PublicKey>;
    async fn get_actor(&self, actor_iri: &str) -> SignatureResult<Actor>;
}
