use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{SignatureError, SignatureResult};
use crate::key_type::KeyType;

/// Keys this node's outgoing signer can sign with (§4.B.1: "signing
/// algorithm is keyed through a key manager abstraction").
#[async_trait]
pub trait KeyManager: Send + Sync {
    async fn key_type(&self, key_id: &str) -> SignatureResult<KeyType>;
    async fn sign(&self, key_id: &str, signing_string: &[u8]) -> SignatureResult<Vec<u8>>;
}

struct StoredKey {
    key_type: KeyType,
    secret: ed25519_dalek::Keypair,
}

/// An in-memory `KeyManager` holding this node's own Ed25519 signing keys,
/// mirroring `icn_identity::InMemoryKeyStorage`'s "Mutex-guarded HashMap"
/// shape. Peer verification (any of the four recognized curve types) lives
/// in [`crate::crypto::verify`] and needs no private key material at all.
#[derive(Default)]
pub struct InMemoryKeyManager {
    keys: Mutex<HashMap<String, StoredKey>>,
}

impl InMemoryKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_ed25519(&self, key_id: impl Into<String>, keypair: ed25519_dalek::Keypair) {
        let mut keys = self.keys.lock().expect("key manager lock poisoned");
        keys.insert(
            key_id.into(),
            StoredKey {
                key_type: KeyType::Ed25519,
                secret: keypair,
            },
        );
    }
}

#[async_trait]
impl KeyManager for InMemoryKeyManager {
    async fn key_type(&self, key_id: &str) -> SignatureResult<KeyType> {
        let keys = self.keys.lock().expect("key manager lock poisoned");
        keys.get(key_id)
            .map(|k| k.key_type)
            .ok_or_else(|| SignatureError::KeyNotFound(key_id.to_string()))
    }

    async fn sign(&self, key_id: &str, signing_string: &[u8]) -> SignatureResult<Vec<u8>> {
        use ed25519_dalek::Signer as _;
        let keys = self.keys.lock().expect("key manager lock poisoned");
        let stored = keys
            .get(key_id)
            .ok_or_else(|| SignatureError::KeyNotFound(key_id.to_string()))?;
        Ok(stored.secret.sign(signing_string).to_bytes().to_vec())
    }
}
