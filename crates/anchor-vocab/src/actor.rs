use serde::{Deserialize, Serialize};

/// A federation participant (§3). Immutable after publication and retrieved
/// by IRI through an `ActorRetriever` (§4.B, §9) rather than held by
/// in-memory reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(rename = "type")]
    pub actor_type: String,
    pub public_key: PublicKey,
    pub inbox: String,
    pub outbox: String,
    pub followers: String,
    pub following: String,
    pub witnesses: String,
    pub witnessing: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, public_key: PublicKey) -> Self {
        let id = id.into();
        Self {
            inbox: format!("{id}/inbox"),
            outbox: format!("{id}/outbox"),
            followers: format!("{id}/followers"),
            following: format!("{id}/following"),
            witnesses: format!("{id}/witnesses"),
            witnessing: format!("{id}/witnessing"),
            actor_type: "Service".to_string(),
            id,
            public_key,
        }
    }
}

/// §3: `publicKey.owner` must reference an `Actor` whose `publicKey.id`
/// equals this key's own `id` — enforced by the verifier, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub id: String,
    pub owner: String,
    pub public_key_pem: String,
}

impl PublicKey {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, pem: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            public_key_pem: pem.into(),
        }
    }
}
