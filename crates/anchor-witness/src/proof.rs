use serde::{Deserialize, Serialize};

/// Which half of the quorum a witness stands in (§4.E.2 grammar: `role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Batch,
    System,
}

impl Role {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "batch" => Some(Role::Batch),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// One witness's attestation for an anchor, as stored and as selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessProof {
    pub witness: String,
    pub role: Role,
    pub has_log: bool,
    pub proof: Option<Vec<u8>>,
}

impl WitnessProof {
    pub fn new(witness: impl Into<String>, role: Role, has_log: bool) -> Self {
        Self {
            witness: witness.into(),
            role,
            has_log,
            proof: None,
        }
    }

    pub fn signed(&self) -> bool {
        self.proof.is_some()
    }
}
