use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-DID resolution metadata (§4.G.1-3): whether it's published yet, its
/// canonical id, the anchor origin it last anchored from, and the
/// commitments used by anchor-origin reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub published: bool,
    pub canonical_id: Option<String>,
    pub anchor_origin: Option<String>,
    pub update_commitment: Option<String>,
    pub recovery_commitment: Option<String>,
    pub unpublished_operations: Vec<Value>,
    pub published_operations: Vec<Value>,
}

/// The document plus its resolution metadata (§4.G.1: "a ResolutionResult
/// with document + metadata").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub document: Value,
    pub metadata: DocumentMetadata,
}
