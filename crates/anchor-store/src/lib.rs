/*!
# Anchor Store

The abstract tagged key-value interface the core consumes (§6.6), plus an
in-memory reference implementation. Modeled on `icn_storage::StorageManager`:
an `async_trait` interface over a thread-safe in-memory map, with the same
"lock the map, mutate, return owned clones" style.

Real deployments plug in a durable backend (the spec treats the storage
engine itself as out of scope); this crate only fixes the interface and
ships the in-memory implementation used by tests and by single-node setups.
*/

#![forbid(unsafe_code)]

mod memory;
mod query;

pub use memory::InMemoryStore;
pub use query::{parse_query, Query};

use async_trait::async_trait;
use thiserror::Error;

/// A secondary-index tag attached to a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One step of a `batch` call: `Some(value)` upserts, `None` deletes.
#[derive(Debug, Clone)]
pub struct BatchOp {
    pub key: String,
    pub value: Option<Vec<u8>>,
    pub tags: Vec<Tag>,
}

impl BatchOp {
    pub fn put(key: impl Into<String>, value: Vec<u8>, tags: Vec<Tag>) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            tags,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            tags: Vec::new(),
        }
    }
}

/// A single row returned from `query` or `scan`.
#[derive(Debug, Clone)]
pub struct Record {
    pub key: String,
    pub value: Vec<u8>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("invalid query expression: {0}")]
    InvalidQuery(String),

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The tagged key-value store interface (§6.6). Every method the core calls
/// on persisted state routes through here, so a single storage engine swap
/// (in-memory, RocksDB-backed, IPFS-pinned) requires no changes above this
/// trait.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`, attaching `tags` as secondary indexes.
    async fn put(&self, key: &str, value: Vec<u8>, tags: Vec<Tag>) -> StoreResult<()>;

    /// Fetch the raw value for `key`, if present.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Delete `key` and its tags.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Return every tag attached to `key`.
    async fn get_tags(&self, key: &str) -> StoreResult<Vec<Tag>>;

    /// Evaluate a query expression (`"name:value"` exact match or
    /// `"name<=N"` numeric bound) against the tag index, returning matching
    /// records in insertion order.
    async fn query(&self, expr: &str) -> StoreResult<Vec<Record>>;

    /// Apply a sequence of puts/deletes as one logical unit. The in-memory
    /// backend applies them under a single lock acquisition; a durable
    /// backend would wrap them in a transaction.
    async fn batch(&self, ops: Vec<BatchOp>) -> StoreResult<()>;
}
