use crate::{parse_query, BatchOp, KvStore, Query, Record, StoreResult, Tag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

struct Entry {
    value: Vec<u8>,
    tags: Vec<Tag>,
    seq: u64,
}

/// Thread-safe in-memory `KvStore`, modeled on `icn_storage::MemoryStorageManager`:
/// a single `Mutex`-guarded map, cloned out on read.
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    next_seq: Mutex<u64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_seq: Mutex::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        let mut seq = self.next_seq.lock().expect("next_seq lock poisoned");
        let value = *seq;
        *seq += 1;
        value
    }

    fn apply_put(&self, key: String, value: Vec<u8>, tags: Vec<Tag>) {
        let seq = self.next_seq();
        let mut entries = self.entries.lock().expect("entries lock poisoned");
        entries.insert(key, Entry { value, tags, seq });
    }

    fn apply_delete(&self, key: &str) {
        let mut entries = self.entries.lock().expect("entries lock poisoned");
        entries.remove(key);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn put(&self, key: &str, value: Vec<u8>, tags: Vec<Tag>) -> StoreResult<()> {
        self.apply_put(key.to_string(), value, tags);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().expect("entries lock poisoned");
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.apply_delete(key);
        Ok(())
    }

    async fn get_tags(&self, key: &str) -> StoreResult<Vec<Tag>> {
        let entries = self.entries.lock().expect("entries lock poisoned");
        Ok(entries.get(key).map(|e| e.tags.clone()).unwrap_or_default())
    }

    async fn query(&self, expr: &str) -> StoreResult<Vec<Record>> {
        let parsed = parse_query(expr)?;
        let entries = self.entries.lock().expect("entries lock poisoned");
        let mut matches: Vec<(u64, Record)> = entries
            .iter()
            .filter_map(|(key, entry)| {
                let matched = entry.tags.iter().any(|tag| match &parsed {
                    Query::Exact { name, value } => &tag.name == name && &tag.value == value,
                    Query::LessOrEqual { name, bound } => {
                        &tag.name == name
                            && tag
                                .value
                                .parse::<i64>()
                                .map(|v| v <= *bound)
                                .unwrap_or(false)
                    }
                });
                matched.then(|| {
                    (
                        entry.seq,
                        Record {
                            key: key.clone(),
                            value: entry.value.clone(),
                            tags: entry.tags.clone(),
                        },
                    )
                })
            })
            .collect();
        matches.sort_by_key(|(seq, _)| *seq);
        Ok(matches.into_iter().map(|(_, record)| record).collect())
    }

    async fn batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        for op in ops {
            match op.value {
                Some(value) => self.apply_put(op.key, value, op.tags),
                None => self.apply_delete(&op.key),
            }
        }
        Ok(())
    }
}
