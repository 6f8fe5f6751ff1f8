//! Pluggable ordered key-value store.
//!
//! `meshid-store` never picks an engine; it only ever talks to `dyn KvStore`.
//! The production binary (`meshid-daemon`) is expected to wire in an
//! embedded engine; tests use [`MemStore`] below.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, KvError>;

/// One write in a [`KvBatch`].
#[derive(Clone, Debug)]
pub enum KvOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// A batch of writes applied atomically by [`KvStore::write_batch`].
#[derive(Clone, Debug, Default)]
pub struct KvBatch {
    ops: Vec<KvOp>,
}

impl KvBatch {
    pub fn new() -> Self {
        KvBatch::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(KvOp::Put(key.into(), value.into()));
        self
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(KvOp::Delete(key.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[KvOp] {
        &self.ops
    }
}

/// Ordered byte-keyed storage. Implementations must preserve lexicographic
/// key order for `scan_prefix` (the oplog/Merkle key layout, §6, relies on
/// prefix scans returning entries in key order).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn write_batch(&self, batch: KvBatch) -> Result<()>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Entries whose key starts with `prefix`, newest (greatest key) first,
    /// capped at `limit` (used by "load newest N" startup reads, e.g.
    /// `LoadNewestMasterLogID`).
    async fn scan_prefix_rev(&self, prefix: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut all = self.scan_prefix(prefix).await?;
        all.reverse();
        all.truncate(limit);
        Ok(all)
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = KvBatch::new();
        batch.put(key.to_vec(), value.to_vec());
        self.write_batch(batch).await
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        let mut batch = KvBatch::new();
        batch.delete(key.to_vec());
        self.write_batch(batch).await
    }
}

/// In-memory `BTreeMap`-backed store, for tests and for `meshid-daemon`
/// running without a persistent backend.
#[derive(Default, Clone)]
pub struct MemStore {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }
}

#[async_trait]
impl KvStore for MemStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().get(key).cloned())
    }

    async fn write_batch(&self, batch: KvBatch) -> Result<()> {
        let mut guard = self.inner.write();
        for op in batch.ops {
            match op {
                KvOp::Put(k, v) => {
                    guard.insert(k, v);
                }
                KvOp::Delete(k) => {
                    guard.remove(&k);
                }
            }
        }
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let guard = self.inner.read();
        Ok(guard
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
