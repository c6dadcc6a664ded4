//! In-memory rootstore.
//!
//! Keys are opaque byte strings ordered lexicographically. The store keeps a
//! per-key commit version so that optimistic transactions can validate their
//! read set at commit time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::txn::Txn;

/// Shared state behind every handle to one rootstore.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    /// The committed key space.
    pub(crate) map: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Last commit version that touched each key (including deletes).
    pub(crate) touched: HashMap<Vec<u8>, u64>,

    /// Monotone commit counter.
    pub(crate) version: u64,
}

impl Shared {
    pub(crate) fn apply_writes(&mut self, writes: &BTreeMap<Vec<u8>, Option<Vec<u8>>>) {
        self.version += 1;
        for (key, value) in writes {
            match value {
                Some(v) => {
                    self.map.insert(key.clone(), v.clone());
                }
                None => {
                    self.map.remove(key);
                }
            }
            self.touched.insert(key.clone(), self.version);
        }
    }
}

/// An ordered, transactional, in-memory key-value store.
///
/// Handles are cheap to clone and share one key space.
#[derive(Clone, Debug, Default)]
pub struct MemoryRootstore {
    inner: Arc<RwLock<Shared>>,
}

impl MemoryRootstore {
    /// Create a new empty rootstore.
    pub fn new() -> Self {
        MemoryRootstore {
            inner: Arc::new(RwLock::new(Shared::default())),
        }
    }

    /// Begin a transaction over a stable snapshot of the current key space.
    pub fn begin(&self) -> Txn {
        let shared = self.inner.read();
        Txn::new(
            Arc::clone(&self.inner),
            shared.map.clone(),
            shared.version,
        )
    }

    /// Read a key outside any transaction.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.inner
            .read()
            .map
            .get(key)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Check for a key outside any transaction.
    pub fn has(&self, key: &[u8]) -> bool {
        self.inner.read().map.contains_key(key)
    }

    /// Write a single key as its own committed transaction.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut writes = BTreeMap::new();
        writes.insert(key.to_vec(), Some(value.to_vec()));
        self.inner.write().apply_writes(&writes);
        Ok(())
    }

    /// Delete a single key as its own committed transaction.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut writes = BTreeMap::new();
        writes.insert(key.to_vec(), None);
        self.inner.write().apply_writes(&writes);
        Ok(())
    }

    /// Apply a write batch atomically. Batches perform no read-set
    /// validation; last write wins per key.
    pub fn apply(&self, batch: WriteBatch) -> Result<()> {
        if batch.ops.is_empty() {
            return Ok(());
        }
        self.inner.write().apply_writes(&batch.ops);
        Ok(())
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    /// Whether the committed key space is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().map.is_empty()
    }
}

/// A set of writes applied atomically, without conflict detection.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Queue a write.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        self.ops.insert(key.to_vec(), Some(value.to_vec()));
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: &[u8]) {
        self.ops.insert(key.to_vec(), None);
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
