//! Optimistic transactions.
//!
//! A transaction reads from a stable snapshot taken at `begin` and buffers
//! its writes. `commit` validates the read set against keys touched by
//! commits that landed after the snapshot and either applies the buffer
//! atomically or fails with [`StoreError::TxnConflict`]. `discard` drops the
//! buffer with no effect.
//!
//! Reads and writes take `&self` so that several namespaced views can share
//! one transaction; interior state is guarded by short-lived mutexes.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{Result, StoreError};
use crate::memory::Shared;

/// A read-write transaction over a snapshot of the rootstore.
#[derive(Debug)]
pub struct Txn {
    shared: Arc<RwLock<Shared>>,
    snapshot: BTreeMap<Vec<u8>, Vec<u8>>,
    start_version: u64,
    writes: Mutex<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    reads: Mutex<HashSet<Vec<u8>>>,
    closed: AtomicBool,
}

impl Txn {
    pub(crate) fn new(
        shared: Arc<RwLock<Shared>>,
        snapshot: BTreeMap<Vec<u8>, Vec<u8>>,
        start_version: u64,
    ) -> Self {
        Txn {
            shared,
            snapshot,
            start_version,
            writes: Mutex::new(BTreeMap::new()),
            reads: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn track_read(&self, key: &[u8]) {
        self.reads.lock().insert(key.to_vec());
    }

    /// Read a key, seeing this transaction's own writes first.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.check_open()?;
        self.track_read(key);
        if let Some(buffered) = self.writes.lock().get(key) {
            return buffered.clone().ok_or(StoreError::NotFound);
        }
        self.snapshot.get(key).cloned().ok_or(StoreError::NotFound)
    }

    /// Check for a key, seeing this transaction's own writes first.
    pub fn has(&self, key: &[u8]) -> Result<bool> {
        self.check_open()?;
        self.track_read(key);
        if let Some(buffered) = self.writes.lock().get(key) {
            return Ok(buffered.is_some());
        }
        Ok(self.snapshot.contains_key(key))
    }

    /// Buffer a write.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_open()?;
        self.writes.lock().insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    /// Buffer a delete.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.check_open()?;
        self.writes.lock().insert(key.to_vec(), None);
        Ok(())
    }

    /// Iterate entries whose key starts with `prefix`, ascending by key.
    ///
    /// The cursor sees the snapshot merged with this transaction's buffered
    /// writes. Every yielded key joins the read set.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Result<PrefixIter<'_>> {
        self.check_open()?;

        let lower = Bound::Included(prefix.to_vec());
        let upper = match prefix_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        let range = (lower, upper);

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .snapshot
            .range::<Vec<u8>, _>(range.clone())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in self.writes.lock().range::<Vec<u8>, _>(range) {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        let entries: Vec<(Vec<u8>, Vec<u8>)> = merged.into_iter().collect();
        {
            let mut reads = self.reads.lock();
            for (key, _) in &entries {
                reads.insert(key.clone());
            }
        }

        Ok(PrefixIter {
            entries,
            pos: 0,
            _txn: std::marker::PhantomData,
        })
    }

    /// Atomically apply the write buffer.
    ///
    /// Fails with [`StoreError::TxnConflict`] if any key in the read set was
    /// touched by a commit after this transaction's snapshot. Validation is
    /// per-key; range reads validate the keys the cursor yielded.
    pub fn commit(&self) -> Result<()> {
        self.check_open()?;
        let mut shared = self.shared.write();

        {
            let reads = self.reads.lock();
            for key in reads.iter() {
                if let Some(&touched_at) = shared.touched.get(key) {
                    if touched_at > self.start_version {
                        drop(shared);
                        self.closed.store(true, Ordering::Release);
                        return Err(StoreError::TxnConflict);
                    }
                }
            }
        }

        let writes = self.writes.lock();
        if !writes.is_empty() {
            shared.apply_writes(&writes);
        }
        drop(writes);
        drop(shared);
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    /// Drop the write buffer with no effect. Safe to call more than once.
    pub fn discard(&self) {
        self.closed.store(true, Ordering::Release);
        self.writes.lock().clear();
        self.reads.lock().clear();
    }
}

/// A forward-only cursor over one prefix of a transaction's merged view.
#[derive(Debug)]
pub struct PrefixIter<'t> {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
    _txn: std::marker::PhantomData<&'t Txn>,
}

impl PrefixIter<'_> {
    /// Number of entries remaining.
    pub fn remaining(&self) -> usize {
        self.entries.len() - self.pos
    }
}

impl Iterator for PrefixIter<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }
}

/// Smallest key strictly greater than every key with the given prefix, or
/// `None` when the prefix is all `0xff`.
fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(end);
        }
        end.pop();
    }
    None
}
