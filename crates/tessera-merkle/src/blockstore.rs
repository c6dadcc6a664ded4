//! Content-addressed block storage over the `/blocks` namespace.
//!
//! Blocks are write-once: `put` of content already present is a no-op, and
//! nothing here ever deletes. Keys are `/<raw-cid-bytes>` within the
//! namespace.

use ipld_core::cid::Cid;

use tessera_store::{MultiStore, Namespaced};

use crate::block::Block;
use crate::error::Result;

/// Block store view over the active transaction.
#[derive(Clone, Copy, Debug)]
pub struct BlockStore<'t> {
    store: Namespaced<'t>,
}

impl<'t> BlockStore<'t> {
    /// Create the view from the multi-store.
    pub fn new(ms: &MultiStore<'t>) -> Self {
        BlockStore {
            store: ms.blockstore(),
        }
    }

    fn key(cid: &Cid) -> Vec<u8> {
        let raw = cid.to_bytes();
        let mut key = Vec::with_capacity(1 + raw.len());
        key.push(b'/');
        key.extend_from_slice(&raw);
        key
    }

    /// Store a block under the CID of its canonical encoding.
    pub fn put(&self, block: &Block) -> Result<Cid> {
        let encoded = block.encode()?;
        let cid = crate::cid::sha256_cid_v1(crate::cid::DAG_CBOR, &encoded);
        let key = Self::key(&cid);
        if !self.store.has(&key)? {
            self.store.set(&key, &encoded)?;
        }
        Ok(cid)
    }

    /// Fetch and decode a block. `NotFound` when absent.
    pub fn get(&self, cid: &Cid) -> Result<Block> {
        let bytes = self.store.get(&Self::key(cid))?;
        Block::decode(cid, &bytes)
    }

    /// Whether the block is stored locally.
    pub fn has(&self, cid: &Cid) -> Result<bool> {
        Ok(self.store.has(&Self::key(cid))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_store::{MemoryRootstore, StoreError};

    use crate::error::ClockError;

    #[test]
    fn test_put_get_roundtrip() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let blocks = BlockStore::new(&ms);

        let block = Block::new(b"delta".to_vec(), vec![]);
        let cid = blocks.put(&block).unwrap();

        assert!(blocks.has(&cid).unwrap());
        let fetched = blocks.get(&cid).unwrap();
        assert_eq!(fetched, block);
        assert_eq!(fetched.cid().unwrap(), cid);
    }

    #[test]
    fn test_put_is_idempotent() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let blocks = BlockStore::new(&ms);

        let block = Block::new(b"delta".to_vec(), vec![]);
        let first = blocks.put(&block).unwrap();
        let second = blocks.put(&block).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_absent_is_not_found() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let blocks = BlockStore::new(&ms);

        let cid = Block::new(b"never stored".to_vec(), vec![]).cid().unwrap();
        assert!(matches!(
            blocks.get(&cid),
            Err(ClockError::Store(StoreError::NotFound))
        ));
        assert!(!blocks.has(&cid).unwrap());
    }
}
