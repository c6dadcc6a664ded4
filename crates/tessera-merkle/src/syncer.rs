//! The sync-driver contract.
//!
//! `ingest` pulls missing ancestry through a [`DagSyncer`]; the real
//! implementation sits in the network layer and serves blocks from remote
//! peers. [`MemorySyncer`] is the in-process stand-in used by tests and by
//! local replication experiments.

use std::collections::HashMap;

use ipld_core::cid::Cid;
use parking_lot::RwLock;

use crate::block::Block;
use crate::error::{ClockError, Result};

/// Serves blocks by CID during an ancestry walk.
pub trait DagSyncer {
    /// Fetch one block. Implementations return
    /// [`ClockError::AncestorUnavailable`] when the block cannot be served.
    fn fetch(&self, cid: &Cid) -> Result<Block>;
}

/// An in-memory block source.
#[derive(Debug, Default)]
pub struct MemorySyncer {
    blocks: RwLock<HashMap<Cid, Block>>,
}

impl MemorySyncer {
    /// Create an empty syncer.
    pub fn new() -> Self {
        MemorySyncer::default()
    }

    /// Make a block fetchable, returning its CID.
    pub fn offer(&self, block: Block) -> Result<Cid> {
        let cid = block.cid()?;
        self.blocks.write().insert(cid, block);
        Ok(cid)
    }

    /// Drop a block, simulating a peer with a gap in its history.
    pub fn withhold(&self, cid: &Cid) {
        self.blocks.write().remove(cid);
    }
}

impl DagSyncer for MemorySyncer {
    fn fetch(&self, cid: &Cid) -> Result<Block> {
        self.blocks
            .read()
            .get(cid)
            .cloned()
            .ok_or(ClockError::AncestorUnavailable { cid: *cid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_then_fetch() {
        let syncer = MemorySyncer::new();
        let block = Block::new(b"d".to_vec(), vec![]);
        let cid = syncer.offer(block.clone()).unwrap();
        assert_eq!(syncer.fetch(&cid).unwrap(), block);
    }

    #[test]
    fn test_missing_block() {
        let syncer = MemorySyncer::new();
        let cid = Block::new(b"gone".to_vec(), vec![]).cid().unwrap();
        assert_eq!(
            syncer.fetch(&cid),
            Err(ClockError::AncestorUnavailable { cid })
        );
    }
}
