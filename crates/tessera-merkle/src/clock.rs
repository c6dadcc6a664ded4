//! The Merkle clock.
//!
//! One clock owns one CRDT instance: it turns local mutations into DAG
//! blocks rooted at the current heads, and folds foreign blocks into the
//! local state by walking their ancestry. Every operation runs against an
//! explicit transaction (through the multi-store views), so a failure at
//! any step leaves no partial mutation once the caller discards.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ipld_core::cid::Cid;
use tracing::debug;

use tessera_core::{Crdt, Delta};
use tessera_store::MultiStore;

use crate::block::Block;
use crate::blockstore::BlockStore;
use crate::cid::{sha256_cid_v1, DAG_CBOR};
use crate::error::{ClockError, Result};
use crate::heads::HeadSet;
use crate::syncer::DagSyncer;

/// A cooperative cancellation flag shared between an operation and its
/// caller. Cancelling aborts the walk at the next step; the enclosing
/// transaction is then discarded by the caller.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that never fires unless `cancel` is called.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ClockError::Cancelled);
        }
        Ok(())
    }
}

/// The clock for one CRDT instance.
#[derive(Clone, Debug)]
pub struct MerkleClock {
    id: String,
    crdt: Crdt,
}

impl MerkleClock {
    /// Create a clock for the CRDT instance `id`.
    pub fn new(id: impl Into<String>, crdt: Crdt) -> Self {
        MerkleClock {
            id: id.into(),
            crdt,
        }
    }

    /// The CRDT instance identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The CRDT this clock merges into.
    pub fn crdt(&self) -> &Crdt {
        &self.crdt
    }

    /// Attach a local delta to the DAG.
    ///
    /// Reads the current heads, assigns the delta the next height, encodes
    /// it into a block linking to those heads, stores the block, and merges
    /// the delta. Returns the new block's CID for publication.
    pub fn add_delta(&self, ms: &MultiStore<'_>, mut delta: Delta) -> Result<Cid> {
        let heads = HeadSet::new(ms, &self.id);
        let (tips, max_height) = heads.list()?;
        let height = max_height + 1;
        delta.set_priority(height);

        let block = Block::new(delta.encode()?, tips);
        let cid = BlockStore::new(ms).put(&block)?;

        self.process_node(ms, &cid, height, &delta, &block)?;
        Ok(cid)
    }

    /// Merge one block's delta and maintain the head set.
    ///
    /// Links already known as heads are replaced by the root; links stored
    /// locally as non-heads mean the writer saw an older view, so the root
    /// still becomes a head of its own. Unknown links are returned for the
    /// caller to fetch.
    pub fn process_node(
        &self,
        ms: &MultiStore<'_>,
        root: &Cid,
        height: u64,
        delta: &Delta,
        block: &Block,
    ) -> Result<Vec<Cid>> {
        self.crdt.merge(&ms.datastore(), delta, &root.to_string())?;
        debug!(instance = %self.id, cid = %root, height, "merged delta");

        let heads = HeadSet::new(ms, &self.id);
        if block.is_genesis() {
            heads.add(root, height)?;
            return Ok(Vec::new());
        }

        let blocks = BlockStore::new(ms);
        let mut links = block.links.clone();
        links.sort_by(|a, b| a.to_bytes().cmp(&b.to_bytes()));

        let mut is_tip = false;
        let mut children = Vec::new();
        for child in &links {
            if heads.is_head(child)? {
                heads.replace(child, root, height)?;
                is_tip = true;
            } else if blocks.has(child)? {
                if !is_tip {
                    heads.write(root, height)?;
                    is_tip = true;
                }
            } else {
                children.push(*child);
            }
        }

        Ok(children)
    }

    /// Ingest a foreign block, fetching missing ancestry through `syncer`.
    ///
    /// Discovery is breadth-first over blocks not yet stored; merging is a
    /// topological pass that handles ancestors before descendants, so every
    /// block's height can be recomputed locally as one more than the
    /// highest stored height among its links. Re-ingesting a known block is
    /// a no-op.
    pub fn ingest(
        &self,
        ms: &MultiStore<'_>,
        root: Cid,
        syncer: &dyn DagSyncer,
        cancel: &CancelToken,
    ) -> Result<()> {
        let blocks = BlockStore::new(ms);
        if blocks.has(&root)? {
            return Ok(());
        }

        // Discovery: fetch the missing sub-DAG.
        let mut frontier = VecDeque::from([root]);
        let mut seen: HashSet<Cid> = HashSet::new();
        let mut fetched: Vec<(Cid, Block)> = Vec::new();
        while let Some(cid) = frontier.pop_front() {
            cancel.check()?;
            if seen.contains(&cid) || blocks.has(&cid)? {
                continue;
            }
            seen.insert(cid);

            let block = syncer.fetch(&cid)?;
            let received = sha256_cid_v1(DAG_CBOR, &block.encode()?);
            if received != cid {
                return Err(ClockError::CidMismatch {
                    requested: cid,
                    received,
                });
            }

            for link in &block.links {
                if !seen.contains(link) && !blocks.has(link)? {
                    frontier.push_back(*link);
                }
            }
            fetched.push((cid, block));
        }

        // Merge, ancestors first. A stored block is a merged block, so a
        // fetched block is ready once every link is stored.
        let mut pending = fetched;
        while !pending.is_empty() {
            cancel.check()?;
            let mut remaining = Vec::with_capacity(pending.len());
            let mut progressed = false;

            for (cid, block) in pending {
                let mut resolved = true;
                for link in &block.links {
                    if !blocks.has(link)? {
                        resolved = false;
                        break;
                    }
                }
                if !resolved {
                    remaining.push((cid, block));
                    continue;
                }

                let height = self.block_height(&blocks, &block)?;
                let mut delta = Delta::decode(self.crdt.kind(), &block.data).map_err(|e| {
                    ClockError::CorruptBlock {
                        cid,
                        reason: e.to_string(),
                    }
                })?;
                delta.set_priority(height);

                blocks.put(&block)?;
                self.process_node(ms, &cid, height, &delta, &block)?;
                progressed = true;
            }

            if !progressed {
                // The peer never served some link; report the first one.
                let in_flight: HashSet<Cid> = remaining.iter().map(|(c, _)| *c).collect();
                let mut missing = root;
                'search: for (_, block) in &remaining {
                    for link in &block.links {
                        if !in_flight.contains(link) && !blocks.has(link)? {
                            missing = *link;
                            break 'search;
                        }
                    }
                }
                return Err(ClockError::AncestorUnavailable { cid: missing });
            }
            pending = remaining;
        }

        Ok(())
    }

    /// Height of a block about to be merged: one more than the highest
    /// height among its stored links; one for a genesis block.
    fn block_height(&self, blocks: &BlockStore<'_>, block: &Block) -> Result<u64> {
        if block.is_genesis() {
            return Ok(1);
        }
        let mut max = 0u64;
        for link in &block.links {
            let ancestor = blocks.get(link)?;
            let delta =
                Delta::decode(self.crdt.kind(), &ancestor.data).map_err(|e| {
                    ClockError::CorruptBlock {
                        cid: *link,
                        reason: e.to_string(),
                    }
                })?;
            max = max.max(delta.priority());
        }
        Ok(max + 1)
    }
}
