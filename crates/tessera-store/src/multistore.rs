//! The multi-store: five namespaced views sharing one transaction.
//!
//! Namespaces mirror the on-disk layout:
//! `/data` CRDT state, `/heads` DAG tips, `/blocks` content-addressed
//! blocks, `/system` collaborator records, `/peers` peer metadata.

use crate::namespace::Namespaced;
use crate::txn::Txn;

const DATA_NS: &[u8] = b"/data";
const HEADS_NS: &[u8] = b"/heads";
const BLOCKS_NS: &[u8] = b"/blocks";
const SYSTEM_NS: &[u8] = b"/system";
const PEERS_NS: &[u8] = b"/peers";

/// Typed views over one transaction. Pure projection; no locking.
#[derive(Clone, Copy, Debug)]
pub struct MultiStore<'t> {
    txn: &'t Txn,
}

impl<'t> MultiStore<'t> {
    /// Wrap a transaction.
    pub fn new(txn: &'t Txn) -> Self {
        MultiStore { txn }
    }

    /// The unprefixed root view.
    pub fn rootstore(&self) -> &'t Txn {
        self.txn
    }

    /// CRDT state under `/data`.
    pub fn datastore(&self) -> Namespaced<'t> {
        Namespaced::new(self.txn, DATA_NS)
    }

    /// DAG tips under `/heads`.
    pub fn headstore(&self) -> Namespaced<'t> {
        Namespaced::new(self.txn, HEADS_NS)
    }

    /// Content-addressed blocks under `/blocks`.
    pub fn blockstore(&self) -> Namespaced<'t> {
        Namespaced::new(self.txn, BLOCKS_NS)
    }

    /// Collaborator records under `/system`.
    pub fn systemstore(&self) -> Namespaced<'t> {
        Namespaced::new(self.txn, SYSTEM_NS)
    }

    /// Peer metadata under `/peers`.
    pub fn peerstore(&self) -> Namespaced<'t> {
        Namespaced::new(self.txn, PEERS_NS)
    }
}
