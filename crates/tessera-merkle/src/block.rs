//! The DAG block format.
//!
//! A block is `{"Data": <delta payload>, "Links": [<ancestor CIDs>]}` in
//! canonical DAG-CBOR: fixed field order, definite lengths, links as CBOR
//! tag 42. The block's CID is derived from this encoding and never stored
//! inside it. Two replicas holding the same heads produce byte-identical
//! blocks for the same delta, and therefore the same CID.

use ipld_core::cid::Cid;
use serde::{Deserialize, Serialize};

use crate::cid::{sha256_cid_v1, DAG_CBOR};
use crate::error::{ClockError, Result};

/// A node of the Merkle DAG.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Encoded delta payload.
    #[serde(rename = "Data", with = "serde_bytes")]
    pub data: Vec<u8>,

    /// Ancestors: the heads the writer observed, ascending by CID bytes.
    /// Empty only for the genesis block of a CRDT instance.
    #[serde(rename = "Links")]
    pub links: Vec<Cid>,
}

impl Block {
    /// Build a block from a delta payload and its observed heads.
    pub fn new(data: Vec<u8>, links: Vec<Cid>) -> Self {
        Block { data, links }
    }

    /// Whether this is the first block of its instance.
    pub fn is_genesis(&self) -> bool {
        self.links.is_empty()
    }

    /// Canonical DAG-CBOR encoding.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_ipld_dagcbor::to_vec(self).map_err(|e| ClockError::Codec(e.to_string()))
    }

    /// Decode a block received from a peer or read from the block store.
    pub fn decode(cid: &Cid, bytes: &[u8]) -> Result<Block> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|e| ClockError::CorruptBlock {
            cid: *cid,
            reason: e.to_string(),
        })
    }

    /// The CID of this block's canonical encoding.
    pub fn cid(&self) -> Result<Cid> {
        Ok(sha256_cid_v1(DAG_CBOR, &self.encode()?))
    }
}
