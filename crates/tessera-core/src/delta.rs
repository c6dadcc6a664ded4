//! Delta payloads and their canonical wire codec.
//!
//! A delta is the unit of replication: it rides in the `Data` field of a
//! Merkle-DAG block, encoded as DAG-CBOR with a fixed field order so that
//! every replica produces byte-identical payloads for the same logical
//! delta. Field names are capitalized on the wire for compatibility with
//! the block format.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CrdtError, Result};

/// Tags for the supported CRDT kinds. Picks the codec for a block payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CrdtKind {
    /// Last-writer-wins register.
    Lww,
}

impl fmt::Display for CrdtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrdtKind::Lww => write!(f, "lww"),
        }
    }
}

/// A delta for the LWW register: the written value plus the block height
/// assigned by the clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LwwDelta {
    /// Block height; the dominant ordering key for the merge.
    #[serde(rename = "Priority")]
    pub priority: u64,

    /// The register value being written.
    #[serde(rename = "Data", with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// A delta of any supported kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delta {
    Lww(LwwDelta),
}

impl Delta {
    /// The kind tag of this delta.
    pub fn kind(&self) -> CrdtKind {
        match self {
            Delta::Lww(_) => CrdtKind::Lww,
        }
    }

    /// The delta's priority (block height). Zero until the clock assigns it.
    pub fn priority(&self) -> u64 {
        match self {
            Delta::Lww(d) => d.priority,
        }
    }

    /// Assign the priority. Called by the clock exactly once per block.
    pub fn set_priority(&mut self, priority: u64) {
        match self {
            Delta::Lww(d) => d.priority = priority,
        }
    }

    /// Canonical DAG-CBOR encoding of the payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Delta::Lww(d) => {
                serde_ipld_dagcbor::to_vec(d).map_err(|e| CrdtError::Codec(e.to_string()))
            }
        }
    }

    /// Decode a payload of the given kind.
    pub fn decode(kind: CrdtKind, bytes: &[u8]) -> Result<Delta> {
        match kind {
            CrdtKind::Lww => {
                let d: LwwDelta = serde_ipld_dagcbor::from_slice(bytes)
                    .map_err(|e| CrdtError::Codec(e.to_string()))?;
                Ok(Delta::Lww(d))
            }
        }
    }
}
