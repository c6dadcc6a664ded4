//! Error types for the Merkle clock and its stores.

use ipld_core::cid::Cid;
use thiserror::Error;

use tessera_core::CrdtError;
use tessera_store::StoreError;

/// Errors that can occur while producing or ingesting DAG blocks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// Substrate failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// CRDT merge or delta codec failure, propagated unchanged.
    #[error(transparent)]
    Crdt(#[from] CrdtError),

    /// A block failed to decode. Fatal for the operation; the block is not
    /// stored.
    #[error("corrupt block {cid}: {reason}")]
    CorruptBlock { cid: Cid, reason: String },

    /// A peer returned a block whose content hashes to a different CID.
    /// The block is dropped.
    #[error("cid mismatch: requested {requested}, received {received}")]
    CidMismatch { requested: Cid, received: Cid },

    /// A linked ancestor could not be fetched. The caller may retry the
    /// whole ingest.
    #[error("ancestor {cid} unavailable")]
    AncestorUnavailable { cid: Cid },

    /// A stored head entry is not a valid `<cid> -> varint height` pair.
    #[error("corrupt head entry: {reason}")]
    CorruptHeadEntry { reason: String },

    /// A locally produced block failed to encode.
    #[error("block codec: {0}")]
    Codec(String),

    /// The operation was cancelled; the enclosing transaction should be
    /// discarded.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ClockError>;
