//! Error types for CRDT state and delta codecs.

use thiserror::Error;

use crate::delta::CrdtKind;
use tessera_store::StoreError;

/// Errors that can occur while merging or encoding CRDT state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrdtError {
    /// Substrate failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The delta's dynamic kind does not match this CRDT instance.
    /// Fatal for the operation that carried the delta.
    #[error("mismatched merge type: expected {expected}, got {actual}")]
    MergeTypeMismatch { expected: CrdtKind, actual: CrdtKind },

    /// The delta payload failed to encode or decode.
    #[error("delta codec: {0}")]
    Codec(String),

    /// A stored priority entry is not a valid varint.
    #[error("corrupt priority entry for register {key:?}")]
    CorruptPriority { key: Vec<u8> },
}

pub type Result<T> = std::result::Result<T, CrdtError>;
