//! Error types for the database layer.

use thiserror::Error;

use tessera_core::CrdtError;
use tessera_merkle::ClockError;
use tessera_store::StoreError;

/// Errors that can occur in database and peer operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// Substrate failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// CRDT failure, propagated unchanged.
    #[error(transparent)]
    Crdt(#[from] CrdtError),

    /// Merkle clock failure, propagated unchanged.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// The peer id is empty or carries characters outside its alphabet.
    #[error("invalid peer id {0:?}")]
    InvalidPeerId(String),

    /// A peer may not replicate to itself.
    #[error("replication target is self")]
    SelfTarget,

    /// No schema with the given name exists.
    #[error("no schema named {0:?}")]
    UnknownSchema(String),

    /// A persisted record failed to encode or decode.
    #[error("record codec: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
