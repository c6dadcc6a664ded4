//! Error types for the storage substrate.

use thiserror::Error;

/// Errors that can occur in substrate operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested key is absent.
    #[error("key not found")]
    NotFound,

    /// A concurrent commit invalidated this transaction's read set.
    /// The caller may retry with a fresh transaction.
    #[error("transaction conflict")]
    TxnConflict,

    /// The transaction was already committed or discarded.
    #[error("transaction is closed")]
    Closed,

    /// The underlying medium failed.
    #[error("storage fault: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
