//! # tessera-store
//!
//! Ordered byte-keyed storage substrate for the Tessera database.
//!
//! This crate provides:
//! - An in-memory rootstore with ascending-key prefix iteration
//! - Optimistic transactions over a stable snapshot
//! - Atomic write batches
//! - The multi-store: five namespaced views sharing one transaction
//!
//! Every higher layer (CRDT state, head set, block store, system records)
//! operates on one of the namespaced views; nothing above this crate touches
//! the rootstore directly.
//!
//! ## Example
//!
//! ```rust
//! use tessera_store::{MemoryRootstore, MultiStore};
//!
//! let store = MemoryRootstore::new();
//! let txn = store.begin();
//! {
//!     let ms = MultiStore::new(&txn);
//!     ms.datastore().set(b"/doc1", b"hello").unwrap();
//! }
//! txn.commit().unwrap();
//!
//! let txn = store.begin();
//! let ms = MultiStore::new(&txn);
//! assert_eq!(ms.datastore().get(b"/doc1").unwrap(), b"hello");
//! ```

mod error;
mod memory;
mod multistore;
mod namespace;
mod txn;

pub use error::{Result, StoreError};
pub use memory::{MemoryRootstore, WriteBatch};
pub use multistore::MultiStore;
pub use namespace::Namespaced;
pub use txn::{PrefixIter, Txn};
