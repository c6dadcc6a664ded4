//! # tessera-merkle
//!
//! The Merkle clock: causal history for Tessera's CRDTs as a
//! content-addressed DAG.
//!
//! Every mutation becomes a block whose links are the DAG heads the writer
//! observed; the block's CID is the SHA-256 of its canonical DAG-CBOR
//! encoding. Replicas exchange blocks, walk missing ancestry through a
//! [`DagSyncer`], and merge each delta into the CRDT state in an order that
//! converges regardless of arrival order.
//!
//! This crate provides:
//! - CID derivation over canonical encodings ([`cid`])
//! - The block format and codec ([`Block`])
//! - A content-addressed block store over the `/blocks` namespace
//! - The per-instance head set over `/heads`
//! - The clock itself: local delta production and foreign block ingestion
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Crdt, LwwRegister};
//! use tessera_merkle::MerkleClock;
//! use tessera_store::{MemoryRootstore, MultiStore};
//!
//! let store = MemoryRootstore::new();
//! let clock = MerkleClock::new("doc1", Crdt::Lww(LwwRegister::new("doc1", "name")));
//!
//! let txn = store.begin();
//! let ms = MultiStore::new(&txn);
//! let reg = LwwRegister::new("doc1", "name");
//! clock.add_delta(&ms, reg.set(b"John")).unwrap();
//! txn.commit().unwrap();
//! ```

mod block;
mod blockstore;
pub mod cid;
mod clock;
mod error;
mod heads;
mod syncer;

pub use block::Block;
pub use blockstore::BlockStore;
pub use clock::{CancelToken, MerkleClock};
pub use error::{ClockError, Result};
pub use heads::HeadSet;
pub use syncer::{DagSyncer, MemorySyncer};

pub use ipld_core::cid::Cid;
