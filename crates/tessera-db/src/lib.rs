//! # tessera-db
//!
//! The database layer of Tessera: a transactional container over the
//! Merkle-CRDT core, plus the peer-facing surfaces that ride on it —
//! replicator configuration and schema descriptions.
//!
//! A [`Db`] serializes mutations behind one writer lock; a [`Peer`] binds
//! an identity to a database and manages which remote peers receive which
//! schemas. Reads never take the writer lock.
//!
//! ## Example
//!
//! ```rust
//! use tessera_db::Db;
//!
//! let db = Db::new();
//! db.put("user:1", "name", b"John").unwrap();
//! assert_eq!(db.get("user:1", "name").unwrap(), b"John");
//! ```

mod db;
pub mod description;
mod error;
mod peer;
mod replicator;

pub use db::Db;
pub use error::{DbError, Result};
pub use peer::Peer;
pub use replicator::{NullSink, PeerId, PeerInfo, Replicator, ReplicatorSink};
