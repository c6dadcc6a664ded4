//! The database container.
//!
//! A [`Db`] owns the rootstore and the writer lock that serializes every
//! mutation (local writes, ingests, replicator configuration). Each
//! mutation runs in its own transaction; readers open their own
//! transactions and never take the lock.
//!
//! The CRDT instance for a document field is addressed as `<doc>/<field>`:
//! that string namespaces the field's head set, while the LWW state lives
//! under the document's `/data` keys.

use parking_lot::{Mutex, MutexGuard};

use tessera_core::{Crdt, LwwRegister};
use tessera_merkle::{CancelToken, Cid, DagSyncer, HeadSet, MerkleClock};
use tessera_store::{MemoryRootstore, MultiStore, Txn};

use crate::error::Result;

/// A single-node handle to the replicated document store.
#[derive(Debug, Default)]
pub struct Db {
    rootstore: MemoryRootstore,
    write_lock: Mutex<()>,
}

impl Db {
    /// Open a database over a fresh in-memory rootstore.
    pub fn new() -> Self {
        Db::default()
    }

    /// Open a database over an existing rootstore.
    pub fn with_rootstore(rootstore: MemoryRootstore) -> Self {
        Db {
            rootstore,
            write_lock: Mutex::new(()),
        }
    }

    /// Begin a transaction. The caller commits or discards it.
    pub fn begin(&self) -> Txn {
        self.rootstore.begin()
    }

    /// A clone of the rootstore handle, sharing the same key space.
    pub fn rootstore_handle(&self) -> MemoryRootstore {
        self.rootstore.clone()
    }

    /// Take the writer lock. Held across every mutating surface so that no
    /// two mutations race on a head set.
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock()
    }

    fn clock_for(doc: &str, field: &str) -> MerkleClock {
        let instance = format!("{doc}/{field}");
        MerkleClock::new(instance, Crdt::Lww(LwwRegister::new(doc, field)))
    }

    /// Write a field value, producing a new DAG block. Returns the block's
    /// CID for publication to replicators.
    pub fn put(&self, doc: &str, field: &str, value: &[u8]) -> Result<Cid> {
        let _guard = self.lock_writer();
        let txn = self.begin();
        let ms = MultiStore::new(&txn);

        let clock = Self::clock_for(doc, field);
        let delta = LwwRegister::new(doc, field).set(value);
        let cid = match clock.add_delta(&ms, delta) {
            Ok(cid) => cid,
            Err(e) => {
                txn.discard();
                return Err(e.into());
            }
        };
        txn.commit()?;
        Ok(cid)
    }

    /// Read the current value of a field.
    pub fn get(&self, doc: &str, field: &str) -> Result<Vec<u8>> {
        let txn = self.begin();
        let ms = MultiStore::new(&txn);
        Ok(LwwRegister::new(doc, field).value(&ms.datastore())?)
    }

    /// Ingest a foreign block for a field, pulling missing ancestry from
    /// `syncer`. The whole sub-DAG lands in one transaction.
    pub fn ingest(
        &self,
        doc: &str,
        field: &str,
        root: Cid,
        syncer: &dyn DagSyncer,
        cancel: &CancelToken,
    ) -> Result<()> {
        let _guard = self.lock_writer();
        let txn = self.begin();
        let ms = MultiStore::new(&txn);

        let clock = Self::clock_for(doc, field);
        match clock.ingest(&ms, root, syncer, cancel) {
            Ok(()) => {
                txn.commit()?;
                Ok(())
            }
            Err(e) => {
                txn.discard();
                Err(e.into())
            }
        }
    }

    /// Current DAG tips of a field, ascending by CID bytes, plus the
    /// maximum height.
    pub fn heads(&self, doc: &str, field: &str) -> Result<(Vec<Cid>, u64)> {
        let txn = self.begin();
        let ms = MultiStore::new(&txn);
        let instance = format!("{doc}/{field}");
        Ok(HeadSet::new(&ms, &instance).list()?)
    }
}
