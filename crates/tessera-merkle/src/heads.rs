//! The head set: current DAG tips of one CRDT instance.
//!
//! Entries live under `/<instance>/<raw-cid-bytes>` in the `/heads`
//! namespace; values are the unsigned varint height of the tip. A CID is a
//! head exactly while no locally known block links to it.

use integer_encoding::VarInt;
use ipld_core::cid::Cid;
use tracing::info;

use tessera_store::{MultiStore, Namespaced};

use crate::error::{ClockError, Result};

/// Head set view over the active transaction.
#[derive(Clone, Debug)]
pub struct HeadSet<'t> {
    store: Namespaced<'t>,
    id: String,
}

impl<'t> HeadSet<'t> {
    /// Create the view for the CRDT instance `id`.
    pub fn new(ms: &MultiStore<'t>, id: &str) -> Self {
        HeadSet {
            store: ms.headstore(),
            id: id.to_string(),
        }
    }

    fn prefix(&self) -> Vec<u8> {
        format!("/{}/", self.id).into_bytes()
    }

    fn key(&self, cid: &Cid) -> Vec<u8> {
        let mut key = self.prefix();
        key.extend_from_slice(&cid.to_bytes());
        key
    }

    /// Unconditionally upsert a head entry.
    pub fn write(&self, cid: &Cid, height: u64) -> Result<()> {
        Ok(self.store.set(&self.key(cid), &height.encode_var_vec())?)
    }

    /// Record a new head.
    pub fn add(&self, cid: &Cid, height: u64) -> Result<()> {
        info!(instance = %self.id, cid = %cid, height, "adding DAG head");
        self.write(cid, height)
    }

    /// Atomically replace `old` with `new` at the given height.
    pub fn replace(&self, old: &Cid, new: &Cid, height: u64) -> Result<()> {
        info!(
            instance = %self.id,
            old = %old,
            new = %new,
            height,
            "replacing DAG head"
        );
        self.store.delete(&self.key(old))?;
        self.write(new, height)
    }

    /// Whether `cid` is currently a head.
    pub fn is_head(&self, cid: &Cid) -> Result<bool> {
        Ok(self.store.has(&self.key(cid))?)
    }

    /// All current heads, ascending by CID bytes, plus the maximum height.
    /// An empty set yields `(vec![], 0)`.
    pub fn list(&self) -> Result<(Vec<Cid>, u64)> {
        let prefix = self.prefix();
        let mut heads = Vec::new();
        let mut max_height = 0u64;

        for (key, value) in self.store.iter_prefix(&prefix)? {
            let raw = &key[prefix.len()..];
            let cid = Cid::try_from(raw).map_err(|e| ClockError::CorruptHeadEntry {
                reason: format!("bad cid in head key: {e}"),
            })?;
            let (height, _) =
                u64::decode_var(&value).ok_or_else(|| ClockError::CorruptHeadEntry {
                    reason: format!("height for {cid} is not a varint"),
                })?;
            if height > max_height {
                max_height = height;
            }
            heads.push(cid);
        }

        heads.sort_by(|a, b| a.to_bytes().cmp(&b.to_bytes()));
        Ok((heads, max_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_store::MemoryRootstore;

    use crate::cid::{sha256_cid_v1, DAG_CBOR};

    fn cid(n: u8) -> Cid {
        sha256_cid_v1(DAG_CBOR, &[n])
    }

    #[test]
    fn test_empty_set() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let heads = HeadSet::new(&ms, "doc1");

        let (cids, max) = heads.list().unwrap();
        assert!(cids.is_empty());
        assert_eq!(max, 0);
    }

    #[test]
    fn test_add_and_list_sorted() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let heads = HeadSet::new(&ms, "doc1");

        let (a, b, c) = (cid(1), cid(2), cid(3));
        heads.add(&a, 1).unwrap();
        heads.add(&b, 3).unwrap();
        heads.add(&c, 2).unwrap();

        let (cids, max) = heads.list().unwrap();
        assert_eq!(max, 3);
        assert_eq!(cids.len(), 3);
        let mut sorted = cids.clone();
        sorted.sort_by(|x, y| x.to_bytes().cmp(&y.to_bytes()));
        assert_eq!(cids, sorted);
    }

    #[test]
    fn test_replace() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let heads = HeadSet::new(&ms, "doc1");

        let (old, new) = (cid(1), cid(2));
        heads.add(&old, 1).unwrap();
        heads.replace(&old, &new, 2).unwrap();

        assert!(!heads.is_head(&old).unwrap());
        assert!(heads.is_head(&new).unwrap());
        let (cids, max) = heads.list().unwrap();
        assert_eq!(cids, vec![new]);
        assert_eq!(max, 2);
    }

    #[test]
    fn test_instances_are_disjoint() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let doc1 = HeadSet::new(&ms, "doc1");
        let doc2 = HeadSet::new(&ms, "doc2");

        doc1.add(&cid(1), 1).unwrap();
        assert!(!doc2.is_head(&cid(1)).unwrap());
        assert!(doc2.list().unwrap().0.is_empty());
    }

    #[test]
    fn test_corrupt_height_is_surfaced() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ms = MultiStore::new(&txn);
        let heads = HeadSet::new(&ms, "doc1");

        heads.add(&cid(1), 1).unwrap();
        // Overwrite the stored height with bytes that never terminate.
        let mut key = b"/doc1/".to_vec();
        key.extend_from_slice(&cid(1).to_bytes());
        ms.headstore().set(&key, &[0x80; 10]).unwrap();

        assert!(matches!(
            heads.list(),
            Err(ClockError::CorruptHeadEntry { .. })
        ));
    }
}
