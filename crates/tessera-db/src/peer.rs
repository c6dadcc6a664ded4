//! The local peer: replicator configuration and lifecycle.
//!
//! Persisted records live under `/system/replicator/<peer-id>`; an
//! in-memory `schema root -> peers` map mirrors them under the writer lock
//! so the sync driver can consult targets without touching the store.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::Mutex;
use tracing::info;

use tessera_store::{MultiStore, Txn};

use crate::db::Db;
use crate::description::{get_all_schemas, get_schemas_by_name};
use crate::error::{DbError, Result};
use crate::replicator::{PeerId, Replicator, ReplicatorSink};

const REPLICATOR_PREFIX: &str = "/replicator/";

/// The local peer identity plus its replication configuration.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    db: Db,
    replicators: Mutex<HashMap<String, HashSet<PeerId>>>,
}

impl Peer {
    /// Bind a peer identity to a database, reloading any persisted
    /// replicator records into memory.
    pub fn new(id: PeerId, db: Db) -> Result<Self> {
        let peer = Peer {
            id,
            db,
            replicators: Mutex::new(HashMap::new()),
        };
        for rep in peer.get_all_replicators()? {
            let mut map = peer.replicators.lock();
            for root in &rep.schemas {
                map.entry(root.clone())
                    .or_default()
                    .insert(rep.info.id.clone());
            }
        }
        Ok(peer)
    }

    /// This peer's identity.
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// The underlying database.
    pub fn db(&self) -> &Db {
        &self.db
    }

    fn record_key(id: &PeerId) -> Vec<u8> {
        format!("{REPLICATOR_PREFIX}{id}").into_bytes()
    }

    fn addr_key(id: &PeerId) -> Vec<u8> {
        format!("/{id}").into_bytes()
    }

    /// Peers currently replicating the given schema root.
    pub fn replicator_targets(&self, schema_root: &str) -> Vec<PeerId> {
        let map = self.replicators.lock();
        let mut targets: Vec<_> = map
            .get(schema_root)
            .map(|peers| peers.iter().cloned().collect())
            .unwrap_or_default();
        targets.sort();
        targets
    }

    /// Register (or extend) a replication target.
    ///
    /// `rep.schemas` names the schemas to replicate; empty means all.
    /// The persisted record carries the resolved schema roots. Every newly
    /// added `(root, peer)` pair is offered to `sink` for an initial push.
    pub fn set_replicator(&self, sink: &dyn ReplicatorSink, rep: Replicator) -> Result<Replicator> {
        let _guard = self.db.lock_writer();
        let txn = self.db.begin();
        match self.set_replicator_txn(&txn, sink, rep) {
            Ok(persisted) => {
                txn.commit()?;
                Ok(persisted)
            }
            Err(e) => {
                txn.discard();
                Err(e)
            }
        }
    }

    fn set_replicator_txn(
        &self,
        txn: &Txn,
        sink: &dyn ReplicatorSink,
        mut rep: Replicator,
    ) -> Result<Replicator> {
        if rep.info.id == self.id {
            return Err(DbError::SelfTarget);
        }

        let ms = MultiStore::new(txn);
        let roots = self.resolve_roots(&ms, &rep.schemas)?;

        let mut added = Vec::new();
        {
            let mut map = self.replicators.lock();
            for root in &roots {
                let peers = map.entry(root.clone()).or_default();
                if peers.insert(rep.info.id.clone()) {
                    added.push(root.clone());
                }
            }
        }

        rep.schemas = roots.into_iter().collect();
        let record = serde_json::to_vec(&rep)?;
        ms.systemstore().set(&Self::record_key(&rep.info.id), &record)?;

        // Remember the target's dial addresses for the transport.
        let addrs = serde_json::to_vec(&rep.info.addrs)?;
        ms.peerstore().set(&Self::addr_key(&rep.info.id), &addrs)?;

        info!(
            peer = %rep.info.id,
            schemas = rep.schemas.len(),
            newly_added = added.len(),
            "replicator set"
        );
        for root in &added {
            sink.push_log(&rep.info.id, root);
        }

        Ok(rep)
    }

    /// Remove schemas from a replication target, dropping the record when
    /// none remain. `rep.schemas` names the schemas to stop replicating;
    /// empty means all.
    pub fn delete_replicator(&self, rep: Replicator) -> Result<()> {
        let _guard = self.db.lock_writer();
        let txn = self.db.begin();
        match self.delete_replicator_txn(&txn, rep) {
            Ok(()) => {
                txn.commit()?;
                Ok(())
            }
            Err(e) => {
                txn.discard();
                Err(e)
            }
        }
    }

    fn delete_replicator_txn(&self, txn: &Txn, mut rep: Replicator) -> Result<()> {
        if rep.info.id == self.id {
            return Err(DbError::SelfTarget);
        }

        let ms = MultiStore::new(txn);
        let key = Self::record_key(&rep.info.id);

        let to_remove = if rep.schemas.is_empty() {
            self.resolve_roots(&ms, &[])?
        } else {
            // Named schemas require the record to exist.
            ms.systemstore().get(&key)?;
            self.resolve_roots(&ms, &rep.schemas)?
        };

        let mut remaining = Vec::new();
        {
            let mut map = self.replicators.lock();
            for (root, peers) in map.iter_mut() {
                if peers.contains(&rep.info.id) {
                    if to_remove.contains(root) {
                        peers.remove(&rep.info.id);
                    } else {
                        remaining.push(root.clone());
                    }
                }
            }
            map.retain(|_, peers| !peers.is_empty());
        }
        remaining.sort();

        info!(
            peer = %rep.info.id,
            remaining = remaining.len(),
            "replicator deleted"
        );

        if remaining.is_empty() {
            // Nothing left to replicate: drop the record and the addresses.
            ms.peerstore().delete(&Self::addr_key(&rep.info.id))?;
            return Ok(ms.systemstore().delete(&key)?);
        }
        rep.schemas = remaining;
        let record = serde_json::to_vec(&rep)?;
        Ok(ms.systemstore().set(&key, &record)?)
    }

    /// Every persisted replicator record.
    pub fn get_all_replicators(&self) -> Result<Vec<Replicator>> {
        let txn = self.db.begin();
        let ms = MultiStore::new(&txn);
        let mut reps = Vec::new();
        for (_, value) in ms.systemstore().iter_prefix(REPLICATOR_PREFIX.as_bytes())? {
            reps.push(serde_json::from_slice(&value)?);
        }
        Ok(reps)
    }

    /// Resolve schema names to roots; an empty list means every schema.
    fn resolve_roots(&self, ms: &MultiStore<'_>, names: &[String]) -> Result<BTreeSet<String>> {
        let mut roots = BTreeSet::new();
        if names.is_empty() {
            for schema in get_all_schemas(ms)? {
                roots.insert(schema.root);
            }
        } else {
            for name in names {
                for schema in get_schemas_by_name(ms, name)? {
                    roots.insert(schema.root);
                }
            }
        }
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    use crate::description::{create_schema_version, FieldDescription, SchemaDescription};
    use crate::replicator::{NullSink, PeerInfo};

    /// Records every push it is offered.
    #[derive(Debug, Default)]
    struct RecordingSink {
        pushes: PlMutex<Vec<(PeerId, String)>>,
    }

    impl ReplicatorSink for RecordingSink {
        fn push_log(&self, peer: &PeerId, schema_root: &str) {
            self.pushes
                .lock()
                .push((peer.clone(), schema_root.to_string()));
        }
    }

    fn schema(name: &str) -> SchemaDescription {
        SchemaDescription {
            name: name.to_string(),
            root: String::new(),
            version_id: String::new(),
            fields: vec![FieldDescription {
                name: "name".to_string(),
                id: 0,
            }],
        }
    }

    fn peer_with_schemas(names: &[&str]) -> (Peer, Vec<String>) {
        let db = Db::new();
        let txn = db.begin();
        let ms = MultiStore::new(&txn);
        let mut roots = Vec::new();
        for name in names {
            roots.push(create_schema_version(&ms, schema(name)).unwrap().root);
        }
        txn.commit().unwrap();
        let peer = Peer::new(PeerId::parse("SelfPeer1").unwrap(), db).unwrap();
        (peer, roots)
    }

    fn target(id: &str, schemas: &[&str]) -> Replicator {
        Replicator {
            info: PeerInfo {
                id: PeerId::parse(id).unwrap(),
                addrs: vec!["/ip4/127.0.0.1/tcp/9171".to_string()],
            },
            schemas: schemas.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_set_replicator_persists_roots() {
        let (peer, roots) = peer_with_schemas(&["User"]);
        let sink = RecordingSink::default();

        let persisted = peer
            .set_replicator(&sink, target("RemotePeer1", &["User"]))
            .unwrap();
        assert_eq!(persisted.schemas, roots);

        let all = peer.get_all_replicators().unwrap();
        assert_eq!(all, vec![persisted]);
        assert_eq!(
            peer.replicator_targets(&roots[0]),
            vec![PeerId::parse("RemotePeer1").unwrap()]
        );
        assert_eq!(sink.pushes.lock().len(), 1);

        // Dial addresses land in the peer metadata namespace.
        let addrs = peer
            .db()
            .rootstore_handle()
            .get(b"/peers/RemotePeer1")
            .unwrap();
        let addrs: Vec<String> = serde_json::from_slice(&addrs).unwrap();
        assert_eq!(addrs, vec!["/ip4/127.0.0.1/tcp/9171".to_string()]);
    }

    #[test]
    fn test_set_replicator_rejects_self() {
        let (peer, _) = peer_with_schemas(&["User"]);
        assert_eq!(
            peer.set_replicator(&NullSink, target("SelfPeer1", &[])),
            Err(DbError::SelfTarget)
        );
    }

    #[test]
    fn test_set_replicator_unknown_schema() {
        let (peer, _) = peer_with_schemas(&["User"]);
        assert!(matches!(
            peer.set_replicator(&NullSink, target("RemotePeer1", &["Ghost"])),
            Err(DbError::UnknownSchema(_))
        ));
        assert!(peer.get_all_replicators().unwrap().is_empty());
    }

    #[test]
    fn test_empty_schema_list_means_all() {
        let (peer, mut roots) = peer_with_schemas(&["User", "Device"]);
        roots.sort();

        let persisted = peer
            .set_replicator(&NullSink, target("RemotePeer1", &[]))
            .unwrap();
        assert_eq!(persisted.schemas, roots);
    }

    #[test]
    fn test_repeated_set_pushes_once() {
        let (peer, _) = peer_with_schemas(&["User"]);
        let sink = RecordingSink::default();

        peer.set_replicator(&sink, target("RemotePeer1", &["User"]))
            .unwrap();
        peer.set_replicator(&sink, target("RemotePeer1", &["User"]))
            .unwrap();
        assert_eq!(sink.pushes.lock().len(), 1);
    }

    #[test]
    fn test_delete_replicator_drops_record() {
        let (peer, roots) = peer_with_schemas(&["User"]);
        peer.set_replicator(&NullSink, target("RemotePeer1", &["User"]))
            .unwrap();

        peer.delete_replicator(target("RemotePeer1", &[])).unwrap();
        assert!(peer.get_all_replicators().unwrap().is_empty());
        assert!(peer.replicator_targets(&roots[0]).is_empty());
    }

    #[test]
    fn test_partial_delete_keeps_remaining_roots() {
        let (peer, _) = peer_with_schemas(&["User", "Device"]);
        peer.set_replicator(&NullSink, target("RemotePeer1", &[]))
            .unwrap();

        peer.delete_replicator(target("RemotePeer1", &["User"]))
            .unwrap();

        let all = peer.get_all_replicators().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].schemas.len(), 1);
    }

    #[test]
    fn test_replicators_reload_on_startup() {
        let (peer, roots) = peer_with_schemas(&["User"]);
        peer.set_replicator(&NullSink, target("RemotePeer1", &["User"]))
            .unwrap();

        // Rebind a fresh peer over the same rootstore.
        let db = Db::with_rootstore(peer.db().rootstore_handle());
        let reborn = Peer::new(PeerId::parse("SelfPeer1").unwrap(), db).unwrap();
        assert_eq!(
            reborn.replicator_targets(&roots[0]),
            vec![PeerId::parse("RemotePeer1").unwrap()]
        );
    }
}
