//! Replicator records.
//!
//! A replicator is a remote peer that newly produced blocks are pushed to,
//! scoped to a set of schema roots. Records persist as JSON under
//! `/system/replicator/<peer-id>` and are mirrored in memory by the peer.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Base58btc alphabet used by textual peer identifiers.
const PEER_ID_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A validated textual peer identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Parse and validate a peer id. Rejects the empty string and any
    /// character outside the base58btc alphabet.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() || !s.chars().all(|c| PEER_ID_ALPHABET.contains(c)) {
            return Err(DbError::InvalidPeerId(s.to_string()));
        }
        Ok(PeerId(s.to_string()))
    }

    /// The textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address book entry for a replication target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// The target peer.
    #[serde(rename = "ID")]
    pub id: PeerId,

    /// Multiaddresses the transport may dial.
    #[serde(rename = "Addrs")]
    pub addrs: Vec<String>,
}

/// A configured replication target.
///
/// On input, `schemas` holds schema *names* chosen by the operator (empty
/// means every schema); once persisted it holds the resolved schema roots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replicator {
    /// Where to push.
    #[serde(rename = "Info")]
    pub info: PeerInfo,

    /// What to push: schema names on input, schema roots once persisted.
    #[serde(rename = "Schemas")]
    pub schemas: Vec<String>,
}

/// Delivery contract for the sync driver.
///
/// The peer invokes this for every `(schema root, peer)` pair that becomes
/// newly replicated; the driver is responsible for actually shipping the
/// blocks over the wire.
pub trait ReplicatorSink {
    /// Schedule a push of `schema_root`'s update log to `peer`.
    fn push_log(&self, peer: &PeerId, schema_root: &str);
}

/// A sink that drops every push. Used where no transport is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ReplicatorSink for NullSink {
    fn push_log(&self, _peer: &PeerId, _schema_root: &str) {}
}
