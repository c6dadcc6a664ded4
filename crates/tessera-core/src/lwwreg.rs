//! Last-writer-wins register.
//!
//! State lives in the `/data` namespace as two entries per register:
//! `/<id>/v/<key>` holds the current value, `/<id>/p/<key>` the varint
//! priority of the write that produced it. The merge keeps the pair with
//! the highest priority, breaking ties by lexicographic byte order of the
//! value. Replaying a delta never changes the stored pair.

use integer_encoding::VarInt;

use tessera_store::{Namespaced, StoreError};

use crate::delta::{Delta, LwwDelta};
use crate::error::{CrdtError, Result};

/// A last-writer-wins register bound to one key of one CRDT instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LwwRegister {
    id: String,
    key: String,
}

impl LwwRegister {
    /// Create a register for `key` within the CRDT instance `id`.
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        LwwRegister {
            id: id.into(),
            key: key.into(),
        }
    }

    /// The CRDT instance this register belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The register key.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn value_key(&self) -> Vec<u8> {
        format!("/{}/v/{}", self.id, self.key).into_bytes()
    }

    fn priority_key(&self) -> Vec<u8> {
        format!("/{}/p/{}", self.id, self.key).into_bytes()
    }

    /// Read the current value.
    pub fn value(&self, data: &Namespaced<'_>) -> Result<Vec<u8>> {
        Ok(data.get(&self.value_key())?)
    }

    /// Produce a delta writing `value`. The priority is left unset; the
    /// clock fills it with the new block's height.
    pub fn set(&self, value: &[u8]) -> Delta {
        Delta::Lww(LwwDelta {
            priority: 0,
            data: value.to_vec(),
        })
    }

    /// Fold a delta into the stored pair using the dominance rule.
    pub fn merge(&self, data: &Namespaced<'_>, delta: &LwwDelta, _block_id: &str) -> Result<()> {
        self.set_value(data, &delta.data, delta.priority)
    }

    fn set_value(&self, data: &Namespaced<'_>, value: &[u8], priority: u64) -> Result<()> {
        let current = self.priority(data)?;

        if priority < current {
            return Ok(());
        }
        if priority == current {
            // Equal heights: the lexicographically greater value wins, and
            // an equal value is left untouched.
            let stored = match data.get(&self.value_key()) {
                Ok(v) => v,
                Err(StoreError::NotFound) => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            if stored.as_slice() >= value {
                return Ok(());
            }
        }

        data.set(&self.value_key(), value)?;
        self.set_priority(data, priority)
    }

    /// The stored priority, or zero when the register has never been written.
    pub fn priority(&self, data: &Namespaced<'_>) -> Result<u64> {
        let key = self.priority_key();
        match data.get(&key) {
            Ok(raw) => match u64::decode_var(&raw) {
                Some((priority, _)) => Ok(priority),
                None => Err(CrdtError::CorruptPriority { key }),
            },
            Err(StoreError::NotFound) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn set_priority(&self, data: &Namespaced<'_>, priority: u64) -> Result<()> {
        Ok(data.set(&self.priority_key(), &priority.encode_var_vec())?)
    }
}
