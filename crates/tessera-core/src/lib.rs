//! # tessera-core
//!
//! Replicated data types for the Tessera database.
//!
//! A CRDT here is a *state stored in the datastore* plus a *delta codec*:
//! mutations produce deltas, deltas travel inside Merkle-DAG blocks, and
//! `merge` folds a delta into the stored state with a commutative,
//! associative, idempotent join. Convergence holds regardless of the order
//! in which replicas merge the same set of deltas.
//!
//! Dispatch over CRDT kinds is a tagged enum ([`Crdt`], [`Delta`]); adding a
//! type means adding a variant, not a trait hierarchy.

mod delta;
mod error;
mod lwwreg;

pub use delta::{CrdtKind, Delta, LwwDelta};
pub use error::{CrdtError, Result};
pub use lwwreg::LwwRegister;

use tessera_store::Namespaced;

/// A CRDT instance bound to its datastore keys.
///
/// Both operations take the `/data` view of the active transaction as an
/// explicit capability; instances hold no store handles themselves.
#[derive(Clone, Debug)]
pub enum Crdt {
    /// Last-writer-wins register.
    Lww(LwwRegister),
}

impl Crdt {
    /// The kind tag used to pick the delta codec.
    pub fn kind(&self) -> CrdtKind {
        match self {
            Crdt::Lww(_) => CrdtKind::Lww,
        }
    }

    /// Fold a delta into the stored state.
    ///
    /// `block_id` is the content identifier of the block that carried the
    /// delta; it is threaded through for future tie-break extensions and is
    /// not consulted by any merge today.
    pub fn merge(&self, data: &Namespaced<'_>, delta: &Delta, block_id: &str) -> Result<()> {
        if delta.kind() != self.kind() {
            return Err(CrdtError::MergeTypeMismatch {
                expected: self.kind(),
                actual: delta.kind(),
            });
        }
        match (self, delta) {
            (Crdt::Lww(reg), Delta::Lww(d)) => reg.merge(data, d, block_id),
        }
    }

    /// Read the current value, if any.
    pub fn value(&self, data: &Namespaced<'_>) -> Result<Vec<u8>> {
        match self {
            Crdt::Lww(reg) => reg.value(data),
        }
    }
}
