//! Key-prefix projection of a transaction.
//!
//! A [`Namespaced`] view prepends its prefix on every operation and strips
//! it again during iteration. It holds no state of its own and performs no
//! locking; several views over the same transaction compose into one atomic
//! commit.

use crate::error::Result;
use crate::txn::{PrefixIter, Txn};

/// A prefixed view over a borrowed transaction.
#[derive(Clone, Copy, Debug)]
pub struct Namespaced<'t> {
    txn: &'t Txn,
    prefix: &'static [u8],
}

impl<'t> Namespaced<'t> {
    /// Create a view rooted at `prefix`.
    pub fn new(txn: &'t Txn, prefix: &'static [u8]) -> Self {
        Namespaced { txn, prefix }
    }

    fn wrap(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(self.prefix);
        full.extend_from_slice(key);
        full
    }

    /// Read a key under this namespace.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.txn.get(&self.wrap(key))
    }

    /// Check for a key under this namespace.
    pub fn has(&self, key: &[u8]) -> Result<bool> {
        self.txn.has(&self.wrap(key))
    }

    /// Write a key under this namespace.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.txn.set(&self.wrap(key), value)
    }

    /// Delete a key under this namespace.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.txn.delete(&self.wrap(key))
    }

    /// Iterate entries under `sub` within this namespace, ascending by key.
    /// Yielded keys have the namespace prefix stripped.
    pub fn iter_prefix(&self, sub: &[u8]) -> Result<NamespacedIter<'t>> {
        let inner = self.txn.iter_prefix(&self.wrap(sub))?;
        Ok(NamespacedIter {
            inner,
            strip: self.prefix.len(),
        })
    }
}

/// Iterator over a namespaced view; keys are relative to the namespace.
#[derive(Debug)]
pub struct NamespacedIter<'t> {
    inner: PrefixIter<'t>,
    strip: usize,
}

impl Iterator for NamespacedIter<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.inner.next()?;
        Some((key[self.strip..].to_vec(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRootstore;

    #[test]
    fn test_namespace_wraps_keys() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ns = Namespaced::new(&txn, b"/data");

        ns.set(b"/k", b"v").unwrap();
        assert_eq!(ns.get(b"/k").unwrap(), b"v");
        assert_eq!(txn.get(b"/data/k").unwrap(), b"v");
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let data = Namespaced::new(&txn, b"/data");
        let heads = Namespaced::new(&txn, b"/heads");

        data.set(b"/k", b"1").unwrap();
        assert!(!heads.has(b"/k").unwrap());
    }

    #[test]
    fn test_iter_strips_prefix() {
        let store = MemoryRootstore::new();
        let txn = store.begin();
        let ns = Namespaced::new(&txn, b"/sys");
        ns.set(b"/a", b"1").unwrap();
        ns.set(b"/b", b"2").unwrap();

        let keys: Vec<_> = ns.iter_prefix(b"/").unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"/a".to_vec(), b"/b".to_vec()]);
    }
}
