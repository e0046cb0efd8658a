//! Immutable tree versions.

use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use crate::iter::{Iter, PathIter, Range};
use crate::key::{self, ESCAPE, TERMINATOR};
use crate::node::{release, Leaf, Node, NodeRef};
use crate::txn::Txn;

/// An immutable version of the trie.
///
/// Every modification goes through a [`Txn`], which produces a new `Tree`
/// sharing all untouched nodes with this one. Cloning a tree is O(1).
pub struct Tree<V> {
    pub(crate) root: Option<NodeRef<V>>,
    pub(crate) size: usize,
}

impl<V> Tree<V> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            root: None,
            size: 0,
        }
    }

    pub(crate) fn from_parts(root: Option<NodeRef<V>>, size: usize) -> Self {
        Self { root, size }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The root node, if any.
    pub fn root(&self) -> Option<&Node<V>> {
        self.root.as_deref()
    }

    /// Whether two trees share the same root node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Start a transaction based on this version.
    pub fn txn(&self) -> Txn<V> {
        Txn::new(self)
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        let encoded = key::encode(key.as_ref());
        search(self.root()?, &encoded).map(Leaf::value)
    }

    /// Whether `key` is stored.
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.get(key).is_some()
    }

    /// The entry with the longest stored key that is a prefix of `key`.
    ///
    /// The empty key is a prefix of everything, and `key` itself counts.
    pub fn longest_prefix(&self, key: impl AsRef<[u8]>) -> Option<(Vec<u8>, &V)> {
        let encoded = key::encode(key.as_ref());
        let escaped = &encoded[..encoded.len() - 2];
        let mut best: Option<&Leaf<V>> = None;

        let root = self.root.as_ref()?;
        if root.is_leaf() {
            consider(&mut best, Some(root), escaped);
        }
        let mut node: &Node<V> = root;
        let mut depth = 0;
        while !node.is_leaf() {
            let prefix = node.full_prefix(depth);
            let m = key::common_prefix_len(prefix, &encoded[depth..]);
            if m < prefix.len() {
                // A stored key can still end right where the prefix ends.
                if m + 1 == prefix.len() && prefix[m] == ESCAPE {
                    consider(&mut best, node.child(TERMINATOR), escaped);
                }
                break;
            }
            depth += prefix.len();

            // Keys that end at this node: the terminator either follows an
            // escape byte already on the path, or hangs below child(ESCAPE).
            if depth > 0 && encoded[depth - 1] == ESCAPE {
                consider(&mut best, node.child(TERMINATOR), escaped);
            }
            if let Some(child) = node.child(ESCAPE) {
                if child.is_leaf() {
                    consider(&mut best, Some(child), escaped);
                } else if child.partial_len() == 0 {
                    consider(&mut best, child.child(TERMINATOR), escaped);
                }
            }

            let Some(&byte) = encoded.get(depth) else {
                break;
            };
            let Some(child) = node.child(byte) else {
                break;
            };
            if child.is_leaf() {
                consider(&mut best, Some(child), escaped);
            }
            node = &**child;
            depth += 1;
        }
        best.map(|leaf| (leaf.key(), leaf.value()))
    }

    /// The entry with the smallest key.
    pub fn minimum(&self) -> Option<(Vec<u8>, &V)> {
        let leaf = self.root()?.minimum()?;
        Some((leaf.key(), leaf.value()))
    }

    /// The entry with the largest key.
    pub fn maximum(&self) -> Option<(Vec<u8>, &V)> {
        let leaf = self.root()?.maximum()?;
        Some((leaf.key(), leaf.value()))
    }

    /// Iterate all entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.root())
    }

    /// Iterate the entries whose key starts with `prefix`, ascending.
    pub fn path_iter(&self, prefix: impl AsRef<[u8]>) -> PathIter<'_, V> {
        PathIter::new(self.root(), prefix.as_ref())
    }

    /// Iterate the entries whose key falls in `range`, ascending.
    pub fn range<K, R>(&self, range: R) -> Range<'_, V>
    where
        K: AsRef<[u8]>,
        R: RangeBounds<K>,
    {
        let encode = |bound: Bound<&K>| match bound {
            Bound::Included(k) => Bound::Included(key::encode(k.as_ref())),
            Bound::Excluded(k) => Bound::Excluded(key::encode(k.as_ref())),
            Bound::Unbounded => Bound::Unbounded,
        };
        Range::new(self.iter(), encode(range.start_bound()), encode(range.end_bound()))
    }
}

impl<V: Clone> Tree<V> {
    /// Insert through a single-operation transaction.
    ///
    /// Returns the new version and the value previously stored under `key`.
    pub fn insert(&self, key: impl AsRef<[u8]>, value: V) -> (Tree<V>, Option<V>) {
        let mut txn = self.txn();
        let old = txn.insert(key, value);
        (txn.commit(), old)
    }

    /// Delete through a single-operation transaction.
    ///
    /// Returns the new version and the removed value.
    pub fn delete(&self, key: impl AsRef<[u8]>) -> (Tree<V>, Option<V>) {
        let mut txn = self.txn();
        let old = txn.delete(key);
        (txn.commit(), old)
    }
}

/// Keep `node` as the best candidate if it is a leaf whose key is a longer
/// prefix of the query than the current best.
fn consider<'a, V>(best: &mut Option<&'a Leaf<V>>, node: Option<&'a NodeRef<V>>, escaped: &[u8]) {
    let Some(Node::Leaf(leaf)) = node.map(|n| &**n) else {
        return;
    };
    let longer = best.map_or(true, |b| leaf.encoded_key().len() > b.encoded_key().len());
    if longer && leaf.is_prefix_of(escaped) {
        *best = Some(leaf);
    }
}

/// Descend optimistically: compressed segments are only checked against
/// their stored bytes, and the leaf reached is compared with the full key.
pub(crate) fn search<'a, V>(root: &'a Node<V>, key: &[u8]) -> Option<&'a Leaf<V>> {
    let mut node = root;
    let mut depth = 0;
    loop {
        if let Node::Leaf(leaf) = node {
            return leaf.matches(key).then_some(leaf);
        }
        if !node.match_prefix(key.get(depth..)?) {
            return None;
        }
        depth += node.partial_len();
        node = &**node.child(*key.get(depth)?)?;
        depth += 1;
    }
}

impl<V> Clone for Tree<V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            size: self.size,
        }
    }
}

impl<V> Drop for Tree<V> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            release(root);
        }
    }
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Tree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (String::from_utf8_lossy(&k).into_owned(), v)))
            .finish()
    }
}

impl<K: AsRef<[u8]>, V: Clone> FromIterator<(K, V)> for Tree<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut txn = Tree::new().txn();
        txn.extend(iter);
        txn.commit()
    }
}

impl<'a, V> IntoIterator for &'a Tree<V> {
    type Item = (Vec<u8>, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
