//! Copy-on-write transactions.
//!
//! A [`Txn`] starts from the root of a [`Tree`] and mutates through
//! `Arc::make_mut`: a node is cloned the first time the transaction touches
//! it while another version still holds it, and mutated in place after that.
//! Only the nodes on the paths actually modified are ever copied.
//!
//! Tree depth is bounded only by key length, so every walk here is a loop
//! over the slots on the path rather than a recursion.

use std::mem;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::iter::PathIter;
use crate::key;
use crate::node::{release, Inner, Node, Node4, NodeKind, NodeRef, MAX_PREFIX_LEN};
use crate::tree::{search, Tree};

/// A batch of modifications against one tree version.
///
/// The base tree is never changed. [`Txn::commit`] yields the new version.
pub struct Txn<V> {
    root: Option<NodeRef<V>>,
    size: usize,
    base_size: usize,
}

impl<V> Txn<V> {
    pub(crate) fn new(tree: &Tree<V>) -> Self {
        Self {
            root: tree.root.clone(),
            size: tree.size,
            base_size: tree.size,
        }
    }

    /// Number of keys as of the latest operation.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the working tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Look up `key`, seeing this transaction's own writes.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        let encoded = key::encode(key.as_ref());
        search(self.root.as_deref()?, &encoded).map(|leaf| leaf.value())
    }

    /// Finish the transaction and return the new version.
    pub fn commit(mut self) -> Tree<V> {
        debug!(
            size = self.size,
            delta = self.size as i64 - self.base_size as i64,
            "committed transaction"
        );
        Tree::from_parts(self.root.take(), self.size)
    }
}

impl<V: Clone> Txn<V> {
    /// Insert or replace the value under `key`, returning the previous one.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: V) -> Option<V> {
        let encoded = key::encode(key.as_ref());
        let Some(root) = self.root.as_mut() else {
            self.root = Some(Arc::new(Node::new_leaf(encoded, value)));
            self.size += 1;
            return None;
        };
        let old = insert_at(root, &encoded, value);
        if old.is_none() {
            self.size += 1;
        }
        old
    }

    /// Remove `key`, returning its value. Absent keys leave the working tree
    /// untouched, with no node copied.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> Option<V> {
        let encoded = key::encode(key.as_ref());
        let root = self.root.as_mut()?;
        search(&**root, &encoded)?;

        let removed = if root.is_leaf() {
            self.root.take()
        } else {
            delete_at(root, &encoded)
        };
        let value = removed.and_then(Node::into_value);
        if value.is_some() {
            self.size -= 1;
        }
        value
    }

    /// Remove every key starting with `prefix`. Returns how many were removed.
    pub fn delete_prefix(&mut self, prefix: impl AsRef<[u8]>) -> usize {
        let prefix = prefix.as_ref();
        let count = PathIter::new(self.root.as_deref(), prefix).count();
        if count == 0 {
            return 0;
        }
        let path = key::escape(prefix);
        let whole = match self.root.as_mut() {
            Some(root) => prune(root, &path),
            None => false,
        };
        if whole {
            if let Some(root) = self.root.take() {
                release(root);
            }
        }
        self.size -= count;
        debug!(count, remaining = self.size, "deleted prefix");
        count
    }
}

impl<K: AsRef<[u8]>, V: Clone> Extend<(K, V)> for Txn<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<V> Drop for Txn<V> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            release(root);
        }
    }
}

fn new_leaf<V>(key: &[u8], value: V) -> NodeRef<V> {
    Arc::new(Node::new_leaf(key.to_vec(), value))
}

fn insert_at<V: Clone>(mut slot: &mut NodeRef<V>, key: &[u8], value: V) -> Option<V> {
    let mut depth = 0;
    loop {
        if let Node::Leaf(leaf) = &**slot {
            if leaf.matches(key) {
                let old = mem::replace(slot, new_leaf(key, value));
                return Node::into_value(old);
            }

            // Two distinct terminated keys always diverge before either ends.
            let existing = leaf.encoded_key();
            let split = depth + key::common_prefix_len(&existing[depth..], &key[depth..]);
            let existing_byte = existing[split];
            let mut node = Node::Node4(Node4::new());
            node.set_partial(&key[depth..split]);
            node.set_partial_len(split - depth);

            let old = mem::replace(slot, Arc::new(node));
            let node = Arc::make_mut(slot);
            node.add_child(existing_byte, old);
            node.add_child(key[split], new_leaf(key, value));
            return None;
        }

        let plen = slot.partial_len();
        if plen > 0 {
            let diff = slot.prefix_mismatch(key, depth);
            if diff < plen {
                split_prefix(slot, key, depth, diff, value);
                return None;
            }
            depth += plen;
        }

        let byte = key[depth];
        let node = Arc::make_mut(slot);
        if node.child(byte).is_none() {
            node.add_child(byte, new_leaf(key, value));
            return None;
        }
        slot = node.child_mut(byte)?;
        depth += 1;
    }
}

/// Split the compressed segment of the node in `slot` where `key` diverges
/// from it, `diff` bytes in.
fn split_prefix<V: Clone>(slot: &mut NodeRef<V>, key: &[u8], depth: usize, diff: usize, value: V) {
    let plen = slot.partial_len();
    let full = slot.full_prefix(depth);
    let branch = full[diff];
    let rest = full[diff + 1..].to_vec();

    let mut parent = Node::Node4(Node4::new());
    parent.set_partial(&key[depth..depth + diff]);
    parent.set_partial_len(diff);

    let mut old = mem::replace(slot, Arc::new(parent));
    let lower = Arc::make_mut(&mut old);
    lower.set_partial_len(plen - diff - 1);
    lower.set_partial(&rest);

    let parent = Arc::make_mut(slot);
    parent.add_child(branch, old);
    parent.add_child(key[depth + diff], new_leaf(key, value));
}

/// Remove the leaf for `key` below `slot`. The key must be present.
///
/// Only the leaf's parent loses a child, so it is the only node that may
/// shrink or collapse.
fn delete_at<V: Clone>(mut slot: &mut NodeRef<V>, key: &[u8]) -> Option<NodeRef<V>> {
    let mut depth = 0;
    loop {
        depth += slot.partial_len();
        let byte = *key.get(depth)?;
        if slot.child(byte)?.is_leaf() {
            let removed = Arc::make_mut(slot).remove_child(byte)?;
            collapse(slot);
            return Some(removed);
        }
        slot = Arc::make_mut(slot).child_mut(byte)?;
        depth += 1;
    }
}

/// Replace a Node4 that is down to one child with that child, folding the
/// node's segment and branching byte into the child's segment.
fn collapse<V: Clone>(slot: &mut NodeRef<V>) {
    if slot.kind() != NodeKind::Node4 || slot.num_children() != 1 {
        return;
    }
    let Node::Node4(n) = Arc::make_mut(slot) else {
        return;
    };
    let parent_len = n.partial_len();
    let mut merged = n.partial().to_vec();
    let Some((byte, mut child)) = n.take_only_child() else {
        return;
    };

    if !child.is_leaf() {
        if merged.len() < MAX_PREFIX_LEN {
            merged.push(byte);
        }
        merged.extend_from_slice(child.partial());
        let child_len = child.partial_len();
        let c = Arc::make_mut(&mut child);
        c.set_partial(&merged);
        c.set_partial_len(parent_len + 1 + child_len);
    }
    trace!(byte, into = ?child.kind(), "collapsed single-child node");
    *slot = child;
}

/// Detach everything under `slot` whose escaped key starts with `path`.
///
/// Returns `true` when the whole subtree matches and the caller has to drop
/// the slot. Callers must first make sure at least one key matches, so the
/// walk only ever detaches one child: the first one whose subtree lies
/// entirely under `path`.
fn prune<V: Clone>(mut slot: &mut NodeRef<V>, path: &[u8]) -> bool {
    if slot.is_leaf() || path.len() <= slot.partial_len() {
        return true;
    }
    let mut depth = 0;
    loop {
        let byte = path[depth + slot.partial_len()];
        let child_depth = depth + slot.partial_len() + 1;
        let Some(child) = slot.child(byte) else {
            return false;
        };
        if child.is_leaf() || path.len() <= child_depth + child.partial_len() {
            if let Some(detached) = Arc::make_mut(slot).remove_child(byte) {
                release(detached);
            }
            collapse(slot);
            return false;
        }
        let Some(next) = Arc::make_mut(slot).child_mut(byte) else {
            return false;
        };
        slot = next;
        depth = child_depth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: usize) -> Vec<u8> {
        format!("key{:04}", i).into_bytes()
    }

    #[test]
    fn test_insert_get_replace() {
        let mut txn = Tree::new().txn();
        assert_eq!(txn.insert(b"a", 1), None);
        assert_eq!(txn.insert(b"b", 2), None);
        assert_eq!(txn.insert(b"a", 3), Some(1));
        assert_eq!(txn.len(), 2);
        assert_eq!(txn.get(b"a"), Some(&3));
        let tree = txn.commit();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(b"a"), Some(&3));
    }

    #[test]
    fn test_snapshot_isolation() {
        let mut txn = Tree::new().txn();
        for i in 0..100 {
            txn.insert(key(i), i);
        }
        let t1 = txn.commit();

        let mut txn = t1.txn();
        for i in 0..50 {
            txn.delete(key(i));
        }
        txn.insert(b"extra", 999);
        txn.insert(key(75), 7500);
        let t2 = txn.commit();

        assert_eq!(t1.len(), 100);
        for i in 0..100 {
            assert_eq!(t1.get(key(i)), Some(&i));
        }
        assert_eq!(t1.get(b"extra"), None);

        assert_eq!(t2.len(), 51);
        assert_eq!(t2.get(key(10)), None);
        assert_eq!(t2.get(key(75)), Some(&7500));
        assert_eq!(t2.get(b"extra"), Some(&999));
        assert!(t1.verify_integrity().is_empty());
        assert!(t2.verify_integrity().is_empty());
    }

    #[test]
    fn test_untouched_subtrees_are_shared() {
        let tree: Tree<u32> = [(&b"left/a"[..], 1), (&b"left/b"[..], 2), (&b"right/a"[..], 3), (&b"right/b"[..], 4)]
            .into_iter()
            .collect();
        let (next, _) = tree.insert(b"right/c", 5);

        let old_left = tree.root().and_then(|r| r.child(b'l')).unwrap();
        let new_left = next.root().and_then(|r| r.child(b'l')).unwrap();
        assert!(Arc::ptr_eq(old_left, new_left));

        let old_right = tree.root().and_then(|r| r.child(b'r')).unwrap();
        let new_right = next.root().and_then(|r| r.child(b'r')).unwrap();
        assert!(!Arc::ptr_eq(old_right, new_right));
    }

    #[test]
    fn test_delete_missing_copies_nothing() {
        let tree: Tree<u32> = [(&b"a"[..], 1), (&b"b"[..], 2)].into_iter().collect();
        let mut txn = tree.txn();
        assert_eq!(txn.delete(b"c"), None);
        assert_eq!(txn.delete(b""), None);
        let next = txn.commit();
        assert!(tree.ptr_eq(&next));
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn test_delete_collapses_to_leaf() {
        let tree: Tree<u32> = [(&b"ab"[..], 1), (&b"ac"[..], 2)].into_iter().collect();
        assert_eq!(tree.root().map(Node::kind), Some(NodeKind::Node4));
        let (tree, old) = tree.delete(b"ac");
        assert_eq!(old, Some(2));
        assert_eq!(tree.get(b"ab"), Some(&1));
        let stats = tree.stats();
        assert_eq!((stats.leaves, stats.inner()), (1, 0));
        let (tree, _) = tree.delete(b"ab");
        assert!(tree.root().is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_collapse_merges_segments() {
        // Root branches on 'x'/'y'; below 'x' a node with a long segment.
        let mut txn = Tree::new().txn();
        txn.insert(b"x0123456789abcdefA", 1u32);
        txn.insert(b"x0123456789abcdefB", 2);
        txn.insert(b"y", 3);
        let tree = txn.commit();
        let (tree, _) = tree.delete(b"y");
        assert!(tree.verify_integrity().is_empty(), "{:?}", tree.verify_integrity());
        let root = tree.root().unwrap();
        assert_eq!(root.kind(), NodeKind::Node4);
        assert_eq!(root.partial_len(), 17);
        assert_eq!(root.partial(), b"x012345678");
        assert_eq!(tree.get(b"x0123456789abcdefA"), Some(&1));
        assert_eq!(tree.get(b"x0123456789abcdefB"), Some(&2));
        assert_eq!(tree.get(b"x0123456789abcdefC"), None);
    }

    #[test]
    fn test_split_long_segment() {
        let base = b"common-prefix-that-is-long:";
        let mut txn = Tree::new().txn();
        for c in [b'a', b'b'] {
            let mut k = base.to_vec();
            k.push(c);
            txn.insert(k, c as u32);
        }
        // Diverges past the inline bytes, then inside them.
        txn.insert(b"common-prefix-that-is-short", 1);
        txn.insert(b"commons", 2);
        txn.insert(b"c", 3);
        let tree = txn.commit();
        assert!(tree.verify_integrity().is_empty(), "{:?}", tree.verify_integrity());
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.get(b"common-prefix-that-is-long:a"), Some(&(b'a' as u32)));
        assert_eq!(tree.get(b"common-prefix-that-is-short"), Some(&1));
        assert_eq!(tree.get(b"commons"), Some(&2));
        assert_eq!(tree.get(b"c"), Some(&3));
        assert_eq!(tree.get(b"common-prefix-that-is-long"), None);
    }

    #[test]
    fn test_prefix_keys_coexist() {
        let mut txn = Tree::new().txn();
        for (i, k) in [&b""[..], b"a", b"ab", b"abc", b"a\0", b"\0"].iter().enumerate() {
            txn.insert(k, i);
        }
        let tree = txn.commit();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.get(b""), Some(&0));
        assert_eq!(tree.get(b"ab"), Some(&2));
        assert_eq!(tree.get(b"a\0"), Some(&4));
        assert_eq!(tree.get(b"\0"), Some(&5));
        let (tree, old) = tree.delete(b"a");
        assert_eq!(old, Some(1));
        assert_eq!(tree.get(b"ab"), Some(&2));
        assert_eq!(tree.get(b"abc"), Some(&3));
        assert!(tree.verify_integrity().is_empty());
    }

    #[test]
    fn test_grow_and_shrink_under_one_parent() {
        let mut txn = Tree::new().txn();
        for b in 0..60u8 {
            txn.insert([b'p', b + 1], b as u32);
        }
        let tree = txn.commit();
        assert_eq!(tree.stats().node256, 1);

        let mut txn = tree.txn();
        for b in (2..60u8).rev() {
            assert_eq!(txn.delete([b'p', b + 1]), Some(b as u32));
            for rest in 0..b {
                assert_eq!(txn.get([b'p', rest + 1]), Some(&(rest as u32)));
            }
        }
        let small = txn.commit();
        assert_eq!(small.len(), 2);
        let stats = small.stats();
        assert_eq!((stats.node4, stats.node16, stats.node48, stats.node256), (1, 0, 0, 0));
        assert!(small.verify_integrity().is_empty());
        assert_eq!(tree.len(), 60);
        assert_eq!(tree.stats().node256, 1);
    }

    #[test]
    fn test_delete_prefix() {
        let mut txn = Tree::new().txn();
        for i in 0..30 {
            txn.insert(format!("user:{}", i), i);
            txn.insert(format!("post:{}", i), i);
        }
        txn.insert(b"user", 100);
        txn.insert(b"use", 101);
        let base = txn.commit();

        let mut txn = base.txn();
        assert_eq!(txn.delete_prefix(b"user:"), 30);
        assert_eq!(txn.delete_prefix(b"user:"), 0);
        assert_eq!(txn.len(), 32);
        let tree = txn.commit();
        assert_eq!(tree.get(b"user"), Some(&100));
        assert_eq!(tree.get(b"use"), Some(&101));
        assert_eq!(tree.get(b"user:3"), None);
        assert_eq!(tree.path_iter(b"post:").count(), 30);
        assert!(tree.verify_integrity().is_empty(), "{:?}", tree.verify_integrity());
        assert_eq!(base.path_iter(b"user:").count(), 30);

        let mut txn = tree.txn();
        assert_eq!(txn.delete_prefix(b""), 32);
        assert!(txn.commit().root().is_none());
    }

    #[test]
    fn test_delete_prefix_single_leaf() {
        let tree: Tree<u32> = [(&b"alpha"[..], 1), (&b"beta"[..], 2)].into_iter().collect();
        let mut txn = tree.txn();
        assert_eq!(txn.delete_prefix(b"al"), 1);
        let tree = txn.commit();
        assert_eq!(tree.root().map(Node::kind), Some(NodeKind::Leaf));
        assert_eq!(tree.get(b"beta"), Some(&2));
    }

    #[test]
    fn test_extend() {
        let mut txn = Tree::new().txn();
        txn.extend((0..10).map(|i| (key(i), i)));
        assert_eq!(txn.len(), 10);
        let tree = txn.commit();
        assert_eq!(tree.iter().map(|(_, v)| *v).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
    }
}
