//! Ordered traversal over a trie.
//!
//! All iterators keep an explicit stack of frames instead of recursing, so
//! traversal depth is bounded by memory rather than the call stack.

use std::cmp::Ordering;
use std::iter::FusedIterator;
use std::ops::Bound;

use crate::key;
use crate::node::{Leaf, Node};

/// A node being visited, and the smallest branching byte not yet descended.
struct Frame<'a, V> {
    node: &'a Node<V>,
    next: usize,
}

impl<'a, V> Frame<'a, V> {
    fn new(node: &'a Node<V>) -> Self {
        Self { node, next: 0 }
    }
}

/// Ascending iterator over every entry under a node.
///
/// Yields decoded keys with borrowed values.
pub struct Iter<'a, V> {
    stack: Vec<Frame<'a, V>>,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(root: Option<&'a Node<V>>) -> Self {
        Self {
            stack: root.map(Frame::new).into_iter().collect(),
        }
    }

    /// Advance to the next leaf in key order.
    pub(crate) fn next_leaf(&mut self) -> Option<&'a Leaf<V>> {
        while let Some(frame) = self.stack.last_mut() {
            let node = frame.node;
            if let Node::Leaf(leaf) = node {
                self.stack.pop();
                return Some(leaf);
            }
            match node.next_child(frame.next) {
                Some((byte, child)) => {
                    frame.next = byte as usize + 1;
                    self.stack.push(Frame::new(&**child));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }

    /// Reposition a fresh iterator so that it continues at the first leaf
    /// whose internal key is `>= key`.
    pub(crate) fn seek(&mut self, key: &[u8]) {
        let Some(mut node) = self.stack.first().map(|frame| frame.node) else {
            return;
        };
        self.stack.clear();
        let mut depth = 0;
        loop {
            if let Node::Leaf(leaf) = node {
                if leaf.encoded_key() >= key {
                    self.stack.push(Frame::new(node));
                }
                return;
            }

            let prefix = node.full_prefix(depth);
            let rest = key.get(depth..).unwrap_or_default();
            let n = prefix.len().min(rest.len());
            match prefix[..n].cmp(&rest[..n]) {
                // Everything below sorts before the key.
                Ordering::Less => return,
                // Everything below sorts after it.
                Ordering::Greater => {
                    self.stack.push(Frame::new(node));
                    return;
                }
                Ordering::Equal if rest.len() <= prefix.len() => {
                    self.stack.push(Frame::new(node));
                    return;
                }
                Ordering::Equal => {}
            }

            depth += prefix.len();
            let byte = key[depth];
            self.stack.push(Frame {
                node,
                next: byte as usize + 1,
            });
            match node.child(byte) {
                Some(child) => {
                    node = &**child;
                    depth += 1;
                }
                None => return,
            }
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_leaf().map(|leaf| (leaf.key(), leaf.value()))
    }
}

impl<V> FusedIterator for Iter<'_, V> {}

/// Iterator over the entries whose key starts with a given prefix.
///
/// The walk down the prefix path happens lazily on the first call to
/// `next`; from the node where the prefix is exhausted it enumerates the
/// whole subtree in ascending order.
pub struct PathIter<'a, V> {
    root: Option<&'a Node<V>>,
    path: Vec<u8>,
    iter: Option<Iter<'a, V>>,
}

impl<'a, V> PathIter<'a, V> {
    pub(crate) fn new(root: Option<&'a Node<V>>, prefix: &[u8]) -> Self {
        Self {
            root,
            path: key::escape(prefix),
            iter: None,
        }
    }

    /// The highest node whose every key extends the path, if any.
    fn locate(&self) -> Option<&'a Node<V>> {
        let path = self.path.as_slice();
        let mut node = self.root?;
        let mut depth = 0;
        loop {
            if depth >= path.len() {
                return Some(node);
            }
            if let Node::Leaf(leaf) = node {
                return leaf.encoded_key().starts_with(path).then_some(node);
            }

            let prefix = node.full_prefix(depth);
            let rest = &path[depth..];
            let n = prefix.len().min(rest.len());
            if prefix[..n] != rest[..n] {
                return None;
            }
            if rest.len() <= prefix.len() {
                return Some(node);
            }
            depth += prefix.len();
            node = &**node.child(path[depth])?;
            depth += 1;
        }
    }
}

impl<'a, V> Iterator for PathIter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.iter.is_none() {
            self.iter = Some(Iter::new(self.locate()));
        }
        self.iter.as_mut()?.next()
    }
}

impl<V> FusedIterator for PathIter<'_, V> {}

/// Ascending iterator over a key range.
pub struct Range<'a, V> {
    iter: Iter<'a, V>,
    skip: Option<Vec<u8>>,
    end: Bound<Vec<u8>>,
    done: bool,
}

impl<'a, V> Range<'a, V> {
    /// `start` and `end` are bounds over internal keys.
    pub(crate) fn new(mut iter: Iter<'a, V>, start: Bound<Vec<u8>>, end: Bound<Vec<u8>>) -> Self {
        let skip = match start {
            Bound::Included(start) => {
                iter.seek(&start);
                None
            }
            Bound::Excluded(start) => {
                iter.seek(&start);
                Some(start)
            }
            Bound::Unbounded => None,
        };
        Self {
            iter,
            skip,
            end,
            done: false,
        }
    }

    fn past_end(&self, key: &[u8]) -> bool {
        match &self.end {
            Bound::Included(end) => key > end.as_slice(),
            Bound::Excluded(end) => key >= end.as_slice(),
            Bound::Unbounded => false,
        }
    }
}

impl<'a, V> Iterator for Range<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some(leaf) = self.iter.next_leaf() else {
                self.done = true;
                return None;
            };
            if let Some(skip) = self.skip.take() {
                if leaf.encoded_key() == skip.as_slice() {
                    continue;
                }
            }
            if self.past_end(leaf.encoded_key()) {
                self.done = true;
                return None;
            }
            return Some((leaf.key(), leaf.value()));
        }
    }
}

impl<V> FusedIterator for Range<'_, V> {}
