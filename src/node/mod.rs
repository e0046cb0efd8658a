//! ART node types with adaptive sizing.
//!
//! Branching nodes pick their layout from the number of children actually
//! present:
//!
//! - Node4: up to 4 children, sorted keys, linear scan
//! - Node16: 5-16 children, sorted keys, binary search
//! - Node48: 17-48 children, 256-byte index into 48 slots
//! - Node256: 49-256 children, direct array indexing
//!
//! Children are held through [`NodeRef`] (`Arc`), so two tree versions can
//! share a subtree. Cloning a node copies its slots, never the subtrees
//! behind them.

mod leaf;
mod node16;
mod node256;
mod node4;
mod node48;

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use crate::iter::{Iter, PathIter};

pub use leaf::Leaf;
pub use node16::Node16;
pub use node256::Node256;
pub use node4::Node4;
pub use node48::Node48;

/// Maximum number of compressed prefix bytes stored inline in a node.
///
/// Longer compressed runs keep their logical length in `partial_len`; the
/// bytes past this limit are recovered from the node's minimum leaf.
pub const MAX_PREFIX_LEN: usize = 10;

/// A Node256 shrinks to a Node48 once a delete leaves it with this many children.
pub(crate) const NODE256_SHRINK: usize = 37;
/// A Node48 shrinks to a Node16 once a delete leaves it with this many children.
pub(crate) const NODE48_SHRINK: usize = 12;
/// A Node16 shrinks to a Node4 once a delete leaves it with this many children.
pub(crate) const NODE16_SHRINK: usize = 3;

/// Shared reference to a node.
pub type NodeRef<V> = Arc<Node<V>>;

pub(crate) type Partial = SmallVec<[u8; MAX_PREFIX_LEN]>;

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A leaf holding a key and value.
    Leaf,
    /// Up to 4 children.
    Node4,
    /// Up to 16 children.
    Node16,
    /// Up to 48 children.
    Node48,
    /// Up to 256 children.
    Node256,
}

impl NodeKind {
    /// Maximum number of children a node of this kind holds.
    pub fn capacity(self) -> usize {
        match self {
            NodeKind::Leaf => 0,
            NodeKind::Node4 => 4,
            NodeKind::Node16 => 16,
            NodeKind::Node48 => 48,
            NodeKind::Node256 => 256,
        }
    }
}

/// Fields every branching node carries.
#[derive(Debug, Clone, Default)]
pub struct Header {
    partial_len: u32,
    num_children: u16,
    partial: Partial,
}

/// Capability set shared by the four branching node kinds.
pub trait Inner<V> {
    /// Shared header.
    fn header(&self) -> &Header;

    /// Shared header, mutably.
    fn header_mut(&mut self) -> &mut Header;

    /// Which kind this node is.
    fn kind(&self) -> NodeKind;

    /// Logical length of the compressed segment.
    fn partial_len(&self) -> usize {
        self.header().partial_len as usize
    }

    /// Set the logical length of the compressed segment.
    fn set_partial_len(&mut self, len: usize) {
        self.header_mut().partial_len = len as u32;
    }

    /// Number of occupied child slots.
    fn num_children(&self) -> usize {
        self.header().num_children as usize
    }

    /// Overwrite the child count.
    fn set_num_children(&mut self, n: usize) {
        self.header_mut().num_children = n as u16;
    }

    /// The stored compressed bytes, at most [`MAX_PREFIX_LEN`] of them.
    fn partial(&self) -> &[u8] {
        &self.header().partial
    }

    /// Store compressed bytes, truncating to [`MAX_PREFIX_LEN`].
    fn set_partial(&mut self, bytes: &[u8]) {
        let partial = &mut self.header_mut().partial;
        partial.clear();
        partial.extend_from_slice(&bytes[..bytes.len().min(MAX_PREFIX_LEN)]);
    }

    /// Whether the node has no free slot left.
    fn is_full(&self) -> bool {
        self.num_children() >= self.kind().capacity()
    }

    /// Whether the stored compressed bytes agree with `segment`.
    ///
    /// Only the stored bytes are compared, so a `true` on a node whose
    /// logical segment is longer than [`MAX_PREFIX_LEN`] is optimistic and
    /// must be confirmed against a leaf.
    fn match_prefix(&self, segment: &[u8]) -> bool {
        let stored = self.partial();
        segment.len() >= stored.len() && segment[..stored.len()] == *stored
    }

    /// The child under `byte`.
    fn child(&self, byte: u8) -> Option<&NodeRef<V>>;

    /// The child under `byte`, mutably.
    fn child_mut(&mut self, byte: u8) -> Option<&mut NodeRef<V>>;

    /// Insert or replace the child under `byte`.
    ///
    /// The tree adds children through `Node::add_child`, which grows a full
    /// node into the next kind first.
    ///
    /// # Panics
    ///
    /// Panics if the node is full and `byte` is not already present.
    fn set_child(&mut self, byte: u8, child: NodeRef<V>);

    /// Remove and return the child under `byte`.
    fn remove_child(&mut self, byte: u8) -> Option<NodeRef<V>>;

    /// First occupied child whose branching byte is `>= from`.
    ///
    /// `from` is a `usize` so that `256` can express "past the last byte".
    fn next_child(&self, from: usize) -> Option<(u8, &NodeRef<V>)>;

    /// Last occupied child whose branching byte is `<= upto`.
    fn prev_child(&self, upto: u8) -> Option<(u8, &NodeRef<V>)>;
}

/// A node in the adaptive radix trie.
#[derive(Clone)]
pub enum Node<V> {
    /// Terminal node storing a key-value pair.
    Leaf(Leaf<V>),
    /// Up to 4 children.
    Node4(Node4<V>),
    /// Up to 16 children. Boxed to keep leaves small.
    Node16(Box<Node16<V>>),
    /// Up to 48 children. Boxed to keep leaves small.
    Node48(Box<Node48<V>>),
    /// Up to 256 children. Boxed to keep leaves small.
    Node256(Box<Node256<V>>),
}

/// Run `$body` against the branching node inside `$node`, or `$leaf` for a leaf.
macro_rules! with_inner {
    ($node:expr, |$n:ident| $body:expr, leaf => $leaf:expr) => {
        match $node {
            Node::Leaf(_) => $leaf,
            Node::Node4($n) => $body,
            Node::Node16($n) => $body,
            Node::Node48($n) => $body,
            Node::Node256($n) => $body,
        }
    };
}

impl<V> Node<V> {
    /// Create a leaf for an already encoded key.
    pub(crate) fn new_leaf(key: Vec<u8>, value: V) -> Self {
        Node::Leaf(Leaf::new(key, value))
    }

    /// Which kind this node is.
    pub fn kind(&self) -> NodeKind {
        with_inner!(self, |n| n.kind(), leaf => NodeKind::Leaf)
    }

    /// Whether this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// The leaf inside this node, if it is one.
    pub fn as_leaf(&self) -> Option<&Leaf<V>> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Logical compressed-segment length. Zero for leaves.
    pub fn partial_len(&self) -> usize {
        with_inner!(self, |n| n.partial_len(), leaf => 0)
    }

    /// Stored compressed bytes. Empty for leaves.
    pub fn partial(&self) -> &[u8] {
        with_inner!(self, |n| n.partial(), leaf => &[])
    }

    /// Number of children. Zero for leaves.
    pub fn num_children(&self) -> usize {
        with_inner!(self, |n| n.num_children(), leaf => 0)
    }

    /// See [`Inner::match_prefix`]. Leaves always match.
    pub fn match_prefix(&self, segment: &[u8]) -> bool {
        with_inner!(self, |n| n.match_prefix(segment), leaf => true)
    }

    /// The child under `byte`.
    pub fn child(&self, byte: u8) -> Option<&NodeRef<V>> {
        with_inner!(self, |n| n.child(byte), leaf => None)
    }

    /// See [`Inner::next_child`].
    pub fn next_child(&self, from: usize) -> Option<(u8, &NodeRef<V>)> {
        with_inner!(self, |n| n.next_child(from), leaf => None)
    }

    /// Iterate every entry under this node in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(Some(self))
    }

    /// Iterate the entries under this node whose key starts with `prefix`,
    /// matching `prefix` from this node as if it were a tree root.
    pub fn path_iter(&self, prefix: &[u8]) -> PathIter<'_, V> {
        PathIter::new(Some(self), prefix)
    }

    /// Leftmost leaf under this node.
    pub fn minimum(&self) -> Option<&Leaf<V>> {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(leaf) => return Some(leaf),
                _ => node = &**node.next_child(0)?.1,
            }
        }
    }

    /// Rightmost leaf under this node.
    pub fn maximum(&self) -> Option<&Leaf<V>> {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(leaf) => return Some(leaf),
                _ => node = &**with_inner!(node, |n| n.prev_child(u8::MAX), leaf => None)?.1,
            }
        }
    }

    /// The full logical prefix of this node, starting at `depth` of the
    /// encoded key.
    ///
    /// When the prefix is longer than what is stored inline it is read from
    /// the minimum leaf, which shares it with every other leaf below.
    pub(crate) fn full_prefix(&self, depth: usize) -> &[u8] {
        let len = self.partial_len();
        if len <= MAX_PREFIX_LEN {
            return self.partial();
        }
        self.minimum()
            .and_then(|leaf| leaf.encoded_key().get(depth..depth + len))
            .unwrap_or_else(|| self.partial())
    }

    /// Number of leading bytes of this node's logical prefix that agree with
    /// `key[depth..]`. A result equal to `partial_len()` is a full match.
    ///
    /// Unlike [`Node::match_prefix`] this is exact for every kind.
    pub(crate) fn prefix_mismatch(&self, key: &[u8], depth: usize) -> usize {
        let len = self.partial_len();
        let rest = key.get(depth..).unwrap_or_default();
        let stored = self.partial();
        let max_cmp = stored.len().min(rest.len());
        for i in 0..max_cmp {
            if stored[i] != rest[i] {
                return i;
            }
        }
        if len <= MAX_PREFIX_LEN || max_cmp < stored.len() {
            return max_cmp;
        }
        // Past the inline bytes: compare against a representative leaf.
        let Some(leaf) = self.minimum() else {
            return max_cmp;
        };
        let leaf_rest = leaf.encoded_key().get(depth..).unwrap_or_default();
        let limit = len.min(leaf_rest.len()).min(rest.len());
        for i in max_cmp..limit {
            if leaf_rest[i] != rest[i] {
                return i;
            }
        }
        limit
    }

    pub(crate) fn set_partial_len(&mut self, len: usize) {
        with_inner!(self, |n| n.set_partial_len(len), leaf => ())
    }

    pub(crate) fn set_partial(&mut self, bytes: &[u8]) {
        with_inner!(self, |n| n.set_partial(bytes), leaf => ())
    }

    pub(crate) fn child_mut(&mut self, byte: u8) -> Option<&mut NodeRef<V>> {
        with_inner!(self, |n| n.child_mut(byte), leaf => None)
    }

    /// Add a child, growing into the next larger kind first if this node is full.
    pub(crate) fn add_child(&mut self, byte: u8, child: NodeRef<V>) {
        let full = with_inner!(self, |n| n.is_full() && n.child(byte).is_none(), leaf => false);
        if full {
            self.grow();
        }
        with_inner!(self, |n| n.set_child(byte, child), leaf => ())
    }

    /// Remove the child under `byte`, shrinking into the next smaller kind
    /// once occupancy reaches the shrink threshold.
    pub(crate) fn remove_child(&mut self, byte: u8) -> Option<NodeRef<V>> {
        let removed = with_inner!(self, |n| n.remove_child(byte), leaf => None)?;
        self.shrink();
        Some(removed)
    }

    fn take_children(&mut self) -> Vec<(u8, NodeRef<V>)> {
        with_inner!(self, |n| n.take_children(), leaf => Vec::new())
    }

    fn grow(&mut self) {
        let grown = match self {
            Node::Node4(n) => Node::Node16(Box::new(Node16::from_node4(n))),
            Node::Node16(n) => Node::Node48(Box::new(Node48::from_node16(n))),
            Node::Node48(n) => Node::Node256(Box::new(Node256::from_node48(n))),
            _ => return,
        };
        trace!(from = ?self.kind(), to = ?grown.kind(), children = grown.num_children(), "grew node");
        *self = grown;
    }

    fn shrink(&mut self) {
        let shrunk = match self {
            Node::Node256(n) if n.num_children() <= NODE256_SHRINK => {
                Node::Node48(Box::new(Node48::from_node256(n)))
            }
            Node::Node48(n) if n.num_children() <= NODE48_SHRINK => {
                Node::Node16(Box::new(Node16::from_node48(n)))
            }
            Node::Node16(n) if n.num_children() <= NODE16_SHRINK => Node::Node4(Node4::from_node16(n)),
            _ => return,
        };
        trace!(from = ?self.kind(), to = ?shrunk.kind(), children = shrunk.num_children(), "shrank node");
        *self = shrunk;
    }
}

impl<V: Clone> Node<V> {
    /// Recover the value from a detached leaf, without cloning when no other
    /// tree version still holds it.
    pub(crate) fn into_value(node: NodeRef<V>) -> Option<V> {
        match Arc::try_unwrap(node) {
            Ok(Node::Leaf(leaf)) => Some(leaf.into_value()),
            Ok(_) => None,
            Err(shared) => shared.as_leaf().map(|leaf| leaf.value().clone()),
        }
    }
}

impl<V> std::fmt::Debug for Node<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("key", &String::from_utf8_lossy(&leaf.key()))
                .field("value", leaf.value())
                .finish(),
            _ => f
                .debug_struct(&format!("{:?}", self.kind()))
                .field("partial_len", &self.partial_len())
                .field("partial", &String::from_utf8_lossy(self.partial()))
                .field("num_children", &self.num_children())
                .finish(),
        }
    }
}

/// Move the header out of a node that is being converted into another kind.
pub(crate) fn take_header(header: &mut Header) -> Header {
    std::mem::take(header)
}

/// Drop a subtree with a work-list instead of one native frame per level.
///
/// Nodes still held by another version only lose a reference.
pub(crate) fn release<V>(root: NodeRef<V>) {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if let Some(mut node) = Arc::into_inner(node) {
            pending.extend(node.take_children().into_iter().map(|(_, child)| child));
        }
    }
}
