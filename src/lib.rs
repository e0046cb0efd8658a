//! # adaptive-radix
//!
//! A copy-on-write Adaptive Radix Tree (ART) over byte-string keys.
//!
//! Based on "The Adaptive Radix Tree: ARTful Indexing for Main-Memory
//! Databases" (ICDE 2013, Leis et al.), with path copying so that every
//! committed [`Tree`] is an immutable snapshot.
//!
//! - Branching nodes adapt their layout to their fan-out (4, 16, 48, 256).
//! - Runs of single-child bytes are compressed into the node header.
//! - Keys may be prefixes of each other, including the empty key, and may
//!   contain any byte. See [`key`] for the internal encoding.
//! - A [`Txn`] shares every untouched subtree with the version it started
//!   from, so readers of older versions never observe later writes.
//!
//! ## Example
//!
//! ```rust
//! use adaptive_radix::Tree;
//!
//! let t0: Tree<u64> = Tree::new();
//!
//! let mut txn = t0.txn();
//! txn.insert(b"hello", 1);
//! txn.insert(b"help", 2);
//! txn.insert(b"world", 3);
//! let t1 = txn.commit();
//!
//! assert_eq!(t1.get(b"hello"), Some(&1));
//! assert_eq!(t0.get(b"hello"), None);
//!
//! let hel: Vec<_> = t1.path_iter(b"hel").map(|(k, _)| k).collect();
//! assert_eq!(hel, vec![b"hello".to_vec(), b"help".to_vec()]);
//!
//! assert_eq!(t1.longest_prefix(b"helpful"), Some((b"help".to_vec(), &2)));
//! ```

#![warn(missing_docs)]

pub mod key;
pub mod node;

mod debug;
mod iter;
mod tree;
mod txn;

pub use debug::NodeStats;
pub use iter::{Iter, PathIter, Range};
pub use node::{Leaf, Node, NodeKind, NodeRef, MAX_PREFIX_LEN};
pub use tree::Tree;
pub use txn::Txn;

#[cfg(test)]
mod proptests;
