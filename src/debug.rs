//! Debug utilities for troubleshooting tree shape.

use std::fmt::{self, Write};

use crate::node::{Node, NodeKind, MAX_PREFIX_LEN, NODE16_SHRINK, NODE256_SHRINK, NODE48_SHRINK};
use crate::tree::Tree;

/// Node counts and depth of one tree version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Number of leaf nodes
    pub leaves: usize,
    /// Number of Node4 instances
    pub node4: usize,
    /// Number of Node16 instances
    pub node16: usize,
    /// Number of Node48 instances
    pub node48: usize,
    /// Number of Node256 instances
    pub node256: usize,
    /// Longest root-to-leaf path, in nodes. Zero for an empty tree.
    pub max_depth: usize,
}

impl NodeStats {
    /// Number of branching nodes.
    pub fn inner(&self) -> usize {
        self.node4 + self.node16 + self.node48 + self.node256
    }
}

/// Fewest children a node of `kind` may keep once the tree is settled.
fn min_children(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Leaf => 0,
        NodeKind::Node4 => 2,
        NodeKind::Node16 => NODE16_SHRINK + 1,
        NodeKind::Node48 => NODE48_SHRINK + 1,
        NodeKind::Node256 => NODE256_SHRINK + 1,
    }
}

impl<V> Tree<V> {
    /// Count nodes by kind.
    pub fn stats(&self) -> NodeStats {
        let mut stats = NodeStats::default();
        let mut stack: Vec<(&Node<V>, usize)> = self.root().map(|r| (r, 1)).into_iter().collect();
        while let Some((node, depth)) = stack.pop() {
            stats.max_depth = stats.max_depth.max(depth);
            match node.kind() {
                NodeKind::Leaf => stats.leaves += 1,
                NodeKind::Node4 => stats.node4 += 1,
                NodeKind::Node16 => stats.node16 += 1,
                NodeKind::Node48 => stats.node48 += 1,
                NodeKind::Node256 => stats.node256 += 1,
            }
            let mut from = 0;
            while let Some((byte, child)) = node.next_child(from) {
                stack.push((&**child, depth + 1));
                from = byte as usize + 1;
            }
        }
        stats
    }

    /// Verify tree integrity - returns list of issues found.
    pub fn verify_integrity(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut leaves = 0;
        if let Some(root) = self.root() {
            verify_node(root, &mut issues, &mut leaves);
        }
        if leaves != self.len() {
            issues.push(format!("found {} leaves but len()={}", leaves, self.len()));
        }

        let mut prev: Option<&[u8]> = None;
        let mut iter = self.iter();
        while let Some(leaf) = iter.next_leaf() {
            let key = leaf.encoded_key();
            if prev.is_some_and(|p| p >= key) {
                issues.push(format!("iteration out of order at {:?}", String::from_utf8_lossy(key)));
            }
            prev = Some(key);
        }
        issues
    }

    /// Render the node structure, one node per line.
    pub fn dump(&self) -> String
    where
        V: fmt::Debug,
    {
        let mut out = String::new();
        let _ = writeln!(out, "size: {}", self.len());
        match self.root() {
            Some(root) => dump_node(&mut out, root, 0),
            None => out.push_str("(empty)\n"),
        }
        out
    }
}

fn verify_node<V>(root: &Node<V>, issues: &mut Vec<String>, leaves: &mut usize) {
    let mut stack: Vec<(&Node<V>, usize, Vec<u8>)> = vec![(root, 0, Vec::new())];
    while let Some((node, depth, path)) = stack.pop() {
        if let Node::Leaf(leaf) = node {
            *leaves += 1;
            if !leaf.encoded_key().starts_with(&path) {
                issues.push(format!(
                    "leaf {:?} does not extend its path {:?}",
                    String::from_utf8_lossy(leaf.encoded_key()),
                    String::from_utf8_lossy(&path)
                ));
            }
            continue;
        }

        let kind = node.kind();
        let n = node.num_children();
        let mut occupied = 0;
        let mut from = 0;
        while let Some((byte, _)) = node.next_child(from) {
            occupied += 1;
            from = byte as usize + 1;
        }
        if occupied != n {
            issues.push(format!("{:?} has {} children but num_children={}", kind, occupied, n));
        }
        if n > kind.capacity() {
            issues.push(format!("{:?} has {} children (max {})", kind, n, kind.capacity()));
        }
        if n < min_children(kind) {
            issues.push(format!("{:?} has {} children (min {})", kind, n, min_children(kind)));
        }

        let plen = node.partial_len();
        if node.partial().len() != plen.min(MAX_PREFIX_LEN) {
            issues.push(format!(
                "{:?} stores {} partial bytes for partial_len={}",
                kind,
                node.partial().len(),
                plen
            ));
        }
        let prefix = node.full_prefix(depth);
        if prefix.len() != plen || !prefix.starts_with(node.partial()) {
            issues.push(format!(
                "{:?} at depth {} has partial {:?} disagreeing with its leaves",
                kind,
                depth,
                String::from_utf8_lossy(node.partial())
            ));
        }

        // Pushed in reverse so children are checked in key order.
        let mut children = Vec::with_capacity(n);
        let mut from = 0;
        while let Some((byte, child)) = node.next_child(from) {
            children.push((byte, &**child));
            from = byte as usize + 1;
        }
        for (byte, child) in children.into_iter().rev() {
            let mut child_path = path.clone();
            child_path.extend_from_slice(prefix);
            child_path.push(byte);
            stack.push((child, depth + plen + 1, child_path));
        }
    }
}

fn dump_node<V: fmt::Debug>(out: &mut String, node: &Node<V>, indent: usize) {
    let pad = "  ".repeat(indent);
    if let Node::Leaf(leaf) = node {
        let _ = writeln!(out, "{}Leaf: {:?} -> {:?}", pad, String::from_utf8_lossy(&leaf.key()), leaf.value());
        return;
    }
    let _ = writeln!(
        out,
        "{}{:?} (prefix={:?}, len={}, children={})",
        pad,
        node.kind(),
        String::from_utf8_lossy(node.partial()),
        node.partial_len(),
        node.num_children()
    );
    let mut from = 0;
    while let Some((byte, child)) = node.next_child(from) {
        let _ = writeln!(out, "{}  [{:#04x}] ->", pad, byte);
        dump_node(out, child, indent + 2);
        from = byte as usize + 1;
    }
}
