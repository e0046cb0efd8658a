use super::{take_header, Header, Inner, Node16, NodeKind, NodeRef};

/// Branching node with up to 4 children, kept sorted by key byte.
#[derive(Clone)]
pub struct Node4<V> {
    header: Header,
    keys: [u8; 4],
    children: [Option<NodeRef<V>>; 4],
}

impl<V> Node4<V> {
    /// Create an empty Node4.
    pub fn new() -> Self {
        Self::with_header(Header::default())
    }

    fn with_header(mut header: Header) -> Self {
        header.num_children = 0;
        Self {
            header,
            keys: [0; 4],
            children: Default::default(),
        }
    }

    /// Shrink a Node16 that has at most 4 children left.
    pub(crate) fn from_node16(n: &mut Node16<V>) -> Self {
        let children = n.take_children();
        let mut node = Self::with_header(take_header(n.header_mut()));
        for (byte, child) in children {
            node.set_child(byte, child);
        }
        node
    }

    /// Detach the remaining child of a node that is down to one.
    pub(crate) fn take_only_child(&mut self) -> Option<(u8, NodeRef<V>)> {
        if self.num_children() != 1 {
            return None;
        }
        let child = self.children[0].take()?;
        self.set_num_children(0);
        Some((self.keys[0], child))
    }

    pub(super) fn take_children(&mut self) -> Vec<(u8, NodeRef<V>)> {
        let n = self.num_children();
        (0..n)
            .filter_map(|i| self.children[i].take().map(|c| (self.keys[i], c)))
            .collect()
    }

    fn position(&self, byte: u8) -> Option<usize> {
        self.keys[..self.num_children()].iter().position(|&k| k == byte)
    }
}

impl<V> Default for Node4<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Inner<V> for Node4<V> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Node4
    }

    fn child(&self, byte: u8) -> Option<&NodeRef<V>> {
        self.children[self.position(byte)?].as_ref()
    }

    fn child_mut(&mut self, byte: u8) -> Option<&mut NodeRef<V>> {
        let i = self.position(byte)?;
        self.children[i].as_mut()
    }

    fn set_child(&mut self, byte: u8, child: NodeRef<V>) {
        if let Some(i) = self.position(byte) {
            self.children[i] = Some(child);
            return;
        }
        let n = self.num_children();
        assert!(n < 4, "Node4 is full, grow before adding a child");
        let idx = self.keys[..n].iter().position(|&k| k > byte).unwrap_or(n);
        self.keys.copy_within(idx..n, idx + 1);
        self.children[idx..=n].rotate_right(1);
        self.keys[idx] = byte;
        self.children[idx] = Some(child);
        self.set_num_children(n + 1);
    }

    fn remove_child(&mut self, byte: u8) -> Option<NodeRef<V>> {
        let i = self.position(byte)?;
        let n = self.num_children();
        let child = self.children[i].take();
        self.keys.copy_within(i + 1..n, i);
        self.children[i..n].rotate_left(1);
        self.set_num_children(n - 1);
        child
    }

    fn next_child(&self, from: usize) -> Option<(u8, &NodeRef<V>)> {
        for i in 0..self.num_children() {
            if self.keys[i] as usize >= from {
                return self.children[i].as_ref().map(|c| (self.keys[i], c));
            }
        }
        None
    }

    fn prev_child(&self, upto: u8) -> Option<(u8, &NodeRef<V>)> {
        for i in (0..self.num_children()).rev() {
            if self.keys[i] <= upto {
                return self.children[i].as_ref().map(|c| (self.keys[i], c));
            }
        }
        None
    }
}
