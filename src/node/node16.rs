use super::{take_header, Header, Inner, Node4, Node48, NodeKind, NodeRef};

/// Branching node with 5-16 children. Keys stay sorted and are scanned
/// linearly, stopping at the first key not below the byte.
#[derive(Clone)]
pub struct Node16<V> {
    header: Header,
    keys: [u8; 16],
    children: [Option<NodeRef<V>>; 16],
}

impl<V> Node16<V> {
    fn with_header(mut header: Header) -> Self {
        header.num_children = 0;
        Self {
            header,
            keys: [0; 16],
            children: Default::default(),
        }
    }

    /// Grow a full Node4.
    pub(crate) fn from_node4(n: &mut Node4<V>) -> Self {
        let children = n.take_children();
        let mut node = Self::with_header(take_header(n.header_mut()));
        for (byte, child) in children {
            node.set_child(byte, child);
        }
        node
    }

    /// Shrink a Node48 that has at most 16 children left.
    pub(crate) fn from_node48(n: &mut Node48<V>) -> Self {
        let children = n.take_children();
        let mut node = Self::with_header(take_header(n.header_mut()));
        for (byte, child) in children {
            node.set_child(byte, child);
        }
        node
    }

    pub(super) fn take_children(&mut self) -> Vec<(u8, NodeRef<V>)> {
        let n = self.num_children();
        (0..n)
            .filter_map(|i| self.children[i].take().map(|c| (self.keys[i], c)))
            .collect()
    }

    /// `Ok` with the slot holding `byte`, or `Err` with where it would go.
    fn search(&self, byte: u8) -> Result<usize, usize> {
        let keys = &self.keys[..self.num_children()];
        match keys.iter().position(|&k| k >= byte) {
            Some(i) if keys[i] == byte => Ok(i),
            Some(i) => Err(i),
            None => Err(keys.len()),
        }
    }
}

impl<V> Inner<V> for Node16<V> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Node16
    }

    fn child(&self, byte: u8) -> Option<&NodeRef<V>> {
        self.children[self.search(byte).ok()?].as_ref()
    }

    fn child_mut(&mut self, byte: u8) -> Option<&mut NodeRef<V>> {
        let i = self.search(byte).ok()?;
        self.children[i].as_mut()
    }

    fn set_child(&mut self, byte: u8, child: NodeRef<V>) {
        let n = self.num_children();
        match self.search(byte) {
            Ok(i) => self.children[i] = Some(child),
            Err(idx) => {
                assert!(n < 16, "Node16 is full, grow before adding a child");
                self.keys.copy_within(idx..n, idx + 1);
                self.children[idx..=n].rotate_right(1);
                self.keys[idx] = byte;
                self.children[idx] = Some(child);
                self.set_num_children(n + 1);
            }
        }
    }

    fn remove_child(&mut self, byte: u8) -> Option<NodeRef<V>> {
        let i = self.search(byte).ok()?;
        let n = self.num_children();
        let child = self.children[i].take();
        self.keys.copy_within(i + 1..n, i);
        self.children[i..n].rotate_left(1);
        self.set_num_children(n - 1);
        child
    }

    fn next_child(&self, from: usize) -> Option<(u8, &NodeRef<V>)> {
        let keys = &self.keys[..self.num_children()];
        let i = keys.partition_point(|&k| (k as usize) < from);
        let child = self.children.get(i)?.as_ref()?;
        keys.get(i).map(|&k| (k, child))
    }

    fn prev_child(&self, upto: u8) -> Option<(u8, &NodeRef<V>)> {
        let keys = &self.keys[..self.num_children()];
        let i = keys.partition_point(|&k| k <= upto).checked_sub(1)?;
        self.children[i].as_ref().map(|c| (keys[i], c))
    }
}
