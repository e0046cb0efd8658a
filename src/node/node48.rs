use super::{take_header, Header, Inner, Node16, Node256, NodeKind, NodeRef};

/// Marks an unused byte in the child index.
const EMPTY: u8 = 0;

/// Branching node with 17-48 children.
///
/// `index[byte]` holds the child's slot plus one, so zero means absent.
/// Slots are reused in any order; ascending iteration walks `index`.
#[derive(Clone)]
pub struct Node48<V> {
    header: Header,
    index: [u8; 256],
    children: [Option<NodeRef<V>>; 48],
}

impl<V> Node48<V> {
    fn with_header(mut header: Header) -> Self {
        header.num_children = 0;
        Self {
            header,
            index: [EMPTY; 256],
            children: std::array::from_fn(|_| None),
        }
    }

    /// Grow a full Node16.
    pub(crate) fn from_node16(n: &mut Node16<V>) -> Self {
        let children = n.take_children();
        let mut node = Self::with_header(take_header(n.header_mut()));
        for (byte, child) in children {
            node.set_child(byte, child);
        }
        node
    }

    /// Shrink a Node256 that has at most 48 children left.
    pub(crate) fn from_node256(n: &mut Node256<V>) -> Self {
        let children = n.take_children();
        let mut node = Self::with_header(take_header(n.header_mut()));
        for (byte, child) in children {
            node.set_child(byte, child);
        }
        node
    }

    pub(super) fn take_children(&mut self) -> Vec<(u8, NodeRef<V>)> {
        let mut out = Vec::with_capacity(self.num_children());
        for byte in 0..256 {
            let slot = self.index[byte];
            if slot != EMPTY {
                if let Some(child) = self.children[slot as usize - 1].take() {
                    out.push((byte as u8, child));
                }
            }
        }
        out
    }

    fn slot(&self, byte: u8) -> Option<usize> {
        match self.index[byte as usize] {
            EMPTY => None,
            slot => Some(slot as usize - 1),
        }
    }
}

impl<V> Inner<V> for Node48<V> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Node48
    }

    fn child(&self, byte: u8) -> Option<&NodeRef<V>> {
        self.children[self.slot(byte)?].as_ref()
    }

    fn child_mut(&mut self, byte: u8) -> Option<&mut NodeRef<V>> {
        let slot = self.slot(byte)?;
        self.children[slot].as_mut()
    }

    fn set_child(&mut self, byte: u8, child: NodeRef<V>) {
        if let Some(slot) = self.slot(byte) {
            self.children[slot] = Some(child);
            return;
        }
        let Some(slot) = self.children.iter().position(Option::is_none) else {
            panic!("Node48 is full, grow before adding a child");
        };
        self.children[slot] = Some(child);
        self.index[byte as usize] = slot as u8 + 1;
        let n = self.num_children();
        self.set_num_children(n + 1);
    }

    fn remove_child(&mut self, byte: u8) -> Option<NodeRef<V>> {
        let slot = self.slot(byte)?;
        self.index[byte as usize] = EMPTY;
        let n = self.num_children();
        self.set_num_children(n - 1);
        self.children[slot].take()
    }

    fn next_child(&self, from: usize) -> Option<(u8, &NodeRef<V>)> {
        (from..256).find_map(|byte| {
            let child = self.children[self.slot(byte as u8)?].as_ref()?;
            Some((byte as u8, child))
        })
    }

    fn prev_child(&self, upto: u8) -> Option<(u8, &NodeRef<V>)> {
        (0..=upto).rev().find_map(|byte| {
            let child = self.children[self.slot(byte)?].as_ref()?;
            Some((byte, child))
        })
    }
}
