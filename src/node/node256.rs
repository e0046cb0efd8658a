use super::{take_header, Header, Inner, Node48, NodeKind, NodeRef};

/// Branching node with 49-256 children, indexed directly by key byte.
#[derive(Clone)]
pub struct Node256<V> {
    header: Header,
    children: [Option<NodeRef<V>>; 256],
}

impl<V> Node256<V> {
    /// Grow a full Node48.
    pub(crate) fn from_node48(n: &mut Node48<V>) -> Self {
        let children = n.take_children();
        let mut header = take_header(n.header_mut());
        header.num_children = 0;
        let mut node = Self {
            header,
            children: std::array::from_fn(|_| None),
        };
        for (byte, child) in children {
            node.set_child(byte, child);
        }
        node
    }

    pub(super) fn take_children(&mut self) -> Vec<(u8, NodeRef<V>)> {
        self.children
            .iter_mut()
            .enumerate()
            .filter_map(|(byte, slot)| slot.take().map(|c| (byte as u8, c)))
            .collect()
    }
}

impl<V> Inner<V> for Node256<V> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Node256
    }

    /// No partial keys in a fully expanded node: always a match.
    fn match_prefix(&self, _segment: &[u8]) -> bool {
        true
    }

    fn child(&self, byte: u8) -> Option<&NodeRef<V>> {
        self.children[byte as usize].as_ref()
    }

    fn child_mut(&mut self, byte: u8) -> Option<&mut NodeRef<V>> {
        self.children[byte as usize].as_mut()
    }

    fn set_child(&mut self, byte: u8, child: NodeRef<V>) {
        if self.children[byte as usize].replace(child).is_none() {
            let n = self.num_children();
            self.set_num_children(n + 1);
        }
    }

    fn remove_child(&mut self, byte: u8) -> Option<NodeRef<V>> {
        let child = self.children[byte as usize].take()?;
        let n = self.num_children();
        self.set_num_children(n - 1);
        Some(child)
    }

    fn next_child(&self, from: usize) -> Option<(u8, &NodeRef<V>)> {
        self.children
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(byte, slot)| slot.as_ref().map(|c| (byte as u8, c)))
    }

    fn prev_child(&self, upto: u8) -> Option<(u8, &NodeRef<V>)> {
        self.children[..=upto as usize]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(byte, slot)| slot.as_ref().map(|c| (byte as u8, c)))
    }
}
