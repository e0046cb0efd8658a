use crate::key;

/// A terminal node: the full internal key plus the value.
#[derive(Clone)]
pub struct Leaf<V> {
    key: Box<[u8]>,
    value: V,
}

impl<V> Leaf<V> {
    pub(crate) fn new(key: Vec<u8>, value: V) -> Self {
        Self {
            key: key.into_boxed_slice(),
            value,
        }
    }

    /// The external key.
    pub fn key(&self) -> Vec<u8> {
        key::decode(&self.key)
    }

    /// The internal, terminated key.
    pub fn encoded_key(&self) -> &[u8] {
        &self.key
    }

    /// The stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    pub(crate) fn into_value(self) -> V {
        self.value
    }

    /// Whether this leaf stores exactly the internal key `key`.
    pub(crate) fn matches(&self, key: &[u8]) -> bool {
        *self.key == *key
    }

    /// Whether this leaf's external key is a prefix of the key whose escaped
    /// (unterminated) form is `escaped`.
    pub(crate) fn is_prefix_of(&self, escaped: &[u8]) -> bool {
        let body = &self.key[..self.key.len().saturating_sub(2)];
        escaped.starts_with(body)
    }
}
