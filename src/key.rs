//! Internal key representation.
//!
//! Keys are arbitrary byte strings, so one stored key may be a prefix of
//! another. The trie needs every stored key to end in a distinct leaf, which
//! means no internal key may be a proper prefix of another internal key.
//!
//! The encoding escapes `0x00` as `0x00 0xFF` and terminates every key with
//! `0x00 0x01`. Because `0x01 < 0xFF` and every other byte passes through
//! unchanged, the encoding preserves byte-wise ordering:
//!
//! ```text
//! ""        -> 00 01
//! "a"       -> 61 00 01
//! "a\0"     -> 61 00 FF 00 01
//! "a\x01"   -> 61 01 00 01
//! ```

/// Escape byte. Always followed by [`ESCAPED_ZERO`] or [`TERMINATOR`].
pub(crate) const ESCAPE: u8 = 0x00;
/// Second byte of an escaped `0x00`.
pub(crate) const ESCAPED_ZERO: u8 = 0xFF;
/// Second byte of the end-of-key marker.
pub(crate) const TERMINATOR: u8 = 0x01;

/// Encode an external key into its internal, prefix-free form.
pub fn encode(key: &[u8]) -> Vec<u8> {
    let mut out = escape(key);
    out.push(ESCAPE);
    out.push(TERMINATOR);
    out
}

/// Escape a key without terminating it.
///
/// `escape(p)` is a prefix of `encode(k)` exactly when `p` is a prefix of
/// `k`, which is what prefix scans rely on.
pub fn escape(key: &[u8]) -> Vec<u8> {
    let zeros = key.iter().filter(|&&b| b == ESCAPE).count();
    let mut out = Vec::with_capacity(key.len() + zeros + 2);
    for &b in key {
        out.push(b);
        if b == ESCAPE {
            out.push(ESCAPED_ZERO);
        }
    }
    out
}

/// Decode an internal key back into the external form.
pub fn decode(encoded: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded.len());
    let mut i = 0;
    while i < encoded.len() {
        let b = encoded[i];
        if b == ESCAPE {
            match encoded.get(i + 1) {
                Some(&TERMINATOR) => break,
                Some(&ESCAPED_ZERO) => {
                    out.push(ESCAPE);
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(b);
        i += 1;
    }
    out
}

/// Length of the shared prefix of two byte slices.
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
