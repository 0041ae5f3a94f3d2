//! Key digests.
//!
//! Every key is routed through the trie by an 8-symbol path derived from a
//! 32-bit djb2 hash of its bytes. Each symbol is a nibble, so a branch node
//! needs exactly 16 slots. The extraction order is load-bearing: it defines
//! the shape of the trie and therefore the traversal order of
//! [`Table::first_key`](crate::Table::first_key) /
//! [`Table::next_key`](crate::Table::next_key).

/// Number of symbols in a digest path, and the maximum trie depth.
pub(crate) const DIGEST_LEN: usize = 8;

/// Fan-out of a branch node: one slot per possible nibble value.
pub(crate) const FANOUT: usize = 16;

/// The digest path for one key.
///
/// Symbols 0..4 are the high nibbles of the hash's four little-endian bytes,
/// symbols 4..8 the low nibbles of the same bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Compute the digest path for `key`.
    ///
    /// Stable for identical key bytes, independent of any table state.
    pub(crate) fn of(key: &[u8]) -> Self {
        let mut hash: u32 = 5381;
        for &byte in key {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
        }
        let b = hash.to_le_bytes();
        Digest([
            b[0] >> 4,
            b[1] >> 4,
            b[2] >> 4,
            b[3] >> 4,
            b[0] & 0xf,
            b[1] & 0xf,
            b[2] & 0xf,
            b[3] & 0xf,
        ])
    }

    /// The routing symbol consumed by the branch node at `depth`.
    #[inline]
    pub(crate) fn symbol(&self, depth: usize) -> u8 {
        self.0[depth]
    }
}
