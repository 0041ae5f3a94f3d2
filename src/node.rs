//! Trie nodes: branch nodes, entry chains, and the slots that hold them.

use crate::digest::FANOUT;
use crate::error::Error;

/// Bytes of the key-length header inside an entry's payload buffer.
pub(crate) const KEY_HEADER: usize = std::mem::size_of::<u16>();

/// Bytes of the value-length header inside an entry's payload buffer.
pub(crate) const VALUE_HEADER: usize = std::mem::size_of::<u32>();

/// One stored key/value record, and the link to the next record colliding at
/// the same trie position.
///
/// Key and value live in a single contiguous buffer laid out as
/// `[key_len: u16 le][key][value_len: u32 le][value]`. The chain owns its
/// tail through `next`; only the head of a chain is addressable from a slot.
pub(crate) struct Entry {
    pub(crate) flags: u8,
    data: Box<[u8]>,
    pub(crate) next: Option<Box<Entry>>,
}

impl Entry {
    /// Fixed per-entry overhead charged to the stats `meta_bytes` counter:
    /// the entry struct itself plus the two length headers.
    pub(crate) const FOOTPRINT: u64 =
        (std::mem::size_of::<Entry>() + KEY_HEADER + VALUE_HEADER) as u64;

    /// Build a boxed entry for a key/value pair. Lengths must already have
    /// been checked against the `u16`/`u32` bounds.
    pub(crate) fn new(key: &[u8], value: &[u8], flags: u8) -> Result<Box<Entry>, Error> {
        let data = Self::pack(key, value)?;
        Ok(Box::new(Entry {
            flags,
            data,
            next: None,
        }))
    }

    fn pack(key: &[u8], value: &[u8]) -> Result<Box<[u8]>, Error> {
        let total = KEY_HEADER + key.len() + VALUE_HEADER + value.len();
        let mut buf = Vec::new();
        buf.try_reserve_exact(total)
            .map_err(|_| Error::AllocationFailed)?;
        buf.extend_from_slice(&(key.len() as u16).to_le_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(value);
        Ok(buf.into_boxed_slice())
    }

    #[inline]
    pub(crate) fn key_len(&self) -> usize {
        u16::from_le_bytes([self.data[0], self.data[1]]) as usize
    }

    #[inline]
    pub(crate) fn key(&self) -> &[u8] {
        &self.data[KEY_HEADER..KEY_HEADER + self.key_len()]
    }

    #[inline]
    pub(crate) fn value_len(&self) -> usize {
        let at = KEY_HEADER + self.key_len();
        u32::from_le_bytes([
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ]) as usize
    }

    #[inline]
    pub(crate) fn value(&self) -> &[u8] {
        let at = KEY_HEADER + self.key_len() + VALUE_HEADER;
        &self.data[at..at + self.value_len()]
    }

    #[inline]
    pub(crate) fn key_matches(&self, key: &[u8]) -> bool {
        self.key_len() == key.len() && self.key() == key
    }

    /// Swap in a new value (and flags) for the same key. The old buffer is
    /// only released once the replacement has been allocated, so an
    /// allocation failure leaves the entry untouched.
    pub(crate) fn replace_value(&mut self, value: &[u8], flags: u8) -> Result<(), Error> {
        let data = Self::pack(self.key(), value)?;
        self.data = data;
        self.flags = flags;
        Ok(())
    }

    /// Walk the chain starting at this entry, in chain order.
    pub(crate) fn iter(&self) -> ChainIter<'_> {
        ChainIter { cur: Some(self) }
    }

    /// Number of entries in the chain starting at this entry.
    pub(crate) fn chain_len(&self) -> usize {
        self.iter().count()
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        // Unlink iteratively. Chains at the depth-8 collision floor have no
        // length bound, so the default recursive drop could blow the stack.
        let mut next = self.next.take();
        while let Some(mut entry) = next {
            next = entry.next.take();
        }
    }
}

pub(crate) struct ChainIter<'a> {
    cur: Option<&'a Entry>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<&'a Entry> {
        let entry = self.cur?;
        self.cur = entry.next.as_deref();
        Some(entry)
    }
}

/// What a branch slot holds. A slot for a symbol nobody hashes to stays
/// `Empty`; treating a chain as a branch (or vice versa) is unrepresentable.
pub(crate) enum Slot {
    Empty,
    Branch(Box<Branch>),
    Chain(Box<Entry>),
}

/// A 16-way fan-out node. The branch at depth `d` routes on digest symbol
/// `d`; everything reachable through slot `s` hashes to symbol `s` there.
pub(crate) struct Branch {
    pub(crate) slots: [Slot; FANOUT],
}

impl Branch {
    /// Structural size charged to the stats `index_bytes` counter per branch.
    pub(crate) const FOOTPRINT: u64 = std::mem::size_of::<Branch>() as u64;

    pub(crate) fn new() -> Box<Branch> {
        Box::new(Branch {
            slots: [const { Slot::Empty }; FANOUT],
        })
    }
}
