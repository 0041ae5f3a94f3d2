//! Memory and key-count accounting.
//!
//! Every mutating operation updates these counters synchronously, so a
//! caller can watch the table's footprint without walking the structure.
//! Useful for sizing embedded deployments and for debugging reindex
//! behavior under collision-heavy workloads.

use crate::node::{Branch, Entry};

/// Running counters for one [`Table`](crate::Table).
///
/// All four counters are exact: `index_bytes` is the structural size of
/// every live branch node (the root included), `meta_bytes` the fixed
/// per-entry overhead (struct, chain link, length headers), and
/// `data_bytes` the raw key plus value payload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Number of live keys.
    pub num_keys: u64,
    /// Bytes held by branch-node structures.
    pub index_bytes: u64,
    /// Bytes of fixed per-entry overhead.
    pub meta_bytes: u64,
    /// Bytes of raw key and value payload.
    pub data_bytes: u64,
}

impl TableStats {
    pub(crate) fn record_branch(&mut self) {
        self.index_bytes += Branch::FOOTPRINT;
    }

    pub(crate) fn discard_branch(&mut self) {
        self.index_bytes -= Branch::FOOTPRINT;
    }

    pub(crate) fn record_insert(&mut self, key_len: usize, value_len: usize) {
        self.num_keys += 1;
        self.meta_bytes += Entry::FOOTPRINT;
        self.data_bytes += (key_len + value_len) as u64;
    }

    pub(crate) fn record_replace(&mut self, old_value_len: usize, new_value_len: usize) {
        self.data_bytes -= old_value_len as u64;
        self.data_bytes += new_value_len as u64;
    }

    pub(crate) fn record_remove(&mut self, key_len: usize, value_len: usize) {
        self.num_keys -= 1;
        self.meta_bytes -= Entry::FOOTPRINT;
        self.data_bytes -= (key_len + value_len) as u64;
    }
}
