//! The hash table itself.
//!
//! This module contains the main [`Table`] implementation: a digest-routed
//! 16-way trie of maximum depth 8 whose leaves are collision chains of
//! [`Entry`](crate::node::Entry) records. Chains that outgrow the configured
//! bound are reindexed in place into a deeper branch node, so lookup cost
//! stays bounded by O(8) descent plus one short chain scan — except for keys
//! whose digests collide on all eight symbols, which share a permanent chain
//! at the depth floor and are told apart by full key comparison.

use crate::digest::{DIGEST_LEN, Digest};
use crate::error::{Error, MAX_KEY_LEN, MAX_VALUE_LEN};
use crate::node::{Branch, Entry, Slot};
use crate::stats::TableStats;

/// Chain length a store may leave behind before reindexing kicks in.
pub const DEFAULT_MAX_CHAIN: u8 = 16;

/// Default for the reindex scatter tuning knob.
pub const DEFAULT_REINDEX_SCATTER: u8 = 1;

/// Outcome of a successful [`Table::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    /// The key was not present before; a new entry was created.
    Added,
    /// The key existed; its value and flags were overwritten.
    Replaced,
}

/// A value found by [`Table::fetch`].
///
/// `value` borrows the live entry, so the borrow checker ends it before the
/// next mutating call on the table. Copy the bytes out if you need them to
/// survive a later `store`/`remove`/`clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetched<'a> {
    /// The flags byte stored alongside the value.
    pub flags: u8,
    /// The stored value bytes.
    pub value: &'a [u8],
}

/// An entry removed by [`Table::remove`]. The value is copied out before the
/// entry is freed, so it stays valid for as long as the caller keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    /// The flags byte the entry carried.
    pub flags: u8,
    /// The removed value bytes, owned.
    pub value: Box<[u8]>,
}

/// A binary-safe key/value store with bounded collision chains.
///
/// Keys are variable-length byte strings up to 64 KiB, values up to 4 GiB.
/// A key is routed through the trie by an 8-nibble digest of its bytes;
/// colliding keys chain at the position where their digests diverge no
/// further. The table is single-threaded by design: no internal locking,
/// no atomics. Wrap it in a lock (or shard across tables) for concurrent use.
///
/// ## Examples
///
/// ```rust
/// use nibblehash::{Error, Store, Table};
///
/// let mut table = Table::new();
/// assert_eq!(table.store(b"a", b"1", 0).unwrap(), Store::Added);
/// assert_eq!(table.store(b"a", b"2", 0).unwrap(), Store::Replaced);
/// assert_eq!(table.fetch(b"a").unwrap().value, b"2");
///
/// let removed = table.remove(b"a").unwrap();
/// assert_eq!(&*removed.value, b"2");
/// assert_eq!(table.fetch(b"a"), Err(Error::NotFound));
/// ```
pub struct Table {
    root: Box<Branch>,
    stats: TableStats,
    max_chain: u8,
    reindex_scatter: u8,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Create an empty table with the default chain bound of 16.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_CHAIN, DEFAULT_REINDEX_SCATTER)
    }

    /// Create an empty table with an explicit chain bound and scatter hint.
    ///
    /// Both parameters are clamped to at least 1, and `reindex_scatter`
    /// resets to 1 when `max_chain + reindex_scatter` would exceed 256.
    pub fn with_config(max_chain: u8, reindex_scatter: u8) -> Self {
        let max_chain = max_chain.max(1);
        let mut reindex_scatter = reindex_scatter.max(1);
        if max_chain as u16 + reindex_scatter as u16 > 256 {
            reindex_scatter = 1;
        }
        let mut stats = TableStats::default();
        stats.record_branch();
        Table {
            root: Branch::new(),
            stats,
            max_chain,
            reindex_scatter,
        }
    }

    /// The chain length bound this table was configured with.
    pub fn max_chain(&self) -> u8 {
        self.max_chain
    }

    /// The reindex scatter hint this table was configured with.
    ///
    /// Currently a recorded tuning knob with no effect on redistribution;
    /// kept as an extension point for pre-splitting chains during reindex.
    pub fn reindex_scatter(&self) -> u8 {
        self.reindex_scatter
    }

    /// Running counters for this table.
    pub fn stats(&self) -> &TableStats {
        &self.stats
    }

    /// Number of live keys.
    pub fn len(&self) -> u64 {
        self.stats.num_keys
    }

    /// True if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.stats.num_keys == 0
    }

    /// Insert or overwrite a key/value pair.
    ///
    /// Returns [`Store::Added`] for a new key, [`Store::Replaced`] when an
    /// existing value was overwritten. A rejected key or value leaves the
    /// table untouched. Appending past the chain bound triggers reindexing
    /// of the affected chain; a reindex that cannot complete never affects
    /// the insert that triggered it.
    pub fn store(&mut self, key: &[u8], value: &[u8], flags: u8) -> Result<Store, Error> {
        if key.len() > MAX_KEY_LEN {
            return Err(Error::KeyTooLong(key.len()));
        }
        if value.len() as u64 > MAX_VALUE_LEN {
            return Err(Error::ValueTooLong(value.len() as u64));
        }

        let digest = Digest::of(key);
        let max_chain = self.max_chain as usize;
        let (branch, depth) = Self::descend_mut(&mut self.root, &digest, 0);
        let sym = digest.symbol(depth) as usize;

        match &mut branch.slots[sym] {
            slot @ Slot::Empty => {
                *slot = Slot::Chain(Entry::new(key, value, flags)?);
                self.stats.record_insert(key.len(), value.len());
                return Ok(Store::Added);
            }
            Slot::Chain(head) => {
                let mut cur: &mut Entry = head;
                loop {
                    if cur.key_matches(key) {
                        let old_len = cur.value_len();
                        cur.replace_value(value, flags)?;
                        self.stats.record_replace(old_len, value.len());
                        return Ok(Store::Replaced);
                    }
                    match cur.next {
                        Some(ref mut next) => cur = &mut **next,
                        None => break,
                    }
                }
                cur.next = Some(Entry::new(key, value, flags)?);
                self.stats.record_insert(key.len(), value.len());
            }
            Slot::Branch(_) => unreachable!("descent stops at chains and empty slots"),
        }

        // The append may have pushed the chain past the bound. Reindexing is
        // an optimization step only; the insert above is already complete.
        if depth + 1 < DIGEST_LEN {
            let slot = &mut branch.slots[sym];
            let overlong = matches!(&*slot, Slot::Chain(head) if head.chain_len() > max_chain);
            if overlong {
                Self::reindex(slot, depth + 1, max_chain, &mut self.stats);
            }
        }
        Ok(Store::Added)
    }

    /// Look up a key.
    ///
    /// The returned [`Fetched`] borrows the entry's current value; the
    /// borrow must end before the next mutating call.
    pub fn fetch(&self, key: &[u8]) -> Result<Fetched<'_>, Error> {
        let digest = Digest::of(key);
        let mut branch = &*self.root;
        let mut depth = 0;
        loop {
            match &branch.slots[digest.symbol(depth) as usize] {
                Slot::Branch(child) => {
                    branch = &**child;
                    depth += 1;
                }
                Slot::Chain(head) => {
                    for entry in head.iter() {
                        if entry.key_matches(key) {
                            return Ok(Fetched {
                                flags: entry.flags,
                                value: entry.value(),
                            });
                        }
                    }
                    return Err(Error::NotFound);
                }
                Slot::Empty => return Err(Error::NotFound),
            }
        }
    }

    /// Remove a key, returning its flags and an owned copy of its value.
    ///
    /// The slot is cleared when the chain empties; branch nodes created by
    /// earlier reindexing are deliberately never collapsed back into chains.
    pub fn remove(&mut self, key: &[u8]) -> Result<Removed, Error> {
        let digest = Digest::of(key);
        let (branch, depth) = Self::descend_mut(&mut self.root, &digest, 0);
        let slot = &mut branch.slots[digest.symbol(depth) as usize];

        let Slot::Chain(head) = slot else {
            return Err(Error::NotFound);
        };

        if head.key_matches(key) {
            let Slot::Chain(mut head) = std::mem::replace(slot, Slot::Empty) else {
                unreachable!()
            };
            if let Some(rest) = head.next.take() {
                *slot = Slot::Chain(rest);
            }
            let removed = Removed {
                flags: head.flags,
                value: head.value().into(),
            };
            self.stats.record_remove(key.len(), removed.value.len());
            return Ok(removed);
        }

        let mut prev: &mut Entry = head;
        loop {
            let hit = matches!(&prev.next, Some(next) if next.key_matches(key));
            if hit {
                let Some(mut victim) = prev.next.take() else {
                    unreachable!()
                };
                prev.next = victim.next.take();
                let removed = Removed {
                    flags: victim.flags,
                    value: victim.value().into(),
                };
                self.stats.record_remove(key.len(), removed.value.len());
                return Ok(removed);
            }
            match prev.next {
                Some(ref mut next) => prev = &mut **next,
                None => return Err(Error::NotFound),
            }
        }
    }

    /// First key in traversal order: depth-first, ascending slot index at
    /// every branch, chain order within a leaf.
    pub fn first_key(&self) -> Result<Vec<u8>, Error> {
        Self::min_key(&self.root)
            .map(<[u8]>::to_vec)
            .ok_or(Error::Empty)
    }

    /// Successor of `key` in traversal order.
    ///
    /// `key` must currently exist; a missing key reports [`Error::NotFound`]
    /// rather than guessing a resume position. The position is re-derived
    /// from the digest path on every call, so no cursor state exists and
    /// removing *other* keys between calls cannot corrupt a traversal.
    pub fn next_key(&self, key: &[u8]) -> Result<Vec<u8>, Error> {
        let digest = Digest::of(key);
        let mut path: Vec<(&Branch, usize)> = Vec::with_capacity(DIGEST_LEN);
        let mut branch = &*self.root;
        let mut depth = 0;
        let head = loop {
            let sym = digest.symbol(depth) as usize;
            match &branch.slots[sym] {
                Slot::Branch(child) => {
                    path.push((branch, sym));
                    branch = &**child;
                    depth += 1;
                }
                Slot::Chain(head) => {
                    path.push((branch, sym));
                    break head;
                }
                Slot::Empty => return Err(Error::NotFound),
            }
        };

        let mut chain = head.iter();
        if !chain.any(|entry| entry.key_matches(key)) {
            return Err(Error::NotFound);
        }
        if let Some(next) = chain.next() {
            return Ok(next.key().to_vec());
        }

        // Chain exhausted: climb back up, scanning the slots after the one
        // the digest path took at each level, deepest level first.
        while let Some((branch, sym)) = path.pop() {
            for slot in &branch.slots[sym + 1..] {
                match slot {
                    Slot::Empty => {}
                    Slot::Chain(head) => return Ok(head.key().to_vec()),
                    Slot::Branch(child) => {
                        if let Some(key) = Self::min_key(child) {
                            return Ok(key.to_vec());
                        }
                    }
                }
            }
        }
        Err(Error::EndOfKeys)
    }

    /// An iterator over all keys in traversal order, built on
    /// [`first_key`](Table::first_key) / [`next_key`](Table::next_key).
    pub fn keys(&self) -> Keys<'_> {
        Keys {
            table: self,
            cursor: None,
            done: false,
        }
    }

    /// Drop every entry and branch and reset the statistics, leaving an
    /// empty root in place.
    pub fn clear(&mut self) {
        self.root = Branch::new();
        self.stats = TableStats::default();
        self.stats.record_branch();
    }

    /// Drop only the subtree under one root slot, leaving siblings and their
    /// share of the statistics untouched.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= 16`.
    pub fn clear_slot(&mut self, slot: u8) {
        let cleared = std::mem::replace(&mut self.root.slots[slot as usize], Slot::Empty);
        Self::discount(&cleared, &mut self.stats);
    }

    /// Follow the digest path down to the deepest existing branch. Returns
    /// that branch and its depth; the slot for `digest.symbol(depth)` there
    /// is empty or a chain, never a nested branch.
    fn descend_mut<'a>(
        branch: &'a mut Branch,
        digest: &Digest,
        depth: usize,
    ) -> (&'a mut Branch, usize) {
        let sym = digest.symbol(depth) as usize;
        if matches!(branch.slots[sym], Slot::Branch(_)) {
            let Slot::Branch(child) = &mut branch.slots[sym] else {
                unreachable!()
            };
            Self::descend_mut(child, digest, depth + 1)
        } else {
            (branch, depth)
        }
    }

    /// Smallest key in traversal order under `branch`, or `None` if the
    /// subtree holds no entries (possible after removals, since emptied
    /// branches persist).
    fn min_key(branch: &Branch) -> Option<&[u8]> {
        for slot in &branch.slots {
            match slot {
                Slot::Empty => {}
                Slot::Chain(head) => return Some(head.key()),
                Slot::Branch(child) => {
                    if let Some(key) = Self::min_key(child) {
                        return Some(key);
                    }
                }
            }
        }
        None
    }

    /// Convert the overlong chain in `slot` into a branch routing on digest
    /// symbol `child_depth`, relinking each entry into the sub-chain its
    /// next symbol selects. Cascades while sub-chains still exceed the bound
    /// and symbols remain; at the depth floor chains are left as-is.
    fn reindex(slot: &mut Slot, child_depth: usize, max_chain: usize, stats: &mut TableStats) {
        let Slot::Chain(head) = std::mem::replace(slot, Slot::Empty) else {
            unreachable!("reindex is only triggered on a chain slot");
        };
        let mut branch = Branch::new();
        stats.record_branch();

        // Relink, never reallocate: entry overhead and payload counters are
        // unaffected. Entries land in front of their sub-chain.
        let mut next = Some(head);
        while let Some(mut entry) = next {
            next = entry.next.take();
            let sym = Digest::of(entry.key()).symbol(child_depth) as usize;
            entry.next = match std::mem::replace(&mut branch.slots[sym], Slot::Empty) {
                Slot::Chain(sub) => Some(sub),
                _ => None,
            };
            branch.slots[sym] = Slot::Chain(entry);
        }

        if child_depth + 1 < DIGEST_LEN {
            for sub in branch.slots.iter_mut() {
                let overlong = matches!(&*sub, Slot::Chain(head) if head.chain_len() > max_chain);
                if overlong {
                    Self::reindex(sub, child_depth + 1, max_chain, stats);
                }
            }
        }
        *slot = Slot::Branch(branch);
    }

    /// Subtract a detached subtree's exact contribution from the counters.
    fn discount(slot: &Slot, stats: &mut TableStats) {
        match slot {
            Slot::Empty => {}
            Slot::Chain(head) => {
                for entry in head.iter() {
                    stats.record_remove(entry.key_len(), entry.value_len());
                }
            }
            Slot::Branch(child) => {
                stats.discard_branch();
                for slot in &child.slots {
                    Self::discount(slot, stats);
                }
            }
        }
    }
}

/// Stateless key iterator; see [`Table::keys`].
///
/// Each step re-walks the digest path of the previous key, so a step is
/// O(depth). The iterator ends early if the key it would resume from is
/// removed mid-traversal.
pub struct Keys<'a> {
    table: &'a Table,
    cursor: Option<Vec<u8>>,
    done: bool,
}

impl Iterator for Keys<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.done {
            return None;
        }
        let step = match &self.cursor {
            None => self.table.first_key(),
            Some(key) => self.table.next_key(key),
        };
        match step {
            Ok(key) => {
                self.cursor = Some(key.clone());
                Some(key)
            }
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
impl Table {
    /// Walk the whole structure and assert every invariant the design
    /// promises: entries sit only under their own digest path, no chain
    /// above the depth floor exceeds the bound, no chain holds a duplicate
    /// key, branches never go deeper than 8 levels, and the running stats
    /// match a full recount.
    pub(crate) fn check_invariants(&self) {
        fn walk(
            branch: &Branch,
            path: &mut Vec<u8>,
            recount: &mut TableStats,
            max_chain: usize,
        ) {
            for (sym, slot) in branch.slots.iter().enumerate() {
                path.push(sym as u8);
                match slot {
                    Slot::Empty => {}
                    Slot::Branch(child) => {
                        assert!(path.len() < DIGEST_LEN, "branch beyond the depth floor");
                        recount.record_branch();
                        walk(child, path, recount, max_chain);
                    }
                    Slot::Chain(head) => {
                        if path.len() < DIGEST_LEN {
                            assert!(
                                head.chain_len() <= max_chain,
                                "overlong chain above the depth floor"
                            );
                        }
                        let mut seen = std::collections::HashSet::new();
                        for entry in head.iter() {
                            let digest = Digest::of(entry.key());
                            for (d, &s) in path.iter().enumerate() {
                                assert_eq!(digest.symbol(d), s, "entry under wrong digest path");
                            }
                            assert!(seen.insert(entry.key().to_vec()), "duplicate key in chain");
                            recount.record_insert(entry.key_len(), entry.value_len());
                        }
                    }
                }
                path.pop();
            }
        }

        let mut recount = TableStats::default();
        recount.record_branch();
        let mut path = Vec::new();
        walk(&self.root, &mut path, &mut recount, self.max_chain as usize);
        assert_eq!(recount, self.stats, "stats out of sync with a full recount");
    }

    pub(crate) fn root_slot_is_branch(&self, slot: usize) -> bool {
        matches!(self.root.slots[slot], Slot::Branch(_))
    }

    /// The traversal order computed directly from the structure, for
    /// checking `first_key`/`next_key` against their definition.
    pub(crate) fn traversal_reference(&self) -> Vec<Vec<u8>> {
        fn walk(branch: &Branch, out: &mut Vec<Vec<u8>>) {
            for slot in &branch.slots {
                match slot {
                    Slot::Empty => {}
                    Slot::Chain(head) => {
                        out.extend(head.iter().map(|entry| entry.key().to_vec()));
                    }
                    Slot::Branch(child) => walk(child, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }
}
