//! An embeddable, binary-safe key/value store.
//!
//! `nibblehash` maps variable-length byte keys to variable-length byte values
//! through a hybrid structure: a 16-way trie routed by an 8-nibble digest of
//! the key, whose leaves are short collision chains. Chains that outgrow a
//! configurable bound are automatically reindexed into a deeper trie level,
//! keeping worst-case lookups at a bounded descent plus a short scan.
//!
//! There is no disk persistence, no wire format, and no internal locking;
//! this is a single-threaded in-process data structure. See [`Table`] for
//! the operation surface and the aliasing rules of fetched values.
//!
//! ```rust
//! use nibblehash::{Error, Store, Table};
//!
//! let mut table = Table::new();
//! assert_eq!(table.store(b"apple", b"fruit", 0).unwrap(), Store::Added);
//! assert_eq!(table.fetch(b"apple").unwrap().value, b"fruit");
//!
//! for key in table.keys() {
//!     println!("{:?} ({} bytes)", key, table.fetch(&key).unwrap().value.len());
//! }
//!
//! assert!(table.remove(b"apple").is_ok());
//! assert_eq!(table.fetch(b"apple"), Err(Error::NotFound));
//! ```

mod digest;
mod error;
mod node;
pub mod stats;
pub mod table;

#[cfg(test)]
mod proptests;

pub use error::{Error, MAX_KEY_LEN, MAX_VALUE_LEN};
pub use stats::TableStats;
pub use table::{
    DEFAULT_MAX_CHAIN, DEFAULT_REINDEX_SCATTER, Fetched, Keys, Removed, Store, Table,
};
