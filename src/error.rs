use thiserror::Error;

/// Longest key the table accepts, in bytes. Key lengths are stored as `u16`.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;

/// Longest value the table accepts, in bytes. Value lengths are stored as `u32`.
pub const MAX_VALUE_LEN: u64 = u32::MAX as u64;

/// Everything a table operation can fail with.
///
/// Operations never panic on bad input and never leave the table in a
/// corrupted state; a failed [`store`](crate::Table::store) performs no
/// mutation at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The key is not present in the table.
    #[error("key not found")]
    NotFound,

    /// The key is longer than [`MAX_KEY_LEN`].
    #[error("key length {0} exceeds the 65535-byte bound")]
    KeyTooLong(usize),

    /// The value is longer than [`MAX_VALUE_LEN`].
    #[error("value length {0} exceeds the 4294967295-byte bound")]
    ValueTooLong(u64),

    /// An entry payload buffer could not be allocated. The table is left
    /// exactly as it was before the failing operation.
    #[error("allocation failed")]
    AllocationFailed,

    /// `first_key` was called on a table with no keys.
    #[error("table is empty")]
    Empty,

    /// `next_key` was called on the last key in traversal order.
    #[error("no keys remain after this one")]
    EndOfKeys,
}
