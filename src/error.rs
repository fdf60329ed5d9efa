//! Error type shared by every fallible table, layout and view operation.

use core::fmt;

/// Which side of a bulk copy violated its bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopySide {
    /// The view or slice being read from.
    Source,
    /// The view or slice being written to.
    Destination,
}

impl fmt::Display for CopySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopySide::Source => f.write_str("source"),
            CopySide::Destination => f.write_str("destination"),
        }
    }
}

/// Errors surfaced by table and memory view operations.
///
/// None of these are retryable: each names a caller mistake or a request the
/// table cannot represent. Removing an absent key and expanding to a capacity
/// the table already has are not errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A strict insert found the key already present.
    #[error("key already present")]
    KeyAlreadyExists,

    /// A direct lookup did not find the key.
    #[error("key not found")]
    KeyNotFound,

    /// A checked access fell outside `0..len`.
    #[error("index {index} is out of range of length {len}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Length of the accessed region.
        len: usize,
    },

    /// A bulk copy range did not fit inside one of its two regions.
    #[error("copy of {length} items at index {index} overruns the {side} of length {len}")]
    CopyOutOfRange {
        /// Which side overran.
        side: CopySide,
        /// Start index on that side.
        index: usize,
        /// Number of items requested.
        length: usize,
        /// Length of that side.
        len: usize,
    },

    /// A size request that cannot be represented.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An allocation copy targeted a smaller allocation.
    #[error("shrinking an allocation from {current} to {requested} bytes is not supported")]
    ShrinkNotSupported {
        /// Size of the source allocation in bytes.
        current: usize,
        /// Size of the destination allocation in bytes.
        requested: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
