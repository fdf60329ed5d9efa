#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod hash_map;
pub mod hash_table;
pub mod layout;
pub mod memory_view;
pub mod primes;
pub mod storage;

pub use error::Error;
pub use error::Result;
pub use hash_map::DenseMap;
pub use hash_map::VecDenseMap;
pub use hash_table::HashTable;
pub use layout::TableLayout;
pub use memory_view::MemoryView;
pub use memory_view::MemoryViewMut;
pub use storage::Arena;
pub use storage::Global;
pub use storage::RawAllocator;
pub use storage::VecStorage;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is named.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is named.
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}
