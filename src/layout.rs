//! Byte layout of a table materialized as one allocation.
//!
//! ```text
//! [ Header | values: V * capacity | nodes: Node<K> * capacity | buckets: u32 * prime ]
//! ```
//!
//! Each region starts at the running total of the regions before it, rounded
//! up to the region's alignment when the previous region does not already end
//! on one. The offsets are fixed for the life of an allocation and may be
//! handed to other consumers as a stable description of the memory.

use core::alloc::Layout;

use crate::error::Error;
use crate::error::Result;
use crate::hash_table::Node;
use crate::primes;

/// Placement of one region inside the allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Region {
    /// Size of one item in bytes.
    pub item_size: usize,
    /// Number of items.
    pub count: usize,
    /// Byte offset from the start of the allocation.
    pub offset: usize,
    /// Total bytes, `item_size * count`.
    pub bytes: usize,
}

impl Region {
    /// Byte offset one past the end of the region.
    pub fn end(&self) -> usize {
        self.offset + self.bytes
    }
}

/// The computed layout of a table allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct TableLayout {
    /// The header, always at offset 0.
    pub header: Region,
    /// Dense values, one per capacity slot.
    pub values: Region,
    /// Dense nodes, index-aligned with `values`.
    pub nodes: Region,
    /// Bucket heads, a prime number of them.
    pub buckets: Region,
    allocation: Layout,
}

impl TableLayout {
    /// Computes the layout for a table of `capacity` entries with keys `K`
    /// and values `V`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `capacity` exceeds
    /// [`primes::MAX_PRIME`] or the allocation size would overflow.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_hash::layout::TableLayout;
    ///
    /// let layout = TableLayout::compute::<u32, u64>(10).unwrap();
    /// assert_eq!(layout.values.count, 10);
    /// assert_eq!(layout.nodes.count, 10);
    /// assert_eq!(layout.buckets.count, 11);
    /// assert!(layout.values.offset >= layout.header.end());
    /// assert!(layout.size() >= layout.buckets.end());
    /// ```
    pub fn compute<K, V>(capacity: usize) -> Result<Self> {
        Self::from_item_layouts(
            capacity,
            Layout::new::<V>(),
            Layout::new::<Node<K>>(),
            Layout::new::<u32>(),
        )
    }

    fn from_item_layouts(
        capacity: usize,
        value: Layout,
        node: Layout,
        bucket: Layout,
    ) -> Result<Self> {
        if capacity > primes::MAX_PRIME {
            return Err(Error::InvalidArgument(
                "capacity exceeds the largest supported table size",
            ));
        }
        let bucket_count = primes::next_prime(capacity)?;

        let header_layout = Layout::new::<Header>();
        let header = Region {
            item_size: header_layout.size(),
            count: 1,
            offset: 0,
            bytes: header_layout.size(),
        };

        let (layout, values) = extend(header_layout, value, capacity)?;
        let (layout, nodes) = extend(layout, node, capacity)?;
        let (layout, buckets) = extend(layout, bucket, bucket_count)?;

        Ok(Self {
            header,
            values,
            nodes,
            buckets,
            allocation: layout.pad_to_align(),
        })
    }

    /// Number of entries the layout holds.
    pub fn capacity(&self) -> usize {
        self.values.count
    }

    /// Total allocation size in bytes.
    pub fn size(&self) -> usize {
        self.allocation.size()
    }

    /// Alignment of the allocation.
    pub fn align(&self) -> usize {
        self.allocation.align()
    }

    /// The layout to request from an allocator.
    pub fn allocation(&self) -> Layout {
        self.allocation
    }
}

fn extend(layout: Layout, item: Layout, count: usize) -> Result<(Layout, Region)> {
    const OVERFLOW: Error = Error::InvalidArgument("allocation size overflow");

    let bytes = item.size().checked_mul(count).ok_or(OVERFLOW)?;
    let array = Layout::from_size_align(bytes, item.align()).map_err(|_| OVERFLOW)?;
    let (layout, offset) = layout.extend(array).map_err(|_| OVERFLOW)?;

    Ok((
        layout,
        Region {
            item_size: item.size(),
            count,
            offset,
            bytes,
        },
    ))
}

/// Bookkeeping for one allocation: capacity, live count, collision counter
/// and the layout it was built from.
///
/// In the arena storage the header is stored in-band at offset 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Header {
    /// Number of entries the value and node regions hold.
    pub capacity: usize,
    /// Number of live entries; also the next dense index to be written.
    pub count: usize,
    /// Chained insertions since the last remap.
    pub collisions: usize,
    /// Layout of the allocation this header describes.
    pub layout: TableLayout,
}

impl Header {
    /// A header for an empty table with the given layout.
    pub fn new(layout: TableLayout) -> Self {
        Self {
            capacity: layout.capacity(),
            count: 0,
            collisions: 0,
            layout,
        }
    }
}
