//! Backing storage strategies for [`HashTable`](crate::HashTable).
//!
//! The table algorithm only ever talks to its storage through typed memory
//! views of three regions plus a [`Header`]. Two strategies are provided:
//!
//! - [`Arena`]: the whole table is one raw allocation laid out by
//!   [`TableLayout`], header included. Offsets inside the allocation are
//!   stable until the table grows.
//! - [`VecStorage`]: three growable vectors and a header field, for callers
//!   who do not need the single-allocation layout.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;

use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use bytemuck::Zeroable;

use crate::hash_table::Node;
use crate::layout::Header;
use crate::layout::TableLayout;
use crate::memory_view::MemoryView;
use crate::memory_view::MemoryViewMut;

/// The allocation interface the arena needs: allocate bytes with an
/// alignment, and free them again. Bulk copies are done by the table itself.
///
/// # Safety
///
/// `allocate` must return either `None` or a pointer valid for reads and
/// writes of `layout.size()` bytes aligned to `layout.align()`, which stays
/// valid until passed to `deallocate` with the same layout.
pub unsafe trait RawAllocator {
    /// Allocates a block for `layout`. `layout` always has a non-zero size.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Releases a block previously returned by `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global Rust allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Global;

// SAFETY: Forwards directly to the global allocator.
unsafe impl RawAllocator for Global {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        // SAFETY: The trait contract guarantees a non-zero size.
        NonNull::new(unsafe { alloc::alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// Shared access to every part of a storage at once.
pub struct Regions<'a, K, V> {
    /// Table bookkeeping.
    pub header: &'a Header,
    /// The dense values, `capacity` of them.
    pub values: MemoryView<'a, V>,
    /// The dense nodes, `capacity` of them.
    pub nodes: MemoryView<'a, Node<K>>,
    /// Bucket heads, stored as dense index plus one.
    pub buckets: MemoryView<'a, u32>,
}

/// Exclusive access to every part of a storage at once.
pub struct RegionsMut<'a, K, V> {
    /// Table bookkeeping.
    pub header: &'a mut Header,
    /// The dense values, `capacity` of them.
    pub values: MemoryViewMut<'a, V>,
    /// The dense nodes, `capacity` of them.
    pub nodes: MemoryViewMut<'a, Node<K>>,
    /// Bucket heads, stored as dense index plus one.
    pub buckets: MemoryViewMut<'a, u32>,
}

/// Where a table keeps its header, values, nodes and buckets.
///
/// # Safety
///
/// The table indexes the regions without bounds checks on its hot paths, so
/// implementations must uphold:
///
/// - `allocate` returns storage whose header equals `Header::new(layout)` and
///   whose value, node and bucket regions hold exactly `layout.values.count`,
///   `layout.nodes.count` and `layout.buckets.count` zero-filled items;
/// - the regions never overlap each other or the header;
/// - `regions` and `regions_mut` always describe that same memory.
pub unsafe trait Storage<K, V>: Sized {
    /// Allocator handle carried over when the table grows.
    type Allocator: Clone;

    /// Creates zero-filled storage shaped by `layout`.
    fn allocate(layout: TableLayout, allocator: Self::Allocator) -> Self;

    /// The allocator this storage was created with.
    fn allocator(&self) -> &Self::Allocator;

    /// The header describing this storage.
    fn header(&self) -> &Header;

    /// Views of all regions for reading.
    fn regions(&self) -> Regions<'_, K, V>;

    /// Views of all regions for writing.
    fn regions_mut(&mut self) -> RegionsMut<'_, K, V>;
}

/// A table stored in one raw allocation.
///
/// The [`Header`] lives at offset 0, followed by the value, node and bucket
/// regions at the offsets recorded in its [`TableLayout`]. Dropping the arena
/// releases the allocation.
pub struct Arena<K, V, A: RawAllocator = Global> {
    alloc: NonNull<u8>,
    allocator: A,
    _phantom: PhantomData<(K, V)>,
}

// SAFETY: The arena exclusively owns its allocation, like a `Box<[u8]>`
// holding `K` and `V` values.
unsafe impl<K: Send, V: Send, A: RawAllocator + Send> Send for Arena<K, V, A> {}
// SAFETY: Shared access only hands out shared views.
unsafe impl<K: Sync, V: Sync, A: RawAllocator + Sync> Sync for Arena<K, V, A> {}

impl<K, V, A: RawAllocator> Arena<K, V, A> {
    fn header_ptr(&self) -> NonNull<Header> {
        self.alloc.cast()
    }

    /// Base address of the allocation. The layout offsets are relative to it.
    pub fn as_ptr(&self) -> *const u8 {
        self.alloc.as_ptr()
    }

    /// Returns a region of the allocation as a typed pointer.
    ///
    /// # Safety
    ///
    /// `offset` must be one of the region offsets from this arena's layout,
    /// with `T` the item type of that region.
    unsafe fn region<T>(&self, offset: usize) -> NonNull<T> {
        // SAFETY: Forwarded from the caller; the offset lies inside the
        // allocation and is aligned for `T` by construction of the layout.
        unsafe { self.alloc.add(offset).cast() }
    }
}

// SAFETY: `allocate` zero-fills a block sized by `TableLayout`, writes the
// header at offset 0, and every view is built from the layout offsets and
// counts, which `TableLayout` keeps disjoint.
unsafe impl<K, V, A> Storage<K, V> for Arena<K, V, A>
where
    K: Zeroable,
    V: Zeroable,
    A: RawAllocator + Clone,
{
    type Allocator = A;

    fn allocate(layout: TableLayout, allocator: A) -> Self {
        let allocation = layout.allocation();
        let Some(alloc) = allocator.allocate(allocation) else {
            handle_alloc_error(allocation);
        };

        // SAFETY: The block is valid for `allocation.size()` bytes, and the
        // header region at offset 0 is aligned because the allocation's
        // alignment includes the header's.
        unsafe {
            core::ptr::write_bytes(alloc.as_ptr(), 0x0, allocation.size());
            alloc.cast::<Header>().write(Header::new(layout));
        }
        tracing::trace!(
            bytes = allocation.size(),
            capacity = layout.capacity(),
            "allocated table arena"
        );

        Self {
            alloc,
            allocator,
            _phantom: PhantomData,
        }
    }

    fn allocator(&self) -> &A {
        &self.allocator
    }

    fn header(&self) -> &Header {
        // SAFETY: The header was written at offset 0 during allocation.
        unsafe { self.header_ptr().as_ref() }
    }

    fn regions(&self) -> Regions<'_, K, V> {
        let layout = self.header().layout;
        // SAFETY: The offsets and counts come from this arena's layout, the
        // memory was zero-filled (a valid `K`, `V` and `u32` pattern) and the
        // regions are disjoint.
        unsafe {
            Regions {
                header: self.header(),
                values: MemoryView::from_raw_parts(
                    self.region(layout.values.offset),
                    layout.values.count,
                ),
                nodes: MemoryView::from_raw_parts(
                    self.region(layout.nodes.offset),
                    layout.nodes.count,
                ),
                buckets: MemoryView::from_raw_parts(
                    self.region(layout.buckets.offset),
                    layout.buckets.count,
                ),
            }
        }
    }

    fn regions_mut(&mut self) -> RegionsMut<'_, K, V> {
        let layout = self.header().layout;
        // SAFETY: As in `regions`; `&mut self` makes every view exclusive and
        // the header does not overlap any region.
        unsafe {
            RegionsMut {
                header: self.header_ptr().as_mut(),
                values: MemoryViewMut::from_raw_parts(
                    self.region(layout.values.offset),
                    layout.values.count,
                ),
                nodes: MemoryViewMut::from_raw_parts(
                    self.region(layout.nodes.offset),
                    layout.nodes.count,
                ),
                buckets: MemoryViewMut::from_raw_parts(
                    self.region(layout.buckets.offset),
                    layout.buckets.count,
                ),
            }
        }
    }
}

impl<K, V, A: RawAllocator> Drop for Arena<K, V, A> {
    fn drop(&mut self) {
        // SAFETY: The header is still valid, and `alloc` came from
        // `allocator.allocate` with exactly this layout.
        unsafe {
            let allocation = self.header_ptr().as_ref().layout.allocation();
            self.allocator.deallocate(self.alloc, allocation);
            tracing::trace!(bytes = allocation.size(), "released table arena");
        }
    }
}

/// A table stored in three vectors.
///
/// The layout is still computed and recorded in the header, but its offsets
/// describe a virtual arrangement; the regions live in separate heap blocks.
pub struct VecStorage<K, V> {
    header: Header,
    values: Vec<V>,
    nodes: Vec<Node<K>>,
    buckets: Vec<u32>,
}

fn zeroed_vec<T: Zeroable>(len: usize) -> Vec<T> {
    core::iter::repeat_with(T::zeroed).take(len).collect()
}

// SAFETY: Every vector is created with exactly the layout's count of zeroed
// items and never resized, and the header is a separate field.
unsafe impl<K: Zeroable, V: Zeroable> Storage<K, V> for VecStorage<K, V> {
    type Allocator = ();

    fn allocate(layout: TableLayout, _: ()) -> Self {
        Self {
            header: Header::new(layout),
            values: zeroed_vec(layout.values.count),
            nodes: zeroed_vec(layout.nodes.count),
            buckets: zeroed_vec(layout.buckets.count),
        }
    }

    fn allocator(&self) -> &() {
        &()
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn regions(&self) -> Regions<'_, K, V> {
        Regions {
            header: &self.header,
            values: MemoryView::from_slice(&self.values),
            nodes: MemoryView::from_slice(&self.nodes),
            buckets: MemoryView::from_slice(&self.buckets),
        }
    }

    fn regions_mut(&mut self) -> RegionsMut<'_, K, V> {
        RegionsMut {
            header: &mut self.header,
            values: MemoryViewMut::from_slice(&mut self.values),
            nodes: MemoryViewMut::from_slice(&mut self.nodes),
            buckets: MemoryViewMut::from_slice(&mut self.buckets),
        }
    }
}
