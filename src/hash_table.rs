//! The dense chained hash table.
//!
//! Values and nodes live in two index-aligned arrays that are always packed:
//! indices `0..len()` are live and nothing else is. Buckets hold the dense
//! index (plus one) of the newest entry that hashes to them, and each node
//! links to the previous entry of its bucket by index. Removal swaps the last
//! entry into the hole, so the value array can be handed out as one slice.
//!
//! `HashTable` works on precomputed hashes, the same way a raw table does;
//! [`DenseMap`](crate::DenseMap) adds a [`BuildHasher`](core::hash::BuildHasher)
//! on top.

use core::fmt::Debug;
use core::marker::PhantomData;

use bytemuck::Zeroable;

use crate::error::Error;
use crate::error::Result;
use crate::layout::Header;
use crate::layout::TableLayout;
use crate::memory_view::MemoryView;
use crate::memory_view::MemoryViewMut;
use crate::primes;
use crate::storage::Arena;
use crate::storage::RegionsMut;
use crate::storage::Storage;

/// Link value meaning "no entry".
pub const NONE: u32 = u32::MAX;

/// 2^64 divided by the golden ratio, rounded to odd.
const FIBONACCI: u64 = 0x9E37_79B9_7F4A_7C15;

/// Folds a 64-bit hash to the 31-bit hash code cached in each node.
#[inline(always)]
pub fn hash_code(hash: u64) -> u32 {
    ((hash ^ (hash >> 32)) as u32) & 0x7FFF_FFFF
}

/// Maps a hash code onto `0..n`.
///
/// Codes already below `n` are returned unchanged. Everything else goes
/// through Fibonacci hashing: a fixed-point multiply by 2^64/phi, keeping the
/// top 32 bits, then scaling those into `0..n` with another multiply and
/// shift.
///
/// # Examples
///
/// ```rust
/// use dense_hash::hash_table::reduce;
///
/// assert_eq!(reduce(5, 11), 5);
/// assert!(reduce(1_000_000, 11) < 11);
/// ```
#[inline(always)]
pub fn reduce(hash: u32, n: u32) -> u32 {
    if hash < n {
        return hash;
    }

    let fraction = FIBONACCI.wrapping_mul(hash as u64) >> 32;
    ((fraction * n as u64) >> 32) as u32
}

/// Per-entry chain bookkeeping, stored at the same dense index as the value.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Node<K> {
    key: K,
    hash: u32,
    prev: u32,
    next: u32,
}

// SAFETY: All fields are zeroable when `K` is.
unsafe impl<K: Zeroable> Zeroable for Node<K> {}

impl<K> Node<K> {
    /// The stored key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The cached 31-bit hash code.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Dense index of the next older entry in the same bucket.
    pub fn prev(&self) -> Option<usize> {
        (self.prev != NONE).then_some(self.prev as usize)
    }

    /// Dense index of the entry inserted right after this one in the same
    /// bucket.
    pub fn next(&self) -> Option<usize> {
        (self.next != NONE).then_some(self.next as usize)
    }
}

impl<K: Debug> Debug for Node<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct Link(u32);
        impl Debug for Link {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                if self.0 == NONE {
                    f.write_str("-")
                } else {
                    write!(f, "{}", self.0)
                }
            }
        }

        write!(
            f,
            "Node {{ key: {:?}, hash: {:#010x}, links: [{:?}|{:?}] }}",
            self.key,
            self.hash,
            Link(self.prev),
            Link(self.next)
        )
    }
}

/// Walks a bucket chain from `head` (a bucket value, index plus one) looking
/// for `key`. The walk is bounded by `count` steps.
#[inline]
fn search_chain<K: Eq>(
    nodes: MemoryView<'_, Node<K>>,
    head: u32,
    hash: u32,
    key: &K,
    count: usize,
) -> Option<usize> {
    let mut index = head.checked_sub(1)?;
    for _ in 0..count {
        debug_assert!((index as usize) < count);
        // SAFETY: Chain links only ever name live entries, which are below
        // `count <= nodes.len()`.
        let node = unsafe { nodes.get_unchecked(index as usize) };
        if node.hash == hash && node.key == *key {
            return Some(index as usize);
        }
        if node.prev == NONE {
            return None;
        }
        index = node.prev;
    }
    None
}

/// Copies the live bookkeeping, values and nodes of `src` into `dst`, which
/// must be at least as large. Buckets are left alone; they are rebuilt by
/// the caller.
fn transfer<K, V, B>(src: &B, dst: &mut B) -> Result<()>
where
    K: Copy,
    V: Copy,
    B: Storage<K, V>,
{
    let src = src.regions();
    let RegionsMut {
        header,
        mut values,
        mut nodes,
        ..
    } = dst.regions_mut();

    if header.layout.size() < src.header.layout.size() {
        return Err(Error::ShrinkNotSupported {
            current: src.header.layout.size(),
            requested: header.layout.size(),
        });
    }

    values.copy_from(0, src.values, 0, src.values.len())?;
    nodes.copy_from(0, src.nodes, 0, src.nodes.len())?;
    header.count = src.header.count;
    header.collisions = src.header.collisions;
    Ok(())
}

/// Debug statistics for hash table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries.
    pub populated: usize,
    /// Entries the table holds before growing.
    pub capacity: usize,
    /// Number of buckets.
    pub buckets: usize,
    /// Buckets with at least one entry.
    pub occupied_buckets: usize,
    /// Length of the longest bucket chain.
    pub longest_chain: usize,
    /// Chained insertions since the last remap.
    pub collisions: usize,
    /// Load factor (populated / capacity).
    pub load_factor: f64,
    /// Total bytes described by the table layout.
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Dense Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Buckets: {}/{} occupied, longest chain {}",
            self.occupied_buckets, self.buckets, self.longest_chain
        );
        println!("Collisions since last remap: {}", self.collisions);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// A hash table that keeps its values densely packed.
///
/// `HashTable<K, V, B>` maps keys to values given a hash supplied by the
/// caller on every operation. Keys and values are plain data (`Copy` and
/// [`Zeroable`]) so regions can be zero-filled and bulk-copied. The backing
/// storage `B` is an [`Arena`] by default: one allocation holding the header,
/// values, nodes and buckets.
///
/// Live values are always `values()[..len()]`, in insertion order except
/// where a removal moved the last entry into the removed slot.
///
/// ## Example
///
/// ```rust
/// use dense_hash::HashTable;
///
/// let mut table: HashTable<u32, f32> = HashTable::with_capacity(4).unwrap();
/// table.add(7, 7, 1.5).unwrap();
/// table.set(9, 9, 2.5);
///
/// assert_eq!(table.get(7, &7), Ok(&1.5));
/// assert_eq!(table.values(), &[1.5, 2.5]);
/// ```
pub struct HashTable<K, V, B = Arena<K, V>> {
    storage: B,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V, B> HashTable<K, V, B>
where
    K: Copy + Eq + Zeroable,
    V: Copy + Zeroable,
    B: Storage<K, V>,
    B::Allocator: Default,
{
    /// Creates a table able to hold `capacity` entries before it grows.
    ///
    /// A capacity of zero is treated as one.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `capacity` cannot be represented.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_in(capacity, B::Allocator::default())
    }
}

impl<K, V, B> HashTable<K, V, B>
where
    K: Copy + Eq + Zeroable,
    V: Copy + Zeroable,
    B: Storage<K, V>,
{
    /// Creates a table with the given capacity whose storage uses
    /// `allocator`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `capacity` cannot be represented.
    pub fn with_capacity_in(capacity: usize, allocator: B::Allocator) -> Result<Self> {
        let layout = TableLayout::compute::<K, V>(capacity.max(1))?;
        Ok(Self {
            storage: B::allocate(layout, allocator),
            _phantom: PhantomData,
        })
    }

    fn header(&self) -> &Header {
        self.storage.header()
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.header().count
    }

    /// Returns `true` if the table holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries the current allocation holds. The table grows as
    /// soon as `len()` reaches it.
    pub fn capacity(&self) -> usize {
        self.header().capacity
    }

    /// Chained insertions since the last remap.
    pub fn collisions(&self) -> usize {
        self.header().collisions
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.header().layout.buckets.count
    }

    /// The byte layout of the current allocation.
    ///
    /// Offsets stay valid until the next operation that can grow the table.
    pub fn layout(&self) -> &TableLayout {
        &self.header().layout
    }

    /// Finds the dense index of `key`.
    ///
    /// The index stays valid until the next removal or growth, and can be
    /// used with [`value_at`](Self::value_at) and
    /// [`value_at_mut`](Self::value_at_mut).
    pub fn find_index(&self, hash: u64, key: &K) -> Option<usize> {
        let hash = hash_code(hash);
        let regions = self.storage.regions();
        let bucket = reduce(hash, regions.buckets.len() as u32) as usize;
        // SAFETY: `reduce` returns a value below the bucket count.
        let head = unsafe { *regions.buckets.get_unchecked(bucket) };
        search_chain(regions.nodes, head, hash, key, regions.header.count)
    }

    /// Returns `true` if the table contains `key`.
    pub fn contains_key(&self, hash: u64, key: &K) -> bool {
        self.find_index(hash, key).is_some()
    }

    /// Returns the value stored for `key`, if any.
    pub fn try_get(&self, hash: u64, key: &K) -> Option<&V> {
        let index = self.find_index(hash, key)?;
        // SAFETY: `find_index` only returns live indices.
        Some(unsafe { self.storage.regions().values.get_unchecked(index) })
    }

    /// Returns a mutable reference to the value stored for `key`, if any.
    pub fn try_get_mut(&mut self, hash: u64, key: &K) -> Option<&mut V> {
        let index = self.find_index(hash, key)?;
        Some(&mut self.storage.regions_mut().values.into_mut_slice()[index])
    }

    /// Returns the value stored for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if the key is absent.
    pub fn get(&self, hash: u64, key: &K) -> Result<&V> {
        self.try_get(hash, key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value stored for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if the key is absent.
    pub fn get_mut(&mut self, hash: u64, key: &K) -> Result<&mut V> {
        self.try_get_mut(hash, key).ok_or(Error::KeyNotFound)
    }

    /// Inserts `key` with `value`, failing if the key is already present.
    ///
    /// # Errors
    ///
    /// [`Error::KeyAlreadyExists`] if the key is present. The table is left
    /// untouched in that case.
    pub fn add(&mut self, hash: u64, key: K, value: V) -> Result<()> {
        self.insert(hash, key, value, false).map(|_| ())
    }

    /// Inserts `key` with `value`, overwriting any existing value in place.
    ///
    /// Returns the previous value if the key was present.
    pub fn set(&mut self, hash: u64, key: K, value: V) -> Option<V> {
        match self.insert(hash, key, value, true) {
            Ok(previous) => previous,
            Err(err) => unreachable!("overwriting insert failed: {err}"),
        }
    }

    /// Fails with [`Error::KeyAlreadyExists`] only when `overwrite` is false
    /// and the key is present.
    fn insert(&mut self, hash: u64, key: K, value: V, overwrite: bool) -> Result<Option<V>> {
        let hash = hash_code(hash);
        let RegionsMut {
            header,
            mut values,
            mut nodes,
            mut buckets,
        } = self.storage.regions_mut();

        let index = header.count;
        let bucket = reduce(hash, buckets.len() as u32) as usize;
        // SAFETY: `reduce` returns a value below the bucket count.
        let head = unsafe { *buckets.get_unchecked(bucket) };

        let mut prev = NONE;
        if head != 0 {
            if let Some(existing) = search_chain(nodes.as_view(), head, hash, &key, index) {
                if !overwrite {
                    return Err(Error::KeyAlreadyExists);
                }
                // SAFETY: `search_chain` only returns live indices.
                let slot = unsafe { values.get_unchecked_mut(existing) };
                return Ok(Some(core::mem::replace(slot, value)));
            }

            prev = head - 1;
            // SAFETY: Bucket heads always name live entries.
            unsafe { nodes.get_unchecked_mut(prev as usize).next = index as u32 };
            header.collisions += 1;
        }

        // SAFETY: `count < capacity` holds between operations because the
        // table grows as soon as it fills.
        unsafe {
            nodes.set_unchecked(
                index,
                Node {
                    key,
                    hash,
                    prev,
                    next: NONE,
                },
            );
            values.set_unchecked(index, value);
            buckets.set_unchecked(bucket, index as u32 + 1);
        }
        header.count += 1;

        if header.count == header.capacity || header.collisions > buckets.len() {
            self.remap_collisions();
        }
        Ok(None)
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// To keep the values packed, the last live entry is moved into the
    /// removed slot, so the dense index of that entry changes.
    pub fn remove(&mut self, hash: u64, key: &K) -> Option<V> {
        let hash = hash_code(hash);
        let RegionsMut {
            header,
            mut values,
            mut nodes,
            mut buckets,
        } = self.storage.regions_mut();

        let count = header.count;
        let bucket_count = buckets.len() as u32;
        let bucket = reduce(hash, bucket_count) as usize;
        // SAFETY: `reduce` returns a value below the bucket count.
        let head = unsafe { *buckets.get_unchecked(bucket) };
        let index = search_chain(nodes.as_view(), head, hash, key, count)?;

        // SAFETY: Every index touched below is either `index`, `count - 1`,
        // a chain link of a live node or a reduced bucket, all in bounds.
        unsafe {
            let removed = *nodes.get_unchecked(index);
            if head as usize - 1 == index {
                buckets.set_unchecked(bucket, removed.prev.wrapping_add(1));
            }
            if removed.next != NONE {
                nodes.get_unchecked_mut(removed.next as usize).prev = removed.prev;
            }
            if removed.prev != NONE {
                nodes.get_unchecked_mut(removed.prev as usize).next = removed.next;
            }

            let value = *values.get_unchecked(index);
            let last = count - 1;
            header.count = last;

            if index != last {
                let moved = *nodes.get_unchecked(last);
                let moved_bucket = reduce(moved.hash, bucket_count) as usize;
                let moved_head = buckets.get_unchecked_mut(moved_bucket);
                if *moved_head as usize == last + 1 {
                    *moved_head = index as u32 + 1;
                }
                if moved.next != NONE {
                    nodes.get_unchecked_mut(moved.next as usize).prev = index as u32;
                }
                if moved.prev != NONE {
                    nodes.get_unchecked_mut(moved.prev as usize).next = index as u32;
                }

                nodes.set_unchecked(index, moved);
                let moved_value = *values.get_unchecked(last);
                values.set_unchecked(index, moved_value);
            }

            Some(value)
        }
    }

    /// Removes every entry. The allocation and capacity are kept.
    pub fn clear(&mut self) {
        let RegionsMut {
            header,
            mut values,
            mut nodes,
            mut buckets,
        } = self.storage.regions_mut();
        if header.count == 0 && header.collisions == 0 {
            return;
        }

        buckets.clear();
        values.clear();
        nodes.clear();
        header.count = 0;
        header.collisions = 0;
        tracing::debug!(capacity = header.capacity, "cleared table");
    }

    /// Grows the table to hold at least `capacity` entries.
    ///
    /// Does nothing if `capacity` is not larger than the current capacity.
    /// Otherwise a new allocation is made, values and nodes are copied to
    /// their new offsets, the old allocation is released and the bucket
    /// chains are rebuilt for the new bucket count.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `capacity` cannot be represented. The
    /// table is unchanged in that case.
    pub fn expand(&mut self, capacity: usize) -> Result<()> {
        if self.grow(capacity)? {
            self.relink();
            tracing::debug!(
                capacity = self.capacity(),
                buckets = self.bucket_count(),
                "expanded table"
            );
        }
        Ok(())
    }

    /// Moves values and nodes into a larger allocation. Bucket contents are
    /// not carried over; the caller must relink.
    fn grow(&mut self, capacity: usize) -> Result<bool> {
        if capacity <= self.capacity() {
            return Ok(false);
        }

        let layout = TableLayout::compute::<K, V>(capacity)?;
        let mut storage = B::allocate(layout, self.storage.allocator().clone());
        transfer(&self.storage, &mut storage)?;
        self.storage = storage;
        Ok(true)
    }

    /// Rebuilds every bucket chain from the live nodes, in dense order.
    fn relink(&mut self) {
        let RegionsMut {
            header,
            mut nodes,
            mut buckets,
            ..
        } = self.storage.regions_mut();

        buckets.clear();
        header.collisions = 0;
        let bucket_count = buckets.len() as u32;

        for index in 0..header.count {
            // SAFETY: `index < count <= capacity`, the bucket comes from
            // `reduce`, and a nonzero head names an entry relinked earlier in
            // this loop.
            unsafe {
                let hash = nodes.get_unchecked(index).hash;
                let slot = buckets.get_unchecked_mut(reduce(hash, bucket_count) as usize);
                let head = core::mem::replace(slot, index as u32 + 1);

                let node = nodes.get_unchecked_mut(index);
                node.next = NONE;
                node.prev = head.wrapping_sub(1);

                if head != 0 {
                    header.collisions += 1;
                    nodes.get_unchecked_mut(head as usize - 1).next = index as u32;
                }
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn remap_collisions(&mut self) {
        let old_capacity = self.capacity();
        let collisions = self.collisions();
        let capacity = primes::expand(old_capacity).expect("capacity overflow");
        self.grow(capacity).expect("capacity overflow");
        self.relink();

        tracing::debug!(
            old_capacity,
            capacity,
            buckets = self.bucket_count(),
            collisions_before = collisions,
            collisions_after = self.collisions(),
            "remapped bucket chains"
        );
    }

    /// The live values, in dense order.
    ///
    /// This is the export surface: `values().len() == len()` and the slice
    /// can be bulk-copied directly.
    pub fn values(&self) -> &[V] {
        &self.storage.regions().values.as_slice()[..self.len()]
    }

    /// The live values, mutably, in dense order.
    pub fn values_mut(&mut self) -> &mut [V] {
        let len = self.len();
        &mut self.storage.regions_mut().values.into_mut_slice()[..len]
    }

    /// A typed view over the live values.
    pub fn values_view(&self) -> MemoryView<'_, V> {
        MemoryView::from_slice(self.values())
    }

    /// Copies the live values into the front of `dst`, returning how many
    /// were copied.
    ///
    /// # Errors
    ///
    /// [`Error::CopyOutOfRange`] on the destination side if `dst` is shorter
    /// than `len()`.
    pub fn copy_values_to(&self, dst: &mut [V]) -> Result<usize> {
        let values = self.values_view();
        MemoryViewMut::from_slice(dst).copy_from(0, values, 0, values.len())?;
        Ok(values.len())
    }

    /// The value at a dense index.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index >= len()`.
    pub fn value_at(&self, index: usize) -> Result<&V> {
        self.values_view().get_ref(index)
    }

    /// The value at a dense index, mutably.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index >= len()`.
    pub fn value_at_mut(&mut self, index: usize) -> Result<&mut V> {
        let len = self.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        Ok(&mut self.values_mut()[index])
    }

    /// The key at a dense index.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index >= len()`.
    pub fn key_at(&self, index: usize) -> Result<&K> {
        self.nodes().get_ref(index).map(Node::key)
    }

    fn nodes(&self) -> MemoryView<'_, Node<K>> {
        MemoryView::from_slice(&self.storage.regions().nodes.as_slice()[..self.len()])
    }

    /// Iterates over `(key, value)` pairs in dense order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: self.nodes().iter(),
            values: self.values().iter(),
        }
    }

    /// Iterates over keys in dense order.
    pub fn keys(&self) -> Keys<'_, K> {
        Keys {
            nodes: self.nodes().iter(),
        }
    }

    /// Releases the allocation.
    ///
    /// Dropping the table does the same; this only makes the release explicit
    /// at the call site.
    pub fn dispose(self) {
        tracing::debug!(
            capacity = self.capacity(),
            bytes = self.layout().size(),
            "disposing table"
        );
        drop(self);
    }

    /// Returns debug statistics about the table's bucket chains.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let regions = self.storage.regions();
        let mut occupied_buckets = 0;
        let mut longest_chain = 0;

        for &head in regions.buckets.iter() {
            if head == 0 {
                continue;
            }
            occupied_buckets += 1;

            let mut length = 0;
            let mut index = head - 1;
            loop {
                length += 1;
                // SAFETY: Chain links only name live entries.
                let node = unsafe { regions.nodes.get_unchecked(index as usize) };
                if node.prev == NONE || length > self.len() {
                    break;
                }
                index = node.prev;
            }
            longest_chain = longest_chain.max(length);
        }

        DebugStats {
            populated: self.len(),
            capacity: self.capacity(),
            buckets: self.bucket_count(),
            occupied_buckets,
            longest_chain,
            collisions: self.collisions(),
            load_factor: self.len() as f64 / self.capacity() as f64,
            total_bytes: self.layout().size(),
        }
    }

    /// Verifies every structural invariant, panicking with the table dump on
    /// the first violation.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self)
    where
        K: Debug,
        V: Debug,
    {
        let regions = self.storage.regions();
        let count = regions.header.count;
        let bucket_count = regions.buckets.len() as u32;
        assert!(count < regions.header.capacity, "{self:#?}");
        assert_eq!(regions.values.len(), regions.header.capacity);
        assert_eq!(regions.nodes.len(), regions.header.capacity);

        let mut seen = alloc::vec![false; count];
        for (bucket, &head) in regions.buckets.iter().enumerate() {
            if head == 0 {
                continue;
            }
            let mut index = head as usize - 1;
            let mut newer = NONE;
            assert!(index < count, "bucket {bucket} points past count: {self:#?}");
            loop {
                let node = regions.nodes.get(index).unwrap();
                assert!(!seen[index], "entry {index} reached twice: {self:#?}");
                seen[index] = true;
                assert_eq!(reduce(node.hash, bucket_count) as usize, bucket);
                assert_eq!(node.next, newer, "broken next link at {index}: {self:#?}");
                if node.prev == NONE {
                    break;
                }
                newer = index as u32;
                index = node.prev as usize;
                assert!(index < count, "{self:#?}");
            }
        }
        assert!(seen.iter().all(|&s| s), "unreachable entries: {self:#?}");
    }
}

impl<K, V, B> Clone for HashTable<K, V, B>
where
    K: Copy + Eq + Zeroable,
    V: Copy + Zeroable,
    B: Storage<K, V>,
{
    fn clone(&self) -> Self {
        let src = self.storage.regions();
        let mut storage = B::allocate(*self.layout(), self.storage.allocator().clone());

        let dst = storage.regions_mut();
        dst.values.into_mut_slice().copy_from_slice(src.values.as_slice());
        dst.nodes.into_mut_slice().copy_from_slice(src.nodes.as_slice());
        dst.buckets.into_mut_slice().copy_from_slice(src.buckets.as_slice());
        dst.header.count = src.header.count;
        dst.header.collisions = src.header.collisions;

        Self {
            storage,
            _phantom: PhantomData,
        }
    }
}

impl<K, V, B> Debug for HashTable<K, V, B>
where
    K: Debug,
    V: Debug,
    B: Storage<K, V>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let regions = self.storage.regions();
        let count = regions.header.count;
        f.debug_struct("HashTable")
            .field("header", regions.header)
            .field("values", &&regions.values.as_slice()[..count])
            .field("nodes", &&regions.nodes.as_slice()[..count])
            .field("buckets", &regions.buckets)
            .finish()
    }
}

/// Iterator over `(key, value)` pairs of a [`HashTable`], in dense order.
pub struct Iter<'a, K, V> {
    nodes: core::slice::Iter<'a, Node<K>>,
    values: core::slice::Iter<'a, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        Some((&self.nodes.next()?.key, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over the keys of a [`HashTable`], in dense order.
pub struct Keys<'a, K> {
    nodes: core::slice::Iter<'a, Node<K>>,
}

impl<'a, K> Iterator for Keys<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.next().map(Node::key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<K> ExactSizeIterator for Keys<'_, K> {}
