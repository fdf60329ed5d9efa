//! A key-hashing map over the dense table.
//!
//! [`DenseMap`] wraps a [`HashTable`] and hashes keys with a configurable
//! [`BuildHasher`], so callers never supply hashes themselves.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::ops::Index;

use bytemuck::Zeroable;

use crate::error::Result;
use crate::hash_table::HashTable;
use crate::hash_table::Iter;
use crate::hash_table::Keys;
use crate::layout::TableLayout;
use crate::memory_view::MemoryView;
use crate::storage::Arena;
use crate::storage::Storage;
use crate::storage::VecStorage;

/// A hash map with densely packed values, using the [`HashTable`] as the
/// underlying storage.
///
/// `DenseMap<K, V, S, B>` stores plain-data key-value pairs and uses a
/// configurable hasher builder `S` to hash keys. Live values always form one
/// contiguous slice, available through [`export_values`](Self::export_values),
/// so the whole set can be iterated or bulk-copied without touching keys.
///
/// # Performance Characteristics
///
/// - **Memory**: one allocation holding `capacity` values, `capacity` nodes
///   (key, cached hash code and two `u32` links each) and a prime number of
///   `u32` buckets
/// - **Removal**: swaps the last entry into the hole, so indices returned by
///   [`find_index`](Self::find_index) are only valid until the next removal
pub struct DenseMap<K, V, S, B = Arena<K, V>> {
    table: HashTable<K, V, B>,
    hash_builder: S,
}

/// A [`DenseMap`] backed by three growable vectors instead of one raw
/// allocation.
pub type VecDenseMap<K, V, S> = DenseMap<K, V, S, VecStorage<K, V>>;

impl<K, V, S, B> Debug for DenseMap<K, V, S, B>
where
    K: Debug + Copy + Eq + Zeroable,
    V: Debug + Copy + Zeroable,
    B: Storage<K, V>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.table.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S, B> Clone for DenseMap<K, V, S, B>
where
    K: Copy + Eq + Zeroable,
    V: Copy + Zeroable,
    S: Clone,
    B: Storage<K, V>,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<K, V, S, B> DenseMap<K, V, S, B>
where
    K: Copy + Hash + Eq + Zeroable,
    V: Copy + Zeroable,
    S: BuildHasher,
    B: Storage<K, V>,
    B::Allocator: Default,
{
    /// Creates a new map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::DenseMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: DenseMap<i32, f64, _> = DenseMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(1, hash_builder).expect("allocation size overflow")
    }

    /// Creates a new map able to hold `capacity` entries before growing.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// `capacity` is larger than [`MAX_PRIME`](crate::primes::MAX_PRIME).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::DenseMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: DenseMap<i32, f64, _> =
    ///     DenseMap::with_capacity_and_hasher(100, SimpleHasher).unwrap();
    /// assert_eq!(map.capacity(), 100);
    /// assert_eq!(map.bucket_count(), 107);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Result<Self> {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, B::Allocator::default())
    }
}

impl<K, V, S, B> DenseMap<K, V, S, B>
where
    K: Copy + Hash + Eq + Zeroable,
    V: Copy + Zeroable,
    S: BuildHasher,
    B: Storage<K, V>,
{
    /// Creates a new map whose storage uses `allocator`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// `capacity` is larger than [`MAX_PRIME`](crate::primes::MAX_PRIME).
    pub fn with_capacity_and_hasher_in(
        capacity: usize,
        hash_builder: S,
        allocator: B::Allocator,
    ) -> Result<Self> {
        Ok(Self {
            table: HashTable::with_capacity_in(capacity, allocator)?,
            hash_builder,
        })
    }

    #[inline(always)]
    fn hash(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of entries the map holds before growing.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Returns the number of chained insertions since the last remap.
    pub fn collisions(&self) -> usize {
        self.table.collisions()
    }

    /// Returns the byte layout of the current allocation.
    pub fn layout(&self) -> &TableLayout {
        self.table.layout()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Inserts a key-value pair, failing if the key is already present.
    ///
    /// # Errors
    ///
    /// [`Error::KeyAlreadyExists`](crate::Error::KeyAlreadyExists) if the key
    /// is present; the existing value is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::DenseMap;
    /// # use dense_hash::Error;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map: DenseMap<u32, i32, _> = DenseMap::with_hasher(SimpleHasher);
    /// map.add(7, 1).unwrap();
    /// assert_eq!(map.add(7, 2), Err(Error::KeyAlreadyExists));
    /// assert_eq!(map[&7], 1);
    /// ```
    pub fn add(&mut self, key: K, value: V) -> Result<()> {
        let hash = self.hash(&key);
        self.table.add(hash, key, value)
    }

    /// Inserts a key-value pair, overwriting the value of an existing key.
    ///
    /// Returns the previous value if the key was present. An overwrite keeps
    /// the entry at its dense index.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash(&key);
        self.table.set(hash, key, value)
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`](crate::Error::KeyNotFound) if the key is absent.
    pub fn get(&self, key: &K) -> Result<&V> {
        self.table.get(self.hash(key), key)
    }

    /// Returns a mutable reference to the value for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`](crate::Error::KeyNotFound) if the key is absent.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        let hash = self.hash(key);
        self.table.get_mut(hash, key)
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn try_get(&self, key: &K) -> Option<&V> {
        self.table.try_get(self.hash(key), key)
    }

    /// Returns a mutable reference to the value for `key`, if present.
    pub fn try_get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash(key);
        self.table.try_get_mut(hash, key)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.contains_key(self.hash(key), key)
    }

    /// Returns the dense index of `key`, valid until the next removal or
    /// growth.
    pub fn find_index(&self, key: &K) -> Option<usize> {
        self.table.find_index(self.hash(key), key)
    }

    /// Returns the value at a dense index.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange) if
    /// `index >= len()`.
    pub fn value_at(&self, index: usize) -> Result<&V> {
        self.table.value_at(index)
    }

    /// Returns the value at a dense index, mutably.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange) if
    /// `index >= len()`.
    pub fn value_at_mut(&mut self, index: usize) -> Result<&mut V> {
        self.table.value_at_mut(index)
    }

    /// Returns the key at a dense index.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange) if
    /// `index >= len()`.
    pub fn key_at(&self, index: usize) -> Result<&K> {
        self.table.key_at(index)
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.take(key).is_some()
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// The last entry moves into the freed dense index.
    pub fn take(&mut self, key: &K) -> Option<V> {
        let hash = self.hash(key);
        self.table.remove(hash, key)
    }

    /// Removes every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Grows the map to hold at least `capacity` entries. Smaller or equal
    /// capacities are ignored.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// `capacity` is larger than [`MAX_PRIME`](crate::primes::MAX_PRIME).
    pub fn expand(&mut self, capacity: usize) -> Result<()> {
        self.table.expand(capacity)
    }

    /// Returns the live values as one contiguous slice, `len()` long.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::DenseMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map: DenseMap<u32, f32, _> = DenseMap::with_hasher(SimpleHasher);
    /// map.set(1, 0.5);
    /// map.set(2, 1.5);
    /// map.set(3, 2.5);
    /// map.remove(&1);
    ///
    /// let total: f32 = map.export_values().iter().sum();
    /// assert_eq!(total, 4.0);
    /// assert_eq!(map.export_values().len(), map.len());
    /// ```
    pub fn export_values(&self) -> &[V] {
        self.table.values()
    }

    /// Returns the live values as one mutable slice.
    pub fn values_mut(&mut self) -> &mut [V] {
        self.table.values_mut()
    }

    /// Returns a typed view over the live values.
    pub fn values_view(&self) -> MemoryView<'_, V> {
        self.table.values_view()
    }

    /// Copies the live values into the front of `dst`, returning how many
    /// were copied.
    ///
    /// # Errors
    ///
    /// [`Error::CopyOutOfRange`](crate::Error::CopyOutOfRange) if `dst` is
    /// shorter than `len()`.
    pub fn copy_values_to(&self, dst: &mut [V]) -> Result<usize> {
        self.table.copy_values_to(dst)
    }

    /// Returns an iterator over `(key, value)` pairs in dense order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }

    /// Returns an iterator over keys in dense order.
    pub fn keys(&self) -> Keys<'_, K> {
        self.table.keys()
    }

    /// Returns an iterator over values in dense order.
    pub fn values(&self) -> core::slice::Iter<'_, V> {
        self.table.values().iter()
    }

    /// Releases the map's allocation.
    pub fn dispose(self) {
        self.table.dispose();
    }

    /// Returns debug statistics about the underlying table.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<K, V, S, B> DenseMap<K, V, S, B>
where
    K: Copy + Hash + Eq + Zeroable,
    V: Copy + Zeroable,
    S: BuildHasher + Default,
    B: Storage<K, V>,
    B::Allocator: Default,
{
    /// Creates a new map using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::DenseMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: DenseMap<i32, u8, SimpleHasher> = DenseMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 1);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new map with the specified capacity using the default
    /// hasher builder.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// `capacity` is larger than [`MAX_PRIME`](crate::primes::MAX_PRIME).
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S, B> Default for DenseMap<K, V, S, B>
where
    K: Copy + Hash + Eq + Zeroable,
    V: Copy + Zeroable,
    S: BuildHasher + Default,
    B: Storage<K, V>,
    B::Allocator: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, B> Index<&K> for DenseMap<K, V, S, B>
where
    K: Copy + Hash + Eq + Zeroable,
    V: Copy + Zeroable,
    S: BuildHasher,
    B: Storage<K, V>,
{
    type Output = V;

    /// Returns a reference to the value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &K) -> &V {
        self.try_get(key).expect("key not found")
    }
}

impl<K, V, S, B> Extend<(K, V)> for DenseMap<K, V, S, B>
where
    K: Copy + Hash + Eq + Zeroable,
    V: Copy + Zeroable,
    S: BuildHasher,
    B: Storage<K, V>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V, S, B> FromIterator<(K, V)> for DenseMap<K, V, S, B>
where
    K: Copy + Hash + Eq + Zeroable,
    V: Copy + Zeroable,
    S: BuildHasher + Default,
    B: Storage<K, V>,
    B::Allocator: Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}
