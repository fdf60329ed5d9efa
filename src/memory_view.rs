//! Typed, bounds-checkable windows over contiguous memory.
//!
//! A view is a base pointer, an element size (`size_of::<T>()`) and a length.
//! Views are how the table reads and writes its value, node and bucket
//! regions, whether those regions live inside one raw allocation or in
//! separate vectors.
//!
//! Every accessor comes in two modes. The checked accessors (`get`, `set`,
//! `get_mut`, ...) validate `0 <= index < len` and return
//! [`Error::IndexOutOfRange`] otherwise. The unchecked accessors skip
//! validation for hot paths whose indices were already validated by the
//! caller.

use core::fmt::Debug;
use core::marker::PhantomData;
use core::ptr::NonNull;

use bytemuck::Zeroable;

use crate::error::CopySide;
use crate::error::Error;
use crate::error::Result;

#[inline(always)]
fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { index, len })
    }
}

#[inline(always)]
fn check_range(side: CopySide, index: usize, length: usize, len: usize) -> Result<()> {
    match index.checked_add(length) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::CopyOutOfRange {
            side,
            index,
            length,
            len,
        }),
    }
}

fn index_of_address<T>(base: NonNull<T>, len: usize, address: *const T) -> Result<usize> {
    let item_size = size_of::<T>();
    if item_size == 0 {
        return Err(Error::InvalidArgument(
            "zero-sized elements have no distinct addresses",
        ));
    }

    let Some(offset) = (address as usize).checked_sub(base.as_ptr() as usize) else {
        return Err(Error::InvalidArgument("address precedes the view"));
    };
    if offset % item_size != 0 {
        return Err(Error::InvalidArgument(
            "address is not aligned to an element boundary",
        ));
    }

    let index = offset / item_size;
    check_index(index, len)?;
    Ok(index)
}

/// A shared, read-only view of `len` elements of type `T`.
///
/// Behaves like `&'a [T]` with checked and unchecked element access and
/// address resolution.
pub struct MemoryView<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<&'a [T]>,
}

// SAFETY: A `MemoryView` only hands out shared access, exactly like `&[T]`.
unsafe impl<T: Sync> Send for MemoryView<'_, T> {}
// SAFETY: See above.
unsafe impl<T: Sync> Sync for MemoryView<'_, T> {}

impl<T> Clone for MemoryView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MemoryView<'_, T> {}

impl<T: Debug> Debug for MemoryView<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<'a, T> MemoryView<'a, T> {
    /// Creates a view over an existing slice.
    pub fn from_slice(slice: &'a [T]) -> Self {
        Self {
            ptr: NonNull::from(slice).cast(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// Creates a view over `len` elements starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be aligned for `T` and valid for reads of `len` initialized
    /// elements for `'a`, and nothing may mutate that memory during `'a`.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> Self {
        Self {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    /// Number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of a single element in bytes.
    #[inline]
    pub fn item_size(&self) -> usize {
        size_of::<T>()
    }

    /// Base address of the view.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns a copy of the element at `index`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_hash::memory_view::MemoryView;
    ///
    /// let data = [1u32, 2, 3];
    /// let view = MemoryView::from_slice(&data);
    /// assert_eq!(view.get(1).unwrap(), 2);
    /// assert!(view.get(3).is_err());
    /// ```
    #[inline]
    pub fn get(&self, index: usize) -> Result<T>
    where
        T: Copy,
    {
        self.get_ref(index).copied()
    }

    /// Returns a reference to the element at `index`.
    #[inline]
    pub fn get_ref(&self, index: usize) -> Result<&'a T> {
        check_index(index, self.len)?;
        // SAFETY: Index validated above.
        Ok(unsafe { self.get_unchecked(index) })
    }

    /// Returns a reference to the element at `index` without bounds checks.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &'a T {
        debug_assert!(index < self.len);
        // SAFETY: Caller guarantees `index < len`, and the view is valid for
        // `len` elements.
        unsafe { &*self.ptr.as_ptr().add(index) }
    }

    /// The whole view as a slice.
    #[inline]
    pub fn as_slice(&self) -> &'a [T] {
        // SAFETY: The view is valid for `len` initialized elements for `'a`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Iterates over the elements in index order.
    pub fn iter(&self) -> core::slice::Iter<'a, T> {
        self.as_slice().iter()
    }

    /// Resolves an element address back to its index.
    ///
    /// Fails with [`Error::IndexOutOfRange`] for addresses past the end of the
    /// view and [`Error::InvalidArgument`] for addresses before it or between
    /// elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_hash::memory_view::MemoryView;
    ///
    /// let data = [10u64, 20, 30];
    /// let view = MemoryView::from_slice(&data);
    /// assert_eq!(view.index_of(&data[2]).unwrap(), 2);
    /// ```
    pub fn index_of(&self, address: *const T) -> Result<usize> {
        index_of_address(self.ptr, self.len, address)
    }

    /// Copies `dst.len()` elements starting at `src_index` into `dst`.
    pub fn copy_to_slice(&self, src_index: usize, dst: &mut [T]) -> Result<()>
    where
        T: Copy,
    {
        check_range(CopySide::Source, src_index, dst.len(), self.len)?;
        dst.copy_from_slice(&self.as_slice()[src_index..src_index + dst.len()]);
        Ok(())
    }

    /// Copies the first `length` elements into a new vector.
    pub fn to_vec(&self, length: usize) -> Result<alloc::vec::Vec<T>>
    where
        T: Copy,
    {
        check_range(CopySide::Source, 0, length, self.len)?;
        Ok(self.as_slice()[..length].to_vec())
    }
}

/// An exclusive, writable view of `len` elements of type `T`.
///
/// Behaves like `&'a mut [T]`. Besides element access it supports zero-fill
/// and bulk copies from other views or slices.
pub struct MemoryViewMut<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: Same rules as `&mut [T]`.
unsafe impl<T: Send> Send for MemoryViewMut<'_, T> {}
// SAFETY: Same rules as `&mut [T]`.
unsafe impl<T: Sync> Sync for MemoryViewMut<'_, T> {}

impl<T: Debug> Debug for MemoryViewMut<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<'a, T> MemoryViewMut<'a, T> {
    /// Creates a view over an existing mutable slice.
    pub fn from_slice(slice: &'a mut [T]) -> Self {
        let len = slice.len();
        Self {
            ptr: NonNull::from(slice).cast(),
            len,
            _marker: PhantomData,
        }
    }

    /// Creates a view over `len` elements starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be aligned for `T` and valid for reads and writes of `len`
    /// initialized elements for `'a`, and no other reference may access that
    /// memory during `'a`.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> Self {
        Self {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    /// Reborrows as a shared view.
    #[inline]
    pub fn as_view(&self) -> MemoryView<'_, T> {
        // SAFETY: `self` is borrowed shared for the lifetime of the result.
        unsafe { MemoryView::from_raw_parts(self.ptr, self.len) }
    }

    /// Reborrows as a shorter-lived exclusive view.
    #[inline]
    pub fn reborrow(&mut self) -> MemoryViewMut<'_, T> {
        // SAFETY: `self` is borrowed exclusively for the lifetime of the result.
        unsafe { MemoryViewMut::from_raw_parts(self.ptr, self.len) }
    }

    /// Number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of a single element in bytes.
    #[inline]
    pub fn item_size(&self) -> usize {
        size_of::<T>()
    }

    /// Base address of the view.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Base address of the view, for writing.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns a copy of the element at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Result<T>
    where
        T: Copy,
    {
        self.as_view().get(index)
    }

    /// Returns a mutable reference to the element at `index`, for in-place
    /// updates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_hash::memory_view::MemoryViewMut;
    ///
    /// let mut data = [1u32, 2, 3];
    /// let mut view = MemoryViewMut::from_slice(&mut data);
    /// *view.get_mut(0).unwrap() += 10;
    /// assert_eq!(data[0], 11);
    /// ```
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        check_index(index, self.len)?;
        // SAFETY: Index validated above.
        Ok(unsafe { self.get_unchecked_mut(index) })
    }

    /// Overwrites the element at `index`.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Returns a reference to the element at `index` without bounds checks.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        // SAFETY: Caller guarantees `index < len`.
        unsafe { &*self.ptr.as_ptr().add(index) }
    }

    /// Returns a mutable reference to the element at `index` without bounds
    /// checks.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        // SAFETY: Caller guarantees `index < len`.
        unsafe { &mut *self.ptr.as_ptr().add(index) }
    }

    /// Overwrites the element at `index` without bounds checks.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    #[inline(always)]
    pub unsafe fn set_unchecked(&mut self, index: usize, value: T) {
        // SAFETY: Forwarded from the caller.
        unsafe { *self.get_unchecked_mut(index) = value }
    }

    /// The whole view as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.as_view().as_slice()
    }

    /// The whole view as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: The view is valid for `len` initialized elements and is
        // borrowed exclusively.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Consumes the view, returning the underlying slice for its full
    /// lifetime.
    #[inline]
    pub fn into_mut_slice(self) -> &'a mut [T] {
        // SAFETY: As for `as_mut_slice`, with the borrow moved out of `self`.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Resolves an element address back to its index.
    pub fn index_of(&self, address: *const T) -> Result<usize> {
        index_of_address(self.ptr, self.len, address)
    }

    /// Zero-fills the whole region.
    pub fn clear(&mut self)
    where
        T: Zeroable,
    {
        // SAFETY: The view is valid for `len` writes, and all-zero bytes are a
        // valid `T` because `T: Zeroable`.
        unsafe { core::ptr::write_bytes(self.ptr.as_ptr(), 0, self.len) }
    }

    /// Copies `length` elements from `src[src_index..]` into
    /// `self[dst_index..]`.
    ///
    /// Both views share `T`, so element sizes always agree. A range that does
    /// not fit fails with [`Error::CopyOutOfRange`] naming the side that
    /// overran; nothing is written in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_hash::error::CopySide;
    /// use dense_hash::error::Error;
    /// use dense_hash::memory_view::MemoryView;
    /// use dense_hash::memory_view::MemoryViewMut;
    ///
    /// let src = [1u8, 2, 3, 4];
    /// let mut dst = [0u8; 3];
    /// let mut view = MemoryViewMut::from_slice(&mut dst);
    ///
    /// view.copy_from(1, MemoryView::from_slice(&src), 2, 2).unwrap();
    /// assert_eq!(view.as_slice(), &[0, 3, 4]);
    ///
    /// let err = view.copy_from(2, MemoryView::from_slice(&src), 0, 2);
    /// assert!(matches!(
    ///     err,
    ///     Err(Error::CopyOutOfRange {
    ///         side: CopySide::Destination,
    ///         ..
    ///     })
    /// ));
    /// ```
    pub fn copy_from(
        &mut self,
        dst_index: usize,
        src: MemoryView<'_, T>,
        src_index: usize,
        length: usize,
    ) -> Result<()>
    where
        T: Copy,
    {
        check_range(CopySide::Source, src_index, length, src.len)?;
        check_range(CopySide::Destination, dst_index, length, self.len)?;

        // SAFETY: Both ranges were validated above. `src` is a shared borrow
        // and `self` an exclusive one, so the regions cannot overlap.
        unsafe {
            core::ptr::copy_nonoverlapping(
                src.ptr.as_ptr().add(src_index),
                self.ptr.as_ptr().add(dst_index),
                length,
            );
        }
        Ok(())
    }

    /// Copies all of `src` into `self[dst_index..]`.
    pub fn copy_from_slice(&mut self, dst_index: usize, src: &[T]) -> Result<()>
    where
        T: Copy,
    {
        self.copy_from(dst_index, MemoryView::from_slice(src), 0, src.len())
    }

    /// Copies `dst.len()` elements starting at `src_index` into `dst`.
    pub fn copy_to_slice(&self, src_index: usize, dst: &mut [T]) -> Result<()>
    where
        T: Copy,
    {
        self.as_view().copy_to_slice(src_index, dst)
    }
}

/// Copies `length` elements from the start of `src` to the start of `dst`.
///
/// Shorthand for [`MemoryViewMut::copy_from`] with both indices at zero.
pub fn copy<T: Copy>(
    src: MemoryView<'_, T>,
    dst: &mut MemoryViewMut<'_, T>,
    length: usize,
) -> Result<()> {
    dst.copy_from(0, src, 0, length)
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable)]
    #[repr(C)]
    struct Pair {
        a: u32,
        b: u16,
    }

    #[test]
    fn checked_get_and_set() {
        let mut data = [0u32; 4];
        let mut view = MemoryViewMut::from_slice(&mut data);

        view.set(3, 7).unwrap();
        assert_eq!(view.get(3), Ok(7));
        assert_eq!(
            view.set(4, 1),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        );
        assert_eq!(
            view.get(usize::MAX),
            Err(Error::IndexOutOfRange {
                index: usize::MAX,
                len: 4
            })
        );
        assert_eq!(data, [0, 0, 0, 7]);
    }

    #[test]
    fn empty_view_rejects_everything() {
        let data: [u64; 0] = [];
        let view = MemoryView::from_slice(&data);
        assert!(view.is_empty());
        assert!(view.get(0).is_err());
        assert_eq!(view.to_vec(0), Ok(Vec::new()));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut data = [Pair { a: 1, b: 2 }; 3];
        let mut view = MemoryViewMut::from_slice(&mut data);

        let pair = view.get_mut(1).unwrap();
        pair.a = 40;
        pair.b += 1;

        assert_eq!(view.get(1), Ok(Pair { a: 40, b: 3 }));
        assert_eq!(view.get(0), Ok(Pair { a: 1, b: 2 }));
        assert_eq!(view.item_size(), size_of::<Pair>());
    }

    #[test]
    fn unchecked_access_matches_checked() {
        let mut data = [5u16, 6, 7];
        let mut view = MemoryViewMut::from_slice(&mut data);
        // SAFETY: All indices are below the view length.
        unsafe {
            view.set_unchecked(2, 9);
            assert_eq!(*view.get_unchecked(2), 9);
            *view.get_unchecked_mut(0) = 1;
        }
        assert_eq!(view.as_slice(), &[1, 6, 9]);
    }

    #[test]
    fn clear_zero_fills() {
        let mut data = [Pair { a: 9, b: 9 }; 5];
        let mut view = MemoryViewMut::from_slice(&mut data);
        view.clear();
        assert!(view.as_slice().iter().all(|p| *p == Pair::zeroed()));
    }

    #[test]
    fn copy_between_views() {
        let src = [1u32, 2, 3, 4, 5];
        let mut dst = [0u32; 5];
        let mut view = MemoryViewMut::from_slice(&mut dst);

        copy(MemoryView::from_slice(&src), &mut view, 3).unwrap();
        assert_eq!(view.as_slice(), &[1, 2, 3, 0, 0]);

        view.copy_from(3, MemoryView::from_slice(&src), 0, 2).unwrap();
        assert_eq!(view.as_slice(), &[1, 2, 3, 1, 2]);

        view.copy_from(0, MemoryView::from_slice(&src), 5, 0).unwrap();
    }

    #[test]
    fn copy_reports_violating_side() {
        let src = [1u32, 2];
        let mut dst = [0u32; 4];
        let mut view = MemoryViewMut::from_slice(&mut dst);

        assert_eq!(
            view.copy_from(0, MemoryView::from_slice(&src), 1, 2),
            Err(Error::CopyOutOfRange {
                side: CopySide::Source,
                index: 1,
                length: 2,
                len: 2,
            })
        );
        assert_eq!(
            view.copy_from(3, MemoryView::from_slice(&src), 0, 2),
            Err(Error::CopyOutOfRange {
                side: CopySide::Destination,
                index: 3,
                length: 2,
                len: 4,
            })
        );
        assert_eq!(
            view.copy_from(usize::MAX, MemoryView::from_slice(&src), 0, 2),
            Err(Error::CopyOutOfRange {
                side: CopySide::Destination,
                index: usize::MAX,
                length: 2,
                len: 4,
            })
        );
        assert_eq!(view.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    fn copy_to_and_from_slices() {
        let mut backing = [0i64; 4];
        let mut view = MemoryViewMut::from_slice(&mut backing);
        view.copy_from_slice(1, &[7, 8, 9]).unwrap();
        assert!(view.copy_from_slice(2, &[1, 2, 3]).is_err());

        let mut out = [0i64; 2];
        view.copy_to_slice(2, &mut out).unwrap();
        assert_eq!(out, [8, 9]);
        assert!(matches!(
            view.copy_to_slice(3, &mut out),
            Err(Error::CopyOutOfRange {
                side: CopySide::Source,
                ..
            })
        ));

        assert_eq!(view.as_view().to_vec(2), Ok(vec![0, 7]));
        assert!(view.as_view().to_vec(5).is_err());
    }

    #[test]
    fn index_of_resolves_addresses() {
        let data = [Pair { a: 0, b: 0 }; 4];
        let view = MemoryView::from_slice(&data[..3]);

        for (i, item) in data[..3].iter().enumerate() {
            assert_eq!(view.index_of(item), Ok(i));
        }
        assert_eq!(
            view.index_of(&data[3]),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        );

        let tail = MemoryView::from_slice(&data[1..]);
        assert!(matches!(
            tail.index_of(&data[0]),
            Err(Error::InvalidArgument(_))
        ));

        let misaligned = (view.as_ptr() as *const u8).wrapping_add(1) as *const Pair;
        assert!(matches!(
            view.index_of(misaligned),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_sized_elements_have_no_addresses() {
        let data = [(), ()];
        let view = MemoryView::from_slice(&data);
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(1), Ok(()));
        assert!(view.index_of(&data[0]).is_err());
    }

    #[test]
    fn reborrow_and_into_slice() {
        let mut data = [1u8, 2, 3];
        let mut view = MemoryViewMut::from_slice(&mut data);
        view.reborrow().set(0, 4).unwrap();
        let slice = view.into_mut_slice();
        slice[2] = 6;
        assert_eq!(data, [4, 2, 6]);
    }
}
