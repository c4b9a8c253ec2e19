//! Runtime-length containers built from fixed-width chunks.
//!
//! A [`DynamicArray<C, N>`] stores a logical length `L` of scalar elements as
//! `ceil(L / N)` chunks of the composite `C`:
//!
//! ```text
//! L = 10, N = 4
//!
//!   chunk 0: lanes 0..4    mask [1 1 1 1]
//!   chunk 1: lanes 4..8    mask [1 1 1 1]
//!   chunk 2: lanes 8..10   mask [1 1 0 0]   <- range(0, L).chunk(2)
//! ```
//!
//! The validity masks come from [`range`](crate::range()), so every
//! operation on a dynamic array is the ordered concatenation of the
//! fixed-width operation applied chunk by chunk. Lanes past `L` are never
//! observable: equality, slicing and the memory operations all ignore them.
//!
//! Growth is the only allocation. The `try_` constructors report
//! [`DynamicArrayError::AllocFailed`]; the plain forms panic on it without
//! touching the existing contents.

use crate::composite::{Composite, Layout};
use crate::compress;
use crate::logging::{log_debug, log_warn};
use crate::mask::Mask;
use crate::memory;
use crate::packet::Packet;
use crate::range::{range, Range};
use crate::scalar::{IndexScalar, Scalar};
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Not};

/// Errors from growing or assembling dynamic containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicArrayError {
    /// The chunk buffer could not be grown to `requested_chunks` chunks.
    AllocFailed { requested_chunks: usize },
    /// A chunk list does not match the logical length it was paired with.
    ChunkCountMismatch { expected: usize, got: usize },
}

impl fmt::Display for DynamicArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicArrayError::AllocFailed { requested_chunks } => {
                write!(f, "failed to allocate {requested_chunks} chunks for dynamic array")
            }
            DynamicArrayError::ChunkCountMismatch { expected, got } => {
                write!(f, "chunk count mismatch: length needs {expected} chunks, got {got}")
            }
        }
    }
}

impl std::error::Error for DynamicArrayError {}

#[inline]
fn chunks_for<const N: usize>(len: usize) -> usize {
    assert!(N > 0, "dynamic arrays require a non-zero lane count");
    Range::<usize, N>::chunk_count(0, len)
}

#[inline]
fn validity_mask<const N: usize>(len: usize, k: usize) -> Mask<N> {
    // chunk indices past the end may not have a representable first offset
    let first = k.checked_mul(N);
    Mask::from_fn(|lane| first.and_then(|f| f.checked_add(lane)).is_some_and(|i| i < len))
}

// ============================================================================
// DYNAMIC ARRAY
// ============================================================================

/// Runtime-length sequence of scalar elements stored as chunks of `C`.
#[derive(Clone, Debug)]
pub struct DynamicArray<C, const N: usize> {
    chunks: Vec<C>,
    len: usize,
}

/// Dynamic array of plain packets.
pub type DynamicPacket<T, const N: usize> = DynamicArray<Packet<T, N>, N>;

impl<C: Composite<N>, const N: usize> DynamicArray<C, N> {
    /// Empty array; allocates nothing.
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
        }
    }

    /// `len` zero elements.
    ///
    /// # Panics
    /// Panics if the chunk buffer cannot be allocated.
    pub fn zeroed(len: usize) -> Self {
        let mut out = Self::new();
        out.resize(len);
        out
    }

    /// `len` elements with every leaf equal to `value`.
    ///
    /// # Panics
    /// Panics if the chunk buffer cannot be allocated.
    pub fn fill(len: usize, value: C::Leaf) -> Self {
        let mut out = Self::zeroed(len);
        out.for_each_chunk_mut(|chunk| *chunk = C::fill(value));
        out.clear_tail();
        out
    }

    pub fn try_zeroed(len: usize) -> Result<Self, DynamicArrayError> {
        let mut out = Self::new();
        out.try_resize(len)?;
        Ok(out)
    }

    /// Adopt existing chunks as the first `len` elements.
    pub fn from_chunks(chunks: Vec<C>, len: usize) -> Result<Self, DynamicArrayError> {
        let expected = chunks_for::<N>(len);
        if chunks.len() != expected {
            return Err(DynamicArrayError::ChunkCountMismatch {
                expected,
                got: chunks.len(),
            });
        }
        let mut out = Self { chunks, len };
        out.clear_tail();
        Ok(out)
    }

    pub fn from_elements<It>(elements: It) -> Self
    where
        It: IntoIterator<Item = C::Element>,
    {
        let elements = elements.into_iter();
        let mut out = Self::new();
        out.chunks.reserve(chunks_for::<N>(elements.size_hint().0));
        for element in elements {
            out.push(element);
        }
        out
    }

    pub fn to_elements(&self) -> Vec<C::Element> {
        (0..self.len).map(|i| self.slice(i)).collect()
    }

    /// Logical length in elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn chunks(&self) -> &[C] {
        &self.chunks
    }

    /// Mutable chunk access. Lanes past `len()` may be written but remain
    /// unobservable.
    #[inline]
    pub fn chunks_mut(&mut self) -> &mut [C] {
        &mut self.chunks
    }

    #[inline]
    pub fn chunk(&self, k: usize) -> Option<&C> {
        self.chunks.get(k)
    }

    /// Lanes of chunk `k` that hold logical elements.
    #[inline]
    pub fn chunk_mask(&self, k: usize) -> Mask<N> {
        validity_mask(self.len, k)
    }

    /// Chunks paired with their validity masks, generated by
    /// `range(0, len())`.
    pub fn iter_chunks(&self) -> impl Iterator<Item = (&C, Mask<N>)> + '_ {
        self.chunks
            .iter()
            .zip(range::<usize, N>(0, self.len).map(|(_, valid)| valid))
    }

    pub fn for_each_chunk_mut(&mut self, f: impl FnMut(&mut C)) {
        self.chunks.iter_mut().for_each(f);
    }

    /// Element `i`.
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn slice(&self, i: usize) -> C::Element {
        assert!(i < self.len, "index {i} out of bounds for dynamic array of length {}", self.len);
        self.chunks[i / N].slice(i % N)
    }

    pub fn set_slice(&mut self, i: usize, value: &C::Element) {
        assert!(i < self.len, "index {i} out of bounds for dynamic array of length {}", self.len);
        self.chunks[i / N].set_slice(i % N, value);
    }

    /// Grow (with zeros) or shrink to `len` elements.
    ///
    /// # Panics
    /// Panics if growing the chunk buffer fails; the array is left as it was.
    pub fn resize(&mut self, len: usize) {
        if let Err(err) = self.try_resize(len) {
            panic!("{err}");
        }
    }

    pub fn try_resize(&mut self, len: usize) -> Result<(), DynamicArrayError> {
        let needed = chunks_for::<N>(len);
        let current = self.chunks.len();
        if needed > current && self.chunks.try_reserve(needed - current).is_err() {
            log_warn!(requested_chunks = needed, "dynamic array allocation failed");
            return Err(DynamicArrayError::AllocFailed {
                requested_chunks: needed,
            });
        }
        if len > self.len {
            // stale lanes of the old tail chunk become visible when growing
            self.clear_tail();
        }
        self.chunks.resize_with(needed, C::zero);
        log_debug!(from = self.len, to = len, chunks = needed, "dynamic array resized");
        self.len = len;
        self.clear_tail();
        Ok(())
    }

    /// Append one element, adding a chunk when the last one is full.
    pub fn push(&mut self, value: C::Element) {
        if let Err(err) = self.try_push(value) {
            panic!("{err}");
        }
    }

    pub fn try_push(&mut self, value: C::Element) -> Result<(), DynamicArrayError> {
        let i = self.len;
        self.try_resize(i + 1)?;
        self.chunks[i / N].set_slice(i % N, &value);
        Ok(())
    }

    /// Zero the lanes of the last chunk that lie past `len`.
    fn clear_tail(&mut self) {
        let used = self.len % N;
        if used == 0 {
            return;
        }
        let zero = C::Element::zeroed();
        if let Some(last) = self.chunks.last_mut() {
            for lane in used..N {
                last.set_slice(lane, &zero);
            }
        }
    }

    // ========================================================================
    // MEMORY OPERATIONS
    // ========================================================================

    /// Gather one element per logical lane of `index`.
    ///
    /// The result has `index.len()` elements; each chunk is a fixed-width
    /// masked gather using the chunk's validity mask.
    pub fn gather<I: IndexScalar + Layout<Leaf = I>>(base: &[C::Element], index: &DynamicPacket<I, N>) -> Self {
        let chunks = index
            .iter_chunks()
            .map(|(idx, valid)| memory::gather_masked(base, *idx, valid))
            .collect();
        Self {
            chunks,
            len: index.len(),
        }
    }

    /// Masked gather; `mask` must have the same length as `index`.
    pub fn gather_masked<I: IndexScalar + Layout<Leaf = I>>(
        base: &[C::Element],
        index: &DynamicPacket<I, N>,
        mask: &DynamicMask<N>,
    ) -> Self {
        assert_eq!(index.len(), mask.len(), "index and mask lengths differ");
        let chunks = index
            .iter_chunks()
            .zip(mask.chunks())
            .map(|((idx, valid), m)| memory::gather_masked(base, *idx, valid & *m))
            .collect();
        Self {
            chunks,
            len: index.len(),
        }
    }

    /// Scatter every logical element to `base[index[i]]`.
    pub fn scatter<I: IndexScalar + Layout<Leaf = I>>(&self, base: &mut [C::Element], index: &DynamicPacket<I, N>) {
        assert_eq!(self.len, index.len(), "value and index lengths differ");
        for ((chunk, valid), idx) in self.iter_chunks().zip(index.chunks()) {
            memory::scatter_masked(base, chunk, *idx, valid);
        }
    }

    pub fn scatter_masked<I: IndexScalar + Layout<Leaf = I>>(
        &self,
        base: &mut [C::Element],
        index: &DynamicPacket<I, N>,
        mask: &DynamicMask<N>,
    ) {
        assert_eq!(self.len, index.len(), "value and index lengths differ");
        assert_eq!(self.len, mask.len(), "value and mask lengths differ");
        for (((chunk, valid), idx), m) in self.iter_chunks().zip(index.chunks()).zip(mask.chunks()) {
            memory::scatter_masked(base, chunk, *idx, valid & *m);
        }
    }

    /// Compact the selected elements into `dest`, chunk after chunk, and
    /// return the unwritten tail.
    pub fn compress<'a>(&self, dest: &'a mut [C::Element], mask: &DynamicMask<N>) -> &'a mut [C::Element] {
        assert_eq!(self.len, mask.len(), "value and mask lengths differ");
        self.iter_chunks()
            .zip(mask.chunks())
            .fold(dest, |dest, ((chunk, valid), m)| compress::compress(dest, chunk, valid & *m))
    }
}

impl<C: Composite<N>, const N: usize> Default for DynamicArray<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Composite<N>, const N: usize> PartialEq for DynamicArray<C, N> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && (0..self.len).all(|i| self.slice(i) == other.slice(i))
    }
}

/// Lane-wise sum of two arrays of equal length.
impl<C: Composite<N> + Add<Output = C>, const N: usize> Add for DynamicArray<C, N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        assert_eq!(self.len, rhs.len, "dynamic array lengths differ");
        let len = self.len;
        let chunks = self.chunks.into_iter().zip(rhs.chunks).map(|(a, b)| a + b).collect();
        let mut out = Self { chunks, len };
        out.clear_tail();
        out
    }
}

impl<C: Composite<N>, const N: usize> FromIterator<C::Element> for DynamicArray<C, N> {
    fn from_iter<It: IntoIterator<Item = C::Element>>(iter: It) -> Self {
        Self::from_elements(iter)
    }
}

impl<T: Scalar + Layout<Leaf = T>, const N: usize> DynamicPacket<T, N> {
    fn compare(&self, value: T, f: impl Fn(&Packet<T, N>, Packet<T, N>) -> Mask<N>) -> DynamicMask<N> {
        let chunks = self
            .iter_chunks()
            .map(|(chunk, valid)| f(chunk, Packet::splat(value)) & valid)
            .collect();
        DynamicMask {
            chunks,
            len: self.len,
        }
    }

    pub fn simd_eq(&self, value: T) -> DynamicMask<N> {
        self.compare(value, Packet::<T, N>::simd_eq)
    }

    pub fn simd_lt(&self, value: T) -> DynamicMask<N> {
        self.compare(value, Packet::<T, N>::simd_lt)
    }

    pub fn simd_le(&self, value: T) -> DynamicMask<N> {
        self.compare(value, Packet::<T, N>::simd_le)
    }

    pub fn simd_gt(&self, value: T) -> DynamicMask<N> {
        self.compare(value, Packet::<T, N>::simd_gt)
    }

    pub fn simd_ge(&self, value: T) -> DynamicMask<N> {
        self.compare(value, Packet::<T, N>::simd_ge)
    }

    /// Sum of all logical elements.
    pub fn sum(&self) -> T {
        self.iter_chunks()
            .map(|(chunk, valid)| Packet::select(valid, *chunk, Packet::zero()).sum())
            .fold(T::ZERO, |acc, v| acc + v)
    }
}

impl<I: IndexScalar + Layout<Leaf = I>, const N: usize> DynamicPacket<I, N> {
    /// Logical index `0, 1, .., count - 1`, one chunk per `range(0, count)`
    /// pair. Lanes past `count` hold zero.
    ///
    /// # Panics
    /// Panics if `count - 1` does not fit in `I`.
    pub fn index_sequence(count: usize) -> Self {
        let chunks = Range::<I, N>::over_offsets(0, count)
            .map(|(idx, valid)| Packet::select(valid, idx, Packet::zero()))
            .collect();
        Self { chunks, len: count }
    }

    /// Sequential in-place update of `base[self[i]]`, chunk by chunk in
    /// ascending lane order.
    pub fn transform<T>(&self, base: &mut [T], mut f: impl FnMut(&mut T)) {
        for (idx, valid) in self.iter_chunks() {
            memory::transform_masked(base, *idx, valid, &mut f);
        }
    }

    pub fn transform_masked<T>(&self, base: &mut [T], mask: &DynamicMask<N>, mut f: impl FnMut(&mut T)) {
        assert_eq!(self.len, mask.len(), "index and mask lengths differ");
        for ((idx, valid), m) in self.iter_chunks().zip(mask.chunks()) {
            memory::transform_masked(base, *idx, valid & *m, &mut f);
        }
    }

    pub fn prefetch<C: Composite<N>>(&self, base: &[C::Element]) {
        for (idx, valid) in self.iter_chunks() {
            memory::prefetch_masked::<C, I, N>(base, *idx, valid);
        }
    }

    pub fn prefetch_masked<C: Composite<N>>(&self, base: &[C::Element], mask: &DynamicMask<N>) {
        assert_eq!(self.len, mask.len(), "index and mask lengths differ");
        for ((idx, valid), m) in self.iter_chunks().zip(mask.chunks()) {
            memory::prefetch_masked::<C, I, N>(base, *idx, valid & *m);
        }
    }
}

// ============================================================================
// DYNAMIC MASK
// ============================================================================

/// Runtime-length mask chunked like a [`DynamicArray`] of the same `N`.
///
/// Lanes past `len()` are always false.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicMask<const N: usize> {
    chunks: Vec<Mask<N>>,
    len: usize,
}

impl<const N: usize> DynamicMask<N> {
    /// `len` lanes, all equal to `value`.
    pub fn splat(len: usize, value: bool) -> Self {
        Self::from_fn(len, |_| value)
    }

    /// Lane `i` is `f(i)`; `f` is only called for `i < len`.
    pub fn from_fn(len: usize, mut f: impl FnMut(usize) -> bool) -> Self {
        let chunks = (0..chunks_for::<N>(len))
            .map(|k| {
                let valid = validity_mask::<N>(len, k);
                Mask::from_fn(|lane| valid.test(lane) && f(k * N + lane))
            })
            .collect();
        Self { chunks, len }
    }

    pub fn from_chunks(chunks: Vec<Mask<N>>, len: usize) -> Result<Self, DynamicArrayError> {
        let expected = chunks_for::<N>(len);
        if chunks.len() != expected {
            return Err(DynamicArrayError::ChunkCountMismatch {
                expected,
                got: chunks.len(),
            });
        }
        let chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(k, m)| m & validity_mask(len, k))
            .collect();
        Ok(Self { chunks, len })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn chunks(&self) -> &[Mask<N>] {
        &self.chunks
    }

    /// Lane `i`.
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn test(&self, i: usize) -> bool {
        assert!(i < self.len, "index {i} out of bounds for dynamic mask of length {}", self.len);
        self.chunks[i / N].test(i % N)
    }

    pub fn set(&mut self, i: usize, value: bool) {
        assert!(i < self.len, "index {i} out of bounds for dynamic mask of length {}", self.len);
        self.chunks[i / N].set(i % N, value);
    }

    /// Number of true lanes.
    pub fn count(&self) -> usize {
        self.chunks.iter().map(Mask::count).sum()
    }

    fn zip_with(&self, other: &Self, f: impl Fn(Mask<N>, Mask<N>) -> Mask<N>) -> Self {
        assert_eq!(self.len, other.len, "mask lengths differ");
        let chunks = self
            .chunks
            .iter()
            .zip(&other.chunks)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Self { chunks, len: self.len }
    }
}

impl<const N: usize> BitAnd for &DynamicMask<N> {
    type Output = DynamicMask<N>;

    fn bitand(self, rhs: Self) -> DynamicMask<N> {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl<const N: usize> BitOr for &DynamicMask<N> {
    type Output = DynamicMask<N>;

    fn bitor(self, rhs: Self) -> DynamicMask<N> {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl<const N: usize> Not for &DynamicMask<N> {
    type Output = DynamicMask<N>;

    fn not(self) -> DynamicMask<N> {
        let len = self.len;
        let chunks = self
            .chunks
            .iter()
            .enumerate()
            .map(|(k, &m)| !m & validity_mask(len, k))
            .collect();
        DynamicMask { chunks, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Matrix;

    type U32x4 = DynamicPacket<u32, 4>;

    #[test]
    fn test_index_sequence_chunks() {
        let idx = U32x4::index_sequence(10);
        assert_eq!(idx.len(), 10);
        assert_eq!(idx.chunk_count(), 3);
        assert_eq!(idx.chunks()[2].to_array(), [8, 9, 0, 0]);
        assert_eq!(idx.chunk_mask(2).to_array(), [true, true, false, false]);
        assert_eq!(idx.to_elements(), (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_index_sequence_empty() {
        let idx = U32x4::index_sequence(0);
        assert!(idx.is_empty());
        assert_eq!(idx.chunk_count(), 0);
    }

    #[test]
    fn test_resize_grow_and_shrink() {
        let mut a: U32x4 = (0..6).collect();
        assert_eq!(a.chunk_count(), 2);
        a.resize(3);
        assert_eq!(a.to_elements(), vec![0, 1, 2]);
        assert_eq!(a.chunks()[0].to_array(), [0, 1, 2, 0]);
        a.resize(9);
        assert_eq!(a.chunk_count(), 3);
        assert_eq!(a.to_elements(), vec![0, 1, 2, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_growth_clears_dirty_tail() {
        let mut a = U32x4::zeroed(2);
        a.for_each_chunk_mut(|chunk| *chunk += Packet::splat(7));
        assert_eq!(a.to_elements(), vec![7, 7]);
        a.resize(4);
        assert_eq!(a.to_elements(), vec![7, 7, 0, 0]);
    }

    #[test]
    fn test_equality_ignores_tail_lanes() {
        let a = U32x4::zeroed(3);
        let mut b = U32x4::zeroed(3);
        b.chunks_mut()[0].set_lane(3, 99);
        assert_eq!(a, b);
        assert_ne!(a, U32x4::zeroed(4));
    }

    #[test]
    fn test_try_zeroed_reports_alloc_failure() {
        let err = DynamicPacket::<u64, 4>::try_zeroed(usize::MAX).unwrap_err();
        assert!(matches!(err, DynamicArrayError::AllocFailed { .. }));
        assert!(err.to_string().contains("failed to allocate"));
    }

    #[test]
    fn test_failed_resize_keeps_contents() {
        let mut a: DynamicPacket<u64, 4> = (0..5).collect();
        assert!(a.try_resize(usize::MAX).is_err());
        assert_eq!(a.to_elements(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_from_chunks_validates_count() {
        let err = U32x4::from_chunks(vec![Packet::zero()], 5).unwrap_err();
        assert_eq!(err, DynamicArrayError::ChunkCountMismatch { expected: 2, got: 1 });

        let ok = U32x4::from_chunks(vec![Packet::from_array([1, 2, 3, 4])], 2).unwrap();
        assert_eq!(ok.to_elements(), vec![1, 2]);
        assert_eq!(ok.chunks()[0].to_array(), [1, 2, 0, 0]);
    }

    #[test]
    fn test_dynamic_mask_tail_is_false() {
        let m = DynamicMask::<4>::splat(5, true);
        assert_eq!(m.count(), 5);
        assert_eq!(m.chunks()[1].to_array(), [true, false, false, false]);
        let inv = !&m;
        assert_eq!(inv.count(), 0);
        let half = DynamicMask::<4>::from_fn(5, |i| i % 2 == 0);
        assert_eq!((&m & &half).count(), 3);
        assert_eq!((&half | &inv).count(), 3);
    }

    #[test]
    fn test_comparisons_and_sum() {
        let idx = U32x4::index_sequence(7);
        let lt = idx.simd_lt(2);
        assert_eq!(lt.count(), 2);
        assert_eq!(idx.simd_ge(2).count(), 5);
        assert_eq!(idx.simd_eq(0).count(), 1);
        assert_eq!(idx.sum(), 21);
    }

    #[test]
    fn test_gather_matches_index_length() {
        let base: Vec<f32> = (0..20).map(|v| v as f32).collect();
        let idx: U32x4 = [19u32, 3, 3, 0, 7].into_iter().collect();
        let out = DynamicPacket::<f32, 4>::gather(&base, &idx);
        assert_eq!(out.len(), 5);
        assert_eq!(out.to_elements(), vec![19.0, 3.0, 3.0, 0.0, 7.0]);
    }

    #[test]
    fn test_compress_spans_chunks() {
        let values = U32x4::index_sequence(11);
        let keep = values.simd_ge(3);
        let mut out = vec![0u32; 11];
        let written = out.len() - values.compress(&mut out, &keep).len();
        assert_eq!(written, 8);
        assert_eq!(&out[..written], &[3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_transform_masked_dynamic() {
        let idx = U32x4::index_sequence(6);
        let mut cells = vec![0i32; 6];
        let odd = DynamicMask::from_fn(6, |i| i % 2 == 1);
        idx.transform_masked(&mut cells, &odd, |v| *v -= 1);
        assert_eq!(cells, vec![0, -1, 0, -1, 0, -1]);
    }

    #[test]
    fn test_transform_visits_every_logical_lane() {
        // ten lanes all pointing at cell 0, spread over three chunks
        let idx = U32x4::zeroed(10);
        let mut cells = vec![0u32; 2];
        idx.transform(&mut cells, |v| *v += 1);
        assert_eq!(cells, vec![10, 0]);

        let every_third = DynamicMask::from_fn(10, |i| i % 3 == 0);
        idx.transform_masked(&mut cells, &every_third, |v| *v += 1);
        assert_eq!(cells, vec![14, 0]);
    }

    #[test]
    fn test_prefetch_skips_masked_out_offsets() {
        let base = vec![0.0f32; 16];
        let idx: DynamicPacket<u64, 4> = [3u64, 1 << 40, 15, 0, 7].into_iter().collect();
        let in_range = DynamicMask::from_fn(5, |i| i != 1);
        idx.prefetch_masked::<Packet<f32, 4>>(&base, &in_range);

        let inside = DynamicPacket::<u64, 4>::index_sequence(16);
        inside.prefetch::<Packet<f32, 4>>(&base);
        // hints never change memory
        assert!(base.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_index_sequence_fills_index_type() {
        let idx = DynamicPacket::<u8, 4>::index_sequence(256);
        assert_eq!(idx.chunk_count(), 64);
        assert_eq!(idx.slice(255), 255);
        assert_eq!(idx.to_elements(), (0..=255u8).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "does not fit the index type")]
    fn test_index_sequence_past_index_type_panics() {
        let _ = DynamicPacket::<u8, 4>::index_sequence(300);
    }

    #[test]
    fn test_validity_mask_far_past_the_end() {
        let a = U32x4::zeroed(5);
        assert!(a.chunk_mask(usize::MAX).none());
        assert!(a.chunk_mask(usize::MAX / 4).none());
        assert_eq!(a.chunk_mask(1).to_array(), [true, false, false, false]);
    }

    #[test]
    fn test_mask_from_fn_only_asks_for_logical_lanes() {
        let mut asked = Vec::new();
        let m = DynamicMask::<4>::from_fn(6, |i| {
            asked.push(i);
            true
        });
        assert_eq!(asked, (0..6).collect::<Vec<_>>());
        assert_eq!(m.count(), 6);
        assert!(m.test(5));
    }

    #[test]
    fn test_fill_and_add() {
        let a = DynamicArray::<Matrix<Packet<f32, 4>, 2>, 4>::fill(5, 1000.0);
        assert_eq!(a.slice(4), Matrix::filled(1000.0));
        assert_eq!(a.chunks()[1].slice(1), Matrix::zeroed());

        let b = a.clone() + a;
        assert_eq!(b.len(), 5);
        assert_eq!(b.to_elements(), vec![Matrix::filled(2000.0); 5]);

        let counts = U32x4::index_sequence(6) + U32x4::fill(6, 1);
        assert_eq!(counts.to_elements(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(counts.chunks()[1].to_array(), [5, 6, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "lengths differ")]
    fn test_add_length_mismatch_panics() {
        let _ = U32x4::zeroed(3) + U32x4::zeroed(4);
    }

    #[test]
    fn test_push_composites() {
        let mut a = DynamicArray::<Matrix<Packet<f32, 2>, 2>, 2>::new();
        for i in 0..3 {
            a.push(Matrix::<f32, 2>::filled(i as f32));
        }
        assert_eq!(a.len(), 3);
        assert_eq!(a.chunk_count(), 2);
        assert_eq!(a.slice(2), Matrix::filled(2.0));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_slice_past_len_panics() {
        U32x4::zeroed(3).slice(3);
    }
}
