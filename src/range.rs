//! Chunked iteration over integer intervals.
//!
//! [`range`] turns a half-open interval `[start, end)` into a lazy sequence
//! of `(index, mask)` pairs of width `N`:
//!
//! ```text
//! range::<u32, 4>(5, 15)
//!
//!   chunk 0: [ 5  6  7  8]  mask [1 1 1 1]
//!   chunk 1: [ 9 10 11 12]  mask [1 1 1 1]
//!   chunk 2: [13 14 15 16]  mask [1 1 0 0]
//! ```
//!
//! Every integer in the interval appears in exactly one active lane. The
//! same mechanism masks the tail chunk of a
//! [`DynamicArray`](crate::DynamicArray).

use crate::logging::log_trace;
use crate::mask::Mask;
use crate::packet::Packet;
use crate::scalar::IndexScalar;
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Lazy, restartable sequence of `(Packet<I, N>, Mask<N>)` chunks.
///
/// Cloning a `Range` (or calling [`range`] again with the same bounds)
/// reproduces the identical sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range<I, const N: usize> {
    start: usize,
    end: usize,
    front: usize,
    back: usize,
    _index: PhantomData<I>,
}

/// Chunks of width `N` covering `[start, end)`.
///
/// Yields `ceil((end - start) / N)` pairs when `end > start`, none
/// otherwise. Active lanes hold `start + k * N + i`; inactive padding lanes
/// of the last chunk continue the count, wrapping in `I`.
///
/// # Panics
/// Panics if `N == 0`.
///
/// ```
/// use lanewise::range;
///
/// let active: usize = range::<u32, 8>(3, 20).map(|(_, mask)| mask.count()).sum();
/// assert_eq!(active, 17);
/// ```
pub fn range<I: IndexScalar, const N: usize>(start: I, end: I) -> Range<I, N> {
    Range::new(start, end)
}

impl<I: IndexScalar, const N: usize> Range<I, N> {
    pub fn new(start: I, end: I) -> Self {
        Self::over_offsets(start.to_usize(), end.to_usize())
    }

    /// Range over element offsets `[start, end)`, for callers that count in
    /// `usize` (dynamic container lengths).
    ///
    /// # Panics
    /// Panics if `N == 0` or if the last offset `end - 1` does not fit in `I`.
    pub fn over_offsets(start: usize, end: usize) -> Self {
        assert!(N > 0, "range requires a non-zero lane count");
        if end > start {
            assert!(
                I::try_from_usize(end - 1).is_some(),
                "range end {end} does not fit the index type"
            );
        }
        let chunks = Self::chunk_count(start, end);
        log_trace!(start, end, chunks, width = N, "range");
        Self {
            start,
            end,
            front: 0,
            back: chunks,
            _index: PhantomData,
        }
    }

    /// Number of width-`N` chunks needed for `[start, end)`.
    #[inline]
    pub fn chunk_count(start: usize, end: usize) -> usize {
        if end > start {
            let span = end - start;
            span / N + usize::from(span % N != 0)
        } else {
            0
        }
    }

    /// First offset, as passed to the constructor.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last offset.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Random access to chunk `k` of the full sequence, independent of how
    /// far the iterator has advanced.
    pub fn chunk(&self, k: usize) -> Option<(Packet<I, N>, Mask<N>)> {
        if k >= Self::chunk_count(self.start, self.end) {
            return None;
        }
        // k < ceil(span / N), so offset < span and nothing below overflows
        let span = self.end - self.start;
        let offset = k * N;
        let active = span - offset;
        let first = self.start + offset;
        let index = Packet::from_fn(|lane| I::from_usize(first.wrapping_add(lane)));
        let mask = Mask::from_fn(|lane| lane < active);
        Some((index, mask))
    }
}

impl<I: IndexScalar, const N: usize> Iterator for Range<I, N> {
    type Item = (Packet<I, N>, Mask<N>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.chunk(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back.saturating_sub(self.front);
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.front = self.front.saturating_add(n).min(self.back);
        self.next()
    }
}

impl<I: IndexScalar, const N: usize> DoubleEndedIterator for Range<I, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.chunk(self.back)
    }
}

impl<I: IndexScalar, const N: usize> ExactSizeIterator for Range<I, N> {}

impl<I: IndexScalar, const N: usize> FusedIterator for Range<I, N> {}
