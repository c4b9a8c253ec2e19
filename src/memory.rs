//! Indexed memory access: gather, scatter, transform and prefetch.
//!
//! All operations take a base slice of scalar-shaped elements
//! (`&[C::Element]`), an index packet of element offsets and, for the
//! `_masked` forms, a [`Mask`]. Composite targets are handled by walking
//! their leaves, every leaf using the same index and mask, which turns an
//! array-of-structures base into structure-of-arrays packets and back.
//!
//! | Operation | Active lane | Masked-out lane |
//! |-----------|-------------|-----------------|
//! | gather    | reads `base[index[i]]` | yields zero |
//! | scatter   | writes `base[index[i]]` | leaves memory untouched |
//! | transform | calls `f(&mut base[index[i]])`, ascending lanes | skipped |
//! | prefetch  | hints the cache lines of `base[index[i]]` | skipped |
//!
//! # Panics
//!
//! Out-of-range offsets in an active lane panic on the slice bounds check
//! (gather, scatter, transform). Prefetch never dereferences and never panics.

use crate::composite::{Composite, Layout};
use crate::mask::Mask;
use crate::packet::Packet;
use crate::scalar::{IndexScalar, Scalar};

/// Unmasked gather.
///
/// ```
/// use lanewise::{gather, Packet};
///
/// let base = [10u32, 11, 12, 13, 14];
/// let idx = Packet::from_array([4u32, 0, 2, 2]);
/// let out: Packet<u32, 4> = gather(&base[..], idx);
/// assert_eq!(out.to_array(), [14, 10, 12, 12]);
/// ```
#[inline]
pub fn gather<C, I, const N: usize>(base: &[C::Element], index: Packet<I, N>) -> C
where
    C: Composite<N>,
    I: IndexScalar,
{
    gather_masked(base, index, Mask::splat(true))
}

/// Masked gather; inactive lanes of every leaf are zero.
pub fn gather_masked<C, I, const N: usize>(base: &[C::Element], index: Packet<I, N>, mask: Mask<N>) -> C
where
    C: Composite<N>,
    I: IndexScalar,
{
    let mut out = C::zero();
    out.for_each_leaf_mut(|k, leaf| {
        *leaf = Packet::from_fn(|lane| {
            if mask.test(lane) {
                base[index.lane(lane).to_usize()].leaf(k)
            } else {
                <C::Leaf as Scalar>::ZERO
            }
        });
    });
    out
}

/// Unmasked scatter.
///
/// Two active lanes naming the same offset have no defined winner.
#[inline]
pub fn scatter<C, I, const N: usize>(base: &mut [C::Element], value: &C, index: Packet<I, N>)
where
    C: Composite<N>,
    I: IndexScalar,
{
    scatter_masked(base, value, index, Mask::splat(true))
}

/// Masked scatter; destinations of inactive lanes are not touched.
pub fn scatter_masked<C, I, const N: usize>(
    base: &mut [C::Element],
    value: &C,
    index: Packet<I, N>,
    mask: Mask<N>,
) where
    C: Composite<N>,
    I: IndexScalar,
{
    value.for_each_leaf(|k, leaf| {
        for lane in mask.iter_set() {
            *base[index.lane(lane).to_usize()].leaf_mut(k) = leaf.lane(lane);
        }
    });
}

/// Apply `f` in place to `base[index[i]]` for every lane, in ascending lane
/// order.
///
/// Lanes are visited one after another, so colliding offsets compound: an
/// all-zero index of width `N` applies `f` to `base[0]` exactly `N` times.
///
/// ```
/// use lanewise::{transform, Packet};
///
/// let mut cells = [0u32; 4];
/// transform(&mut cells, Packet::<u32, 4>::splat(0), |v| *v += 1);
/// assert_eq!(cells, [4, 0, 0, 0]);
/// ```
#[inline]
pub fn transform<T, I, const N: usize>(base: &mut [T], index: Packet<I, N>, f: impl FnMut(&mut T))
where
    I: IndexScalar,
{
    transform_masked(base, index, Mask::splat(true), f)
}

/// Masked [`transform`]; inactive lanes are skipped entirely.
pub fn transform_masked<T, I, const N: usize>(
    base: &mut [T],
    index: Packet<I, N>,
    mask: Mask<N>,
    mut f: impl FnMut(&mut T),
) where
    I: IndexScalar,
{
    for lane in mask.iter_set() {
        f(&mut base[index.lane(lane).to_usize()]);
    }
}

/// Unmasked prefetch.
#[inline]
pub fn prefetch<C, I, const N: usize>(base: &[C::Element], index: Packet<I, N>)
where
    C: Composite<N>,
    I: IndexScalar,
{
    prefetch_masked::<C, I, N>(base, index, Mask::splat(true))
}

/// Cache hint for the elements a matching [`gather_masked`] would read.
///
/// Every cache line spanned by `base[index[i]]` is hinted, which covers all
/// leaves of a composite element. Addresses are computed with wrapping
/// pointer arithmetic and never dereferenced, so any offset is accepted.
pub fn prefetch_masked<C, I, const N: usize>(base: &[C::Element], index: Packet<I, N>, mask: Mask<N>)
where
    C: Composite<N>,
    I: IndexScalar,
{
    let size = std::mem::size_of::<C::Element>();
    for lane in mask.iter_set() {
        let elem = base.as_ptr().wrapping_add(index.lane(lane).to_usize()) as *const u8;
        for offset in (0..size.max(1)).step_by(CACHE_LINE) {
            prefetch_line(elem.wrapping_add(offset));
        }
    }
}

const CACHE_LINE: usize = 64;

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn prefetch_line(ptr: *const u8) {
    use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};

    // SAFETY: prefetch is a hint; it never faults, even on invalid addresses,
    // and SSE is part of the x86_64 baseline.
    unsafe { _mm_prefetch::<_MM_HINT_T0>(ptr as *const i8) }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn prefetch_line(ptr: *const u8) {
    let _ = ptr;
}
