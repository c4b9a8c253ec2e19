//! Stream compaction.
//!
//! [`compress`] writes the active lanes of a packet or composite, in
//! ascending lane order, to the front of a destination slice and hands back
//! the unwritten tail. Feeding the tail into the next call appends, which is
//! how a stream of packets is compacted into one contiguous buffer:
//!
//! ```
//! use lanewise::{compress, Packet};
//!
//! let mut out = [0u32; 8];
//! let mut rest = &mut out[..];
//! for base in [0u32, 4] {
//!     let v = Packet::<u32, 4>::from_fn(|i| base + i as u32);
//!     rest = compress(rest, &v, v.simd_ge(Packet::splat(2)));
//! }
//! let written = 8 - rest.len();
//! assert_eq!(&out[..written], &[2, 3, 4, 5, 6, 7]);
//! ```

use crate::composite::Composite;
use crate::logging::log_trace;
use crate::mask::Mask;

/// Append the active lanes of `value` to `dest` and return the rest of
/// `dest` (advanced by `mask.count()`).
///
/// # Panics
/// Panics if `dest` is shorter than `mask.count()`.
pub fn compress<'a, C, const N: usize>(
    dest: &'a mut [C::Element],
    value: &C,
    mask: Mask<N>,
) -> &'a mut [C::Element]
where
    C: Composite<N>,
{
    let count = mask.count();
    assert!(
        dest.len() >= count,
        "compress destination holds {} elements but {} lanes are active",
        dest.len(),
        count
    );
    log_trace!(count, capacity = dest.len(), "compress");

    let (head, tail) = dest.split_at_mut(count);
    for (slot, lane) in head.iter_mut().zip(mask.iter_set()) {
        *slot = value.slice(lane);
    }
    tail
}
