//! Scalar element types that can live in a packet lane.
//!
//! Two traits cover every lane type used by the memory operations:
//!
//! - [`Scalar`]: any numeric lane value (integers and floats). Provides the
//!   additive identity used for masked-out gather lanes and a conversion from
//!   `usize` so index sequences can be built over any element type.
//! - [`IndexScalar`]: unsigned integers usable as element offsets.

use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

/// Numeric value stored in a single packet lane.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    /// Additive identity; the value of every masked-out gather lane.
    const ZERO: Self;
    /// Multiplicative identity.
    const ONE: Self;

    /// Lossy conversion from a lane position or offset (`as` semantics).
    fn from_usize(value: usize) -> Self;
}

/// Unsigned integer lane type holding element offsets.
pub trait IndexScalar: Scalar + Eq + Ord {
    /// Offset in elements (not bytes) into a base slice.
    fn to_usize(self) -> usize;

    /// Exact conversion from an offset; `None` if `value` does not fit.
    fn try_from_usize(value: usize) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $zero:expr, $one:expr);* $(;)?) => {
        $(
            impl Scalar for $ty {
                const ZERO: Self = $zero;
                const ONE: Self = $one;

                #[inline(always)]
                fn from_usize(value: usize) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => 0, 1;
    i16 => 0, 1;
    i32 => 0, 1;
    i64 => 0, 1;
    isize => 0, 1;
    u8 => 0, 1;
    u16 => 0, 1;
    u32 => 0, 1;
    u64 => 0, 1;
    usize => 0, 1;
    f32 => 0.0, 1.0;
    f64 => 0.0, 1.0;
}

macro_rules! impl_index_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IndexScalar for $ty {
                #[inline(always)]
                fn to_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn try_from_usize(value: usize) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_index_scalar!(u8, u16, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities() {
        assert_eq!(<f32 as Scalar>::ZERO, 0.0);
        assert_eq!(<u32 as Scalar>::ONE, 1);
        assert_eq!(<i64 as Scalar>::ZERO + <i64 as Scalar>::ONE, 1);
    }

    #[test]
    fn test_from_usize_truncates_like_as() {
        assert_eq!(<u8 as Scalar>::from_usize(300), 44);
        assert_eq!(<f64 as Scalar>::from_usize(7), 7.0);
    }

    #[test]
    fn test_try_from_usize_rejects_overflow() {
        assert_eq!(<u8 as IndexScalar>::try_from_usize(255), Some(255));
        assert_eq!(<u8 as IndexScalar>::try_from_usize(256), None);
        assert_eq!(<usize as IndexScalar>::try_from_usize(usize::MAX), Some(usize::MAX));
    }

    #[test]
    fn test_index_round_trip() {
        for v in [0usize, 1, 31, 65_535] {
            assert_eq!(<u32 as Scalar>::from_usize(v).to_usize(), v);
            assert_eq!(<u64 as Scalar>::from_usize(v).to_usize(), v);
        }
    }
}
