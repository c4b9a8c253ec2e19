//! Fixed-width packets
//!
//! A [`Packet<T, N>`] is a homogeneous vector of `N` logical lanes. Backends
//! may pad it to [`Packet::PHYSICAL_LANES`] (the next power of two); padding
//! lanes are not stored here and are never observable through the memory
//! operations.
//!
//! Only the lane-wise arithmetic needed to build indices and masks and to
//! check results lives here: `+`, `-`, `*`, horizontal [`sum`](Packet::sum),
//! comparisons producing a [`Mask`], [`select`](Packet::select) and
//! [`extract`](Packet::extract).

use crate::lanes::{deserialize_lanes, serialize_lanes};
use crate::mask::Mask;
use crate::scalar::Scalar;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::{Add, AddAssign, Index, Mul, Sub, SubAssign};

/// Fixed-width lane-parallel vector.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(transparent)]
pub struct Packet<T, const N: usize> {
    lanes: [T; N],
}

impl<T: Scalar, const N: usize> Packet<T, N> {
    /// Logical lane count.
    pub const LANES: usize = N;

    /// Lane count a backend register would hold (padded, `>= N`).
    pub const PHYSICAL_LANES: usize = N.next_power_of_two();

    /// Broadcast one value to every lane.
    #[inline]
    pub fn splat(value: T) -> Self {
        Self { lanes: [value; N] }
    }

    /// All-zero packet.
    #[inline]
    pub fn zero() -> Self {
        Self::splat(T::ZERO)
    }

    /// Wrap an array of lanes.
    #[inline]
    pub const fn from_array(lanes: [T; N]) -> Self {
        Self { lanes }
    }

    /// Lane `i` holds `f(i)`.
    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> T) -> Self {
        Self {
            lanes: std::array::from_fn(f),
        }
    }

    /// Lane `i` holds `i`.
    #[inline]
    pub fn index_sequence() -> Self {
        Self::from_fn(T::from_usize)
    }

    /// Copy out the lanes as an array.
    #[inline]
    pub fn to_array(self) -> [T; N] {
        self.lanes
    }

    #[inline]
    pub fn as_array(&self) -> &[T; N] {
        &self.lanes
    }

    /// Lanes as a slice of length `N`.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.lanes
    }

    /// Read one lane.
    ///
    /// # Panics
    /// Panics if `lane >= N`.
    #[inline]
    pub fn lane(&self, lane: usize) -> T {
        self.lanes[lane]
    }

    /// Overwrite one lane.
    ///
    /// # Panics
    /// Panics if `lane >= N`.
    #[inline]
    pub fn set_lane(&mut self, lane: usize, value: T) {
        self.lanes[lane] = value;
    }

    /// Lane values in lane order.
    pub fn iter(self) -> impl Iterator<Item = T> {
        self.lanes.into_iter()
    }

    /// Apply `f` to every lane.
    #[inline]
    pub fn map<U: Scalar>(self, mut f: impl FnMut(T) -> U) -> Packet<U, N> {
        Packet::from_fn(|lane| f(self.lanes[lane]))
    }

    /// Horizontal sum of all lanes.
    pub fn sum(&self) -> T {
        self.lanes.iter().fold(T::ZERO, |acc, &v| acc + v)
    }

    /// Value of the lowest active lane.
    #[inline]
    pub fn extract(&self, mask: Mask<N>) -> Option<T> {
        mask.first_set().map(|lane| self.lanes[lane])
    }

    /// Lane-wise `if mask { a } else { b }`.
    #[inline]
    pub fn select(mask: Mask<N>, a: Self, b: Self) -> Self {
        Self::from_fn(|lane| if mask.test(lane) { a.lanes[lane] } else { b.lanes[lane] })
    }

    #[inline]
    fn compare(&self, other: &Self, f: impl Fn(&T, &T) -> bool) -> Mask<N> {
        Mask::from_fn(|lane| f(&self.lanes[lane], &other.lanes[lane]))
    }

    pub fn simd_eq(&self, other: Self) -> Mask<N> {
        self.compare(&other, T::eq)
    }

    pub fn simd_ne(&self, other: Self) -> Mask<N> {
        self.compare(&other, T::ne)
    }

    pub fn simd_lt(&self, other: Self) -> Mask<N> {
        self.compare(&other, T::lt)
    }

    pub fn simd_le(&self, other: Self) -> Mask<N> {
        self.compare(&other, T::le)
    }

    pub fn simd_gt(&self, other: Self) -> Mask<N> {
        self.compare(&other, T::gt)
    }

    pub fn simd_ge(&self, other: Self) -> Mask<N> {
        self.compare(&other, T::ge)
    }
}

impl<T: Scalar, const N: usize> Default for Packet<T, N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<T: Scalar, const N: usize> From<[T; N]> for Packet<T, N> {
    fn from(lanes: [T; N]) -> Self {
        Self::from_array(lanes)
    }
}

impl<T, const N: usize> Index<usize> for Packet<T, N> {
    type Output = T;

    fn index(&self, lane: usize) -> &T {
        &self.lanes[lane]
    }
}

macro_rules! impl_lanewise_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident) => {
        impl<T: Scalar, const N: usize> $trait for Packet<T, N> {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self {
                Self::from_fn(|lane| $trait::$method(self.lanes[lane], rhs.lanes[lane]))
            }
        }

        impl<T: Scalar, const N: usize> $assign_trait for Packet<T, N> {
            #[inline]
            fn $assign_method(&mut self, rhs: Self) {
                *self = $trait::$method(*self, rhs);
            }
        }
    };
}

impl_lanewise_op!(Add, add, AddAssign, add_assign);
impl_lanewise_op!(Sub, sub, SubAssign, sub_assign);

impl<T: Scalar, const N: usize> Mul for Packet<T, N> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::from_fn(|lane| self.lanes[lane] * rhs.lanes[lane])
    }
}

impl<T: Serialize, const N: usize> Serialize for Packet<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_lanes(&self.lanes, serializer)
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for Packet<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_lanes::<T, D, N>(deserializer).map(|lanes| Self { lanes })
    }
}

/// Types that can produce an ascending lane index (`lane i == i`).
pub trait IndexSequence {
    fn index_sequence() -> Self;
}

impl<T: Scalar, const N: usize> IndexSequence for Packet<T, N> {
    #[inline]
    fn index_sequence() -> Self {
        Packet::index_sequence()
    }
}

/// Ascending index for any [`IndexSequence`] type.
///
/// ```
/// use lanewise::{index_sequence, Packet};
///
/// let idx: Packet<u32, 4> = index_sequence();
/// assert_eq!(idx.to_array(), [0, 1, 2, 3]);
/// ```
#[inline]
pub fn index_sequence<P: IndexSequence>() -> P {
    P::index_sequence()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_lanes_cover_logical() {
        assert_eq!(Packet::<f32, 1>::PHYSICAL_LANES, 1);
        assert_eq!(Packet::<f32, 3>::PHYSICAL_LANES, 4);
        assert_eq!(Packet::<f32, 8>::PHYSICAL_LANES, 8);
        assert_eq!(Packet::<u32, 31>::PHYSICAL_LANES, 32);
    }

    #[test]
    fn test_index_sequence_float() {
        let idx = Packet::<f64, 5>::index_sequence();
        assert_eq!(idx.to_array(), [0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_extract_first_active() {
        let p = Packet::from_array([10u32, 20, 30, 40]);
        assert_eq!(p.extract(Mask::from_array([false, true, true, false])), Some(20));
        assert_eq!(p.extract(Mask::splat(false)), None);
    }

    #[test]
    fn test_select_and_compare() {
        let idx = Packet::<i32, 4>::index_sequence();
        let m = idx.simd_lt(Packet::splat(2));
        assert_eq!(m.to_array(), [true, true, false, false]);
        let s = Packet::select(m, idx, Packet::splat(-1));
        assert_eq!(s.to_array(), [0, 1, -1, -1]);
        assert_eq!(idx.simd_ge(Packet::splat(2)), !m);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Packet::from_array([1u32, 2, 3]);
        let b = Packet::splat(10u32);
        assert_eq!((a + b).to_array(), [11, 12, 13]);
        assert_eq!((b - a).to_array(), [9, 8, 7]);
        assert_eq!((a * a).to_array(), [1, 4, 9]);
        assert_eq!((a + b).sum(), 36);

        let mut c = a;
        c += a;
        c -= Packet::splat(1);
        assert_eq!(c.to_array(), [1, 3, 5]);
    }

    #[test]
    fn test_serde_round_trip() {
        let p = Packet::from_array([1.5f32, -2.0, 0.0, 8.25]);
        let json = serde_json::to_string(&p).unwrap();
        let back: Packet<f32, 4> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<Packet<f32, 4>>("[1.0, 2.0]").is_err());
    }

    #[test]
    fn test_wide_packet_serde() {
        // wider than serde's built-in array impls
        let p = Packet::<u16, 40>::index_sequence();
        let json = serde_json::to_string(&p).unwrap();
        let back: Packet<u16, 40> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
