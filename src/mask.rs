//! Lane predicates.
//!
//! A [`Mask<N>`] is a first-class value paired with any `Packet<_, N>`: it is
//! passed into gather, scatter, transform, compress and prefetch instead of
//! branching around them. `true` means the lane participates.

use crate::lanes::{deserialize_lanes, serialize_lanes};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Index, Not};

/// Boolean packet with one predicate per lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Mask<const N: usize> {
    lanes: [bool; N],
}

impl<const N: usize> Mask<N> {
    /// Number of logical lanes.
    pub const LANES: usize = N;

    /// Broadcast one predicate to every lane.
    #[inline]
    pub const fn splat(value: bool) -> Self {
        Self { lanes: [value; N] }
    }

    /// Wrap per-lane predicates.
    #[inline]
    pub const fn from_array(lanes: [bool; N]) -> Self {
        Self { lanes }
    }

    /// Build a mask from a per-lane predicate.
    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> bool) -> Self {
        Self {
            lanes: std::array::from_fn(f),
        }
    }

    /// Mask whose first `count` lanes are set.
    #[inline]
    pub fn first_n(count: usize) -> Self {
        Self::from_fn(|lane| lane < count)
    }

    /// Copy out the per-lane predicates.
    #[inline]
    pub fn to_array(self) -> [bool; N] {
        self.lanes
    }

    #[inline]
    pub fn as_array(&self) -> &[bool; N] {
        &self.lanes
    }

    /// Predicate of a single lane.
    ///
    /// # Panics
    /// Panics if `lane >= N`.
    #[inline]
    pub fn test(&self, lane: usize) -> bool {
        self.lanes[lane]
    }

    #[inline]
    pub fn set(&mut self, lane: usize, value: bool) {
        self.lanes[lane] = value;
    }

    /// Population count.
    #[inline]
    pub fn count(&self) -> usize {
        self.lanes.iter().filter(|&&b| b).count()
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.lanes.iter().any(|&b| b)
    }

    #[inline]
    pub fn all(&self) -> bool {
        self.lanes.iter().all(|&b| b)
    }

    #[inline]
    pub fn none(&self) -> bool {
        !self.any()
    }

    /// Lowest active lane, if any.
    #[inline]
    pub fn first_set(&self) -> Option<usize> {
        self.lanes.iter().position(|&b| b)
    }

    /// Lane predicates in lane order.
    pub fn iter(self) -> impl Iterator<Item = bool> {
        self.lanes.into_iter()
    }

    /// Active lane positions in ascending order. The iterator owns its copy
    /// of the mask.
    pub fn iter_set(self) -> impl Iterator<Item = usize> {
        self.lanes
            .into_iter()
            .enumerate()
            .filter_map(|(lane, b)| b.then_some(lane))
    }
}

impl<const N: usize> Default for Mask<N> {
    fn default() -> Self {
        Self::splat(false)
    }
}

impl<const N: usize> From<[bool; N]> for Mask<N> {
    fn from(lanes: [bool; N]) -> Self {
        Self::from_array(lanes)
    }
}

impl<const N: usize> Index<usize> for Mask<N> {
    type Output = bool;

    fn index(&self, lane: usize) -> &bool {
        &self.lanes[lane]
    }
}

impl<const N: usize> BitAnd for Mask<N> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::from_fn(|lane| self.lanes[lane] & rhs.lanes[lane])
    }
}

impl<const N: usize> BitOr for Mask<N> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from_fn(|lane| self.lanes[lane] | rhs.lanes[lane])
    }
}

impl<const N: usize> BitXor for Mask<N> {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self::from_fn(|lane| self.lanes[lane] ^ rhs.lanes[lane])
    }
}

impl<const N: usize> Not for Mask<N> {
    type Output = Self;

    fn not(self) -> Self {
        Self::from_fn(|lane| !self.lanes[lane])
    }
}

impl<const N: usize> BitAndAssign for Mask<N> {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

impl<const N: usize> BitOrAssign for Mask<N> {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl<const N: usize> Serialize for Mask<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_lanes(&self.lanes, serializer)
    }
}

impl<'de, const N: usize> Deserialize<'de> for Mask<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_lanes::<bool, D, N>(deserializer).map(Self::from_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_and_queries() {
        let m = Mask::<8>::from_fn(|lane| lane % 3 == 0);
        assert_eq!(m.count(), 3);
        assert!(m.any());
        assert!(!m.all());
        assert_eq!(m.first_set(), Some(0));
        assert_eq!(m.iter_set().collect::<Vec<_>>(), vec![0, 3, 6]);
    }

    #[test]
    fn test_all_false() {
        let m = Mask::<4>::default();
        assert!(m.none());
        assert_eq!(m.first_set(), None);
        assert_eq!(m.iter_set().count(), 0);
    }

    #[test]
    fn test_logic_ops() {
        let a = Mask::from_array([true, true, false, false]);
        let b = Mask::from_array([true, false, true, false]);
        assert_eq!((a & b).to_array(), [true, false, false, false]);
        assert_eq!((a | b).to_array(), [true, true, true, false]);
        assert_eq!((a ^ b).to_array(), [false, true, true, false]);
        assert_eq!((!a).to_array(), [false, false, true, true]);
    }

    #[test]
    fn test_first_n() {
        assert_eq!(Mask::<4>::first_n(2).to_array(), [true, true, false, false]);
        assert!(Mask::<4>::first_n(9).all());
    }

    #[test]
    fn test_serde_json() {
        let m = Mask::from_array([true, false, true]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[true,false,true]");
        let back: Mask<3> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert!(serde_json::from_str::<Mask<3>>("[true]").is_err());
        assert!(serde_json::from_str::<Mask<3>>("[true,true,true,true]").is_err());
    }
}
