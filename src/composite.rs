//! Nested composites (structure-of-arrays trees of packets)
//!
//! A composite is a fixed tree whose leaves are `Packet<Leaf, N>` values, for
//! example `Matrix<Packet<f32, 8>, 3>` or `[[Packet<u32, 4>; 3]; 2]`. Its
//! scalar counterpart (`Matrix<f32, 3>`, `[[u32; 3]; 2]`) is a [`Layout`].
//!
//! # Leaf traversal
//!
//! Both traits expose their leaves as a flat, ordered list:
//!
//! ```text
//! Composite<N>:  leaf(0) .. leaf(LEAVES-1)  ->  &Packet<Leaf, N>
//! Layout:        leaf(0) .. leaf(LEAVES-1)  ->  Leaf
//! ```
//!
//! Leaf `k` of a composite holds, lane by lane, leaf `k` of `N` scalar
//! elements. Every memory operation is written once against this traversal,
//! so any new shape gets gather/scatter/compress/prefetch/slice by listing
//! its leaves. All leaves share the const `N`, so one index/mask pair always
//! addresses the whole tree.

use crate::packet::Packet;
use crate::scalar::Scalar;
use std::fmt::Debug;
use std::ops::{Add, Index, IndexMut, Sub};

/// Scalar-shaped element: what a base slice holds and what [`slice`] returns.
pub trait Layout: Copy + Debug + PartialEq {
    type Leaf: Scalar;

    /// Number of scalar leaves.
    const LEAVES: usize;

    /// Every leaf zero.
    fn zeroed() -> Self;

    fn leaf(&self, k: usize) -> Self::Leaf;

    fn leaf_mut(&mut self, k: usize) -> &mut Self::Leaf;

    /// Every leaf set to `value`.
    fn filled(value: Self::Leaf) -> Self {
        let mut out = Self::zeroed();
        for k in 0..Self::LEAVES {
            *out.leaf_mut(k) = value;
        }
        out
    }
}

/// Lane-parallel tree of `Packet<Self::Leaf, N>` leaves.
pub trait Composite<const N: usize>: Clone + Debug + PartialEq {
    type Leaf: Scalar;

    /// Scalar shape of one lane; leaf `k` here maps to leaf `k` there.
    type Element: Layout<Leaf = Self::Leaf>;

    /// Number of packet leaves; always equals `Self::Element::LEAVES`.
    const LEAVES: usize;

    /// Every lane of every leaf zero.
    fn zero() -> Self;

    fn leaf(&self, k: usize) -> &Packet<Self::Leaf, N>;

    fn leaf_mut(&mut self, k: usize) -> &mut Packet<Self::Leaf, N>;

    /// Broadcast `value` to every lane of every leaf.
    fn fill(value: Self::Leaf) -> Self {
        let mut out = Self::zero();
        out.for_each_leaf_mut(|_, leaf| *leaf = Packet::splat(value));
        out
    }

    fn for_each_leaf(&self, mut f: impl FnMut(usize, &Packet<Self::Leaf, N>)) {
        for k in 0..Self::LEAVES {
            f(k, self.leaf(k));
        }
    }

    fn for_each_leaf_mut(&mut self, mut f: impl FnMut(usize, &mut Packet<Self::Leaf, N>)) {
        for k in 0..Self::LEAVES {
            f(k, self.leaf_mut(k));
        }
    }

    /// Project lane `lane` of every leaf into one scalar element.
    ///
    /// # Panics
    /// Panics if `lane >= N`.
    fn slice(&self, lane: usize) -> Self::Element {
        debug_assert_eq!(Self::LEAVES, <Self::Element as Layout>::LEAVES);
        let mut out = Self::Element::zeroed();
        self.for_each_leaf(|k, leaf| *out.leaf_mut(k) = leaf.lane(lane));
        out
    }

    /// Write one scalar element into lane `lane` of every leaf.
    fn set_slice(&mut self, lane: usize, value: &Self::Element) {
        self.for_each_leaf_mut(|k, leaf| leaf.set_lane(lane, value.leaf(k)));
    }

    /// Build lane by lane from scalar elements.
    fn from_elements(mut f: impl FnMut(usize) -> Self::Element) -> Self {
        let mut out = Self::zero();
        for lane in 0..N {
            out.set_slice(lane, &f(lane));
        }
        out
    }
}

/// Lane `lane` of `value` as a scalar element.
#[inline]
pub fn slice<C: Composite<N>, const N: usize>(value: &C, lane: usize) -> C::Element {
    value.slice(lane)
}

/// All-zero composite.
#[inline]
pub fn zero<C: Composite<N>, const N: usize>() -> C {
    C::zero()
}

/// Composite with every lane of every leaf equal to `value`.
#[inline]
pub fn fill<C: Composite<N>, const N: usize>(value: C::Leaf) -> C {
    C::fill(value)
}

// ============================================================================
// Scalars and packets (single leaf)
// ============================================================================

macro_rules! impl_scalar_layout {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Layout for $ty {
                type Leaf = $ty;
                const LEAVES: usize = 1;

                #[inline(always)]
                fn zeroed() -> Self {
                    <$ty as Scalar>::ZERO
                }

                #[inline(always)]
                fn leaf(&self, k: usize) -> $ty {
                    debug_assert_eq!(k, 0);
                    *self
                }

                #[inline(always)]
                fn leaf_mut(&mut self, k: usize) -> &mut $ty {
                    debug_assert_eq!(k, 0);
                    self
                }
            }
        )*
    };
}

impl_scalar_layout!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: Scalar + Layout<Leaf = T>, const N: usize> Composite<N> for Packet<T, N> {
    type Leaf = T;
    type Element = T;
    const LEAVES: usize = 1;

    #[inline]
    fn zero() -> Self {
        Packet::zero()
    }

    #[inline]
    fn leaf(&self, k: usize) -> &Packet<T, N> {
        debug_assert_eq!(k, 0);
        self
    }

    #[inline]
    fn leaf_mut(&mut self, k: usize) -> &mut Packet<T, N> {
        debug_assert_eq!(k, 0);
        self
    }
}

// ============================================================================
// Fixed arrays
// ============================================================================

impl<L: Layout, const M: usize> Layout for [L; M] {
    type Leaf = L::Leaf;
    const LEAVES: usize = M * L::LEAVES;

    fn zeroed() -> Self {
        std::array::from_fn(|_| L::zeroed())
    }

    #[inline]
    fn leaf(&self, k: usize) -> L::Leaf {
        self[k / L::LEAVES].leaf(k % L::LEAVES)
    }

    #[inline]
    fn leaf_mut(&mut self, k: usize) -> &mut L::Leaf {
        self[k / L::LEAVES].leaf_mut(k % L::LEAVES)
    }
}

impl<C: Composite<N>, const M: usize, const N: usize> Composite<N> for [C; M] {
    type Leaf = C::Leaf;
    type Element = [C::Element; M];
    const LEAVES: usize = M * C::LEAVES;

    fn zero() -> Self {
        std::array::from_fn(|_| C::zero())
    }

    #[inline]
    fn leaf(&self, k: usize) -> &Packet<C::Leaf, N> {
        self[k / C::LEAVES].leaf(k % C::LEAVES)
    }

    #[inline]
    fn leaf_mut(&mut self, k: usize) -> &mut Packet<C::Leaf, N> {
        self[k / C::LEAVES].leaf_mut(k % C::LEAVES)
    }
}

// ============================================================================
// Square matrices
// ============================================================================

/// Square `M × M` matrix stored by columns: `m[col][row]`.
///
/// `Matrix<f32, 3>` is a [`Layout`]; `Matrix<Packet<f32, 8>, 3>` is the
/// matching [`Composite`] holding eight matrices lane by lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix<T, const M: usize> {
    cols: [[T; M]; M],
}

impl<T: Copy, const M: usize> Matrix<T, M> {
    pub const SIZE: usize = M;

    pub const fn from_cols(cols: [[T; M]; M]) -> Self {
        Self { cols }
    }

    /// Build from row-major entries.
    pub fn from_rows(rows: [[T; M]; M]) -> Self {
        Self {
            cols: std::array::from_fn(|c| std::array::from_fn(|r| rows[r][c])),
        }
    }

    pub fn cols(&self) -> &[[T; M]; M] {
        &self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.cols[col][row]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.cols[col][row] = value;
    }

    pub fn transpose(&self) -> Self {
        Self::from_rows(self.cols)
    }
}

impl<T, const M: usize> Index<usize> for Matrix<T, M> {
    type Output = [T; M];

    /// Column `col`.
    fn index(&self, col: usize) -> &[T; M] {
        &self.cols[col]
    }
}

impl<T, const M: usize> IndexMut<usize> for Matrix<T, M> {
    fn index_mut(&mut self, col: usize) -> &mut [T; M] {
        &mut self.cols[col]
    }
}

impl<T: Copy + Add<Output = T>, const M: usize> Add for Matrix<T, M> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cols: std::array::from_fn(|c| std::array::from_fn(|r| self.cols[c][r] + rhs.cols[c][r])),
        }
    }
}

impl<T: Copy + Sub<Output = T>, const M: usize> Sub for Matrix<T, M> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            cols: std::array::from_fn(|c| std::array::from_fn(|r| self.cols[c][r] - rhs.cols[c][r])),
        }
    }
}

impl<L: Layout, const M: usize> Layout for Matrix<L, M> {
    type Leaf = L::Leaf;
    const LEAVES: usize = <[[L; M]; M] as Layout>::LEAVES;

    fn zeroed() -> Self {
        Self {
            cols: Layout::zeroed(),
        }
    }

    #[inline]
    fn leaf(&self, k: usize) -> L::Leaf {
        Layout::leaf(&self.cols, k)
    }

    #[inline]
    fn leaf_mut(&mut self, k: usize) -> &mut L::Leaf {
        Layout::leaf_mut(&mut self.cols, k)
    }
}

impl<C: Composite<N>, const M: usize, const N: usize> Composite<N> for Matrix<C, M> {
    type Leaf = C::Leaf;
    type Element = Matrix<C::Element, M>;
    const LEAVES: usize = <[[C; M]; M] as Composite<N>>::LEAVES;

    fn zero() -> Self {
        Self {
            cols: Composite::<N>::zero(),
        }
    }

    #[inline]
    fn leaf(&self, k: usize) -> &Packet<C::Leaf, N> {
        Composite::<N>::leaf(&self.cols, k)
    }

    #[inline]
    fn leaf_mut(&mut self, k: usize) -> &mut Packet<C::Leaf, N> {
        Composite::<N>::leaf_mut(&mut self.cols, k)
    }
}
