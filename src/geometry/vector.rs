//! `Vector3`: a fixed-size 3-element numeric tuple.
//!
//! Used both as standalone geometry and as an element type stored in a
//! [`Datastore`](crate::data::datastore::Datastore) column. The layout is
//! `repr(transparent)` over `[T; 3]`, so a `Vec3` column is a flat run of
//! `f64` triples that a dispatch layer can view as bytes.

use bytemuck::{Pod, Zeroable};
use num_traits::{Float, NumAssign};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

/// Mathematical 3-vector with elementwise arithmetic.
///
/// Comparison is lexicographic over the three components (derived from the
/// array ordering).
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Vector3<T>(pub [T; 3]);

/// The geometry vector used throughout the mesh.
pub type Vec3 = Vector3<f64>;

static_assertions::assert_eq_size!(Vec3, [f64; 3]);
static_assertions::assert_eq_align!(Vec3, f64);

// SAFETY: `Vector3<T>` is `repr(transparent)` over `[T; 3]`, which is `Pod`
// whenever `T` is.
unsafe impl<T: Pod> Zeroable for Vector3<T> {}
unsafe impl<T: Pod> Pod for Vector3<T> {}

impl<T: Copy> Vector3<T> {
    /// Construct from three components.
    #[inline]
    pub const fn new(x: T, y: T, z: T) -> Self {
        Vector3([x, y, z])
    }

    /// All three components set to `v`.
    #[inline]
    pub const fn splat(v: T) -> Self {
        Vector3([v, v, v])
    }

    #[inline]
    pub fn x(&self) -> T {
        self.0[0]
    }

    #[inline]
    pub fn y(&self) -> T {
        self.0[1]
    }

    #[inline]
    pub fn z(&self) -> T {
        self.0[2]
    }

    /// Overwrite every component with `v`.
    #[inline]
    pub fn fill(&mut self, v: T) {
        self.0 = [v, v, v];
    }

    #[inline]
    pub fn as_array(&self) -> &[T; 3] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.0.iter_mut()
    }
}

impl<T: Copy + PartialEq> Vector3<T> {
    /// True if every component equals `v`.
    #[inline]
    pub fn all_eq(&self, v: T) -> bool {
        self.0.iter().all(|c| *c == v)
    }
}

impl<T: Copy + NumAssign> Vector3<T> {
    /// Dot product.
    #[inline]
    pub fn dot(&self, rhs: &Self) -> T {
        self.0[0] * rhs.0[0] + self.0[1] * rhs.0[1] + self.0[2] * rhs.0[2]
    }

    /// Cross product `self x rhs`.
    #[inline]
    pub fn cross(&self, rhs: &Self) -> Self {
        let a = &self.0;
        let b = &rhs.0;
        Vector3([
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ])
    }
}

impl<T: Copy + Float + NumAssign> Vector3<T> {
    /// Euclidean length.
    #[inline]
    pub fn magnitude(&self) -> T {
        self.dot(self).sqrt()
    }

    /// Divide in place by the Euclidean magnitude.
    ///
    /// No zero check: a zero vector yields NaN components. Callers in
    /// per-element kernels guarantee a non-degenerate input.
    #[inline]
    pub fn normalize(&mut self) {
        let mag = self.magnitude();
        for c in self.0.iter_mut() {
            *c /= mag;
        }
    }

    /// Normalized copy of `self` (same zero-magnitude caveat as [`normalize`](Self::normalize)).
    #[inline]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl Vector3<f64> {
    /// Total lexicographic order using IEEE-754 `totalOrder` per component.
    pub fn total_cmp(&self, rhs: &Self) -> Ordering {
        self.0[0]
            .total_cmp(&rhs.0[0])
            .then_with(|| self.0[1].total_cmp(&rhs.0[1]))
            .then_with(|| self.0[2].total_cmp(&rhs.0[2]))
    }

    /// Bitwise equality of all components (distinguishes `0.0`/`-0.0`, equates identical NaNs).
    #[inline]
    pub fn bit_eq(&self, rhs: &Self) -> bool {
        self.0
            .iter()
            .zip(rhs.0.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Cross product of two vectors.
#[inline]
pub fn crossprod(a: &Vec3, b: &Vec3) -> Vec3 {
    a.cross(b)
}

/// Dot product of two vectors.
#[inline]
pub fn dotprod(a: &Vec3, b: &Vec3) -> f64 {
    a.dot(b)
}

/// Normalize `a` in place.
#[inline]
pub fn normalize(a: &mut Vec3) {
    a.normalize();
}

impl<T> From<[T; 3]> for Vector3<T> {
    fn from(v: [T; 3]) -> Self {
        Vector3(v)
    }
}

impl<T> From<Vector3<T>> for [T; 3] {
    fn from(v: Vector3<T>) -> Self {
        v.0
    }
}

impl<T> Index<usize> for Vector3<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.0[i]
    }
}

impl<T> IndexMut<usize> for Vector3<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.0[i]
    }
}

impl<T> IntoIterator for Vector3<T> {
    type Item = T;
    type IntoIter = std::array::IntoIter<T, 3>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Copy + Neg<Output = T>> Neg for Vector3<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Vector3([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl<T: fmt::Display> fmt::Display for Vector3<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}, {}>", self.0[0], self.0[1], self.0[2])
    }
}

// Elementwise vector/vector operators.
macro_rules! impl_vec_op {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident) => {
        impl<T: Copy + NumAssign> $OpAssign for Vector3<T> {
            #[inline]
            fn $op_assign(&mut self, rhs: Self) {
                for (a, b) in self.0.iter_mut().zip(rhs.0) {
                    a.$op_assign(b);
                }
            }
        }

        impl<T: Copy + NumAssign> $OpAssign<&Vector3<T>> for Vector3<T> {
            #[inline]
            fn $op_assign(&mut self, rhs: &Self) {
                self.$op_assign(*rhs);
            }
        }

        impl<T: Copy + NumAssign> $Op for Vector3<T> {
            type Output = Self;
            #[inline]
            fn $op(mut self, rhs: Self) -> Self {
                self.$op_assign(rhs);
                self
            }
        }

        impl<T: Copy + NumAssign> $Op<&Vector3<T>> for Vector3<T> {
            type Output = Self;
            #[inline]
            fn $op(mut self, rhs: &Self) -> Self {
                self.$op_assign(*rhs);
                self
            }
        }
    };
}

impl_vec_op!(Add, add, AddAssign, add_assign);
impl_vec_op!(Sub, sub, SubAssign, sub_assign);
impl_vec_op!(Mul, mul, MulAssign, mul_assign);
impl_vec_op!(Div, div, DivAssign, div_assign);

// Vector/scalar operators, one set per supported component type.
macro_rules! impl_scalar_ops {
    ($($t:ty),*) => {$(
        impl AddAssign<$t> for Vector3<$t> {
            #[inline]
            fn add_assign(&mut self, rhs: $t) {
                self.0.iter_mut().for_each(|c| *c += rhs);
            }
        }
        impl SubAssign<$t> for Vector3<$t> {
            #[inline]
            fn sub_assign(&mut self, rhs: $t) {
                self.0.iter_mut().for_each(|c| *c -= rhs);
            }
        }
        impl MulAssign<$t> for Vector3<$t> {
            #[inline]
            fn mul_assign(&mut self, rhs: $t) {
                self.0.iter_mut().for_each(|c| *c *= rhs);
            }
        }
        impl DivAssign<$t> for Vector3<$t> {
            #[inline]
            fn div_assign(&mut self, rhs: $t) {
                self.0.iter_mut().for_each(|c| *c /= rhs);
            }
        }
        impl Add<$t> for Vector3<$t> {
            type Output = Self;
            #[inline]
            fn add(mut self, rhs: $t) -> Self {
                self += rhs;
                self
            }
        }
        impl Sub<$t> for Vector3<$t> {
            type Output = Self;
            #[inline]
            fn sub(mut self, rhs: $t) -> Self {
                self -= rhs;
                self
            }
        }
        impl Mul<$t> for Vector3<$t> {
            type Output = Self;
            #[inline]
            fn mul(mut self, rhs: $t) -> Self {
                self *= rhs;
                self
            }
        }
        impl Div<$t> for Vector3<$t> {
            type Output = Self;
            #[inline]
            fn div(mut self, rhs: $t) -> Self {
                self /= rhs;
                self
            }
        }
        impl Mul<Vector3<$t>> for $t {
            type Output = Vector3<$t>;
            #[inline]
            fn mul(self, rhs: Vector3<$t>) -> Vector3<$t> {
                rhs * self
            }
        }
    )*};
}

impl_scalar_ops!(f64, f32, i32, i64);
