//! Tetrahedron and triangle kernels over [`Vec3`].
//!
//! A side of a hexahedral zone is the tetrahedron
//! `[zone centroid, face centroid, p1, p2]`, where `p1 -> p2` is an edge of
//! the face traversed counter-clockwise when seen from outside the zone.

use super::vector::Vec3;

/// Signed volume of the tetrahedron `(a, b, c, d)`.
///
/// Positive when `d` lies on the side of triangle `(a, b, c)` that its
/// right-handed normal points to.
#[inline]
pub fn signed_tet_volume(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    ab.dot(&ac.cross(&ad)) / 6.0
}

/// Area vector of the triangle `(a, b, c)`: half the cross product of two edges.
#[inline]
pub fn triangle_area_vector(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(&(c - a)) * 0.5
}

/// Arithmetic mean of a set of points. Returns the origin for an empty set.
pub fn centroid<I>(points: I) -> Vec3
where
    I: IntoIterator<Item = Vec3>,
{
    let mut sum = Vec3::splat(0.0);
    let mut n = 0usize;
    for p in points {
        sum += p;
        n += 1;
    }
    if n == 0 { sum } else { sum / n as f64 }
}

/// Volume and outward unit normal of a side.
///
/// `zc` is the zone centroid, `fc` the face centroid and `p1 -> p2` the
/// face edge. The normal is that of the face triangle `(fc, p1, p2)`,
/// flipped if needed so it points away from `zc`. A degenerate face
/// triangle yields a NaN normal.
pub fn side_geometry(zc: Vec3, fc: Vec3, p1: Vec3, p2: Vec3) -> (f64, Vec3) {
    let volume = signed_tet_volume(fc, p1, p2, zc).abs();
    let mut normal = triangle_area_vector(fc, p1, p2);
    if normal.dot(&(fc - zc)) < 0.0 {
        normal = -normal;
    }
    normal.normalize();
    (volume, normal)
}
