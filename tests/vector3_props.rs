use proptest::prelude::*;

use soa_mesh::geometry::{Vec3, Vector3, crossprod, dotprod, normalize};

fn int_vec() -> impl Strategy<Value = Vec3> {
    (-1000i32..1000, -1000i32..1000, -1000i32..1000)
        .prop_map(|(x, y, z)| Vec3::new(x as f64, y as f64, z as f64))
}

proptest! {
    #[test]
    fn add_then_sub_is_identity(a in int_vec(), b in int_vec()) {
        prop_assert_eq!((a + b) - b, a);
    }

    #[test]
    fn scalar_ops_invert(a in int_vec(), s in 1i32..64) {
        let s = s as f64;
        prop_assert_eq!((a * s) / s, a);
        prop_assert_eq!((a + s) - s, a);
    }

    #[test]
    fn cross_is_orthogonal(a in int_vec(), b in int_vec()) {
        let c = crossprod(&a, &b);
        prop_assert_eq!(dotprod(&c, &a), 0.0);
        prop_assert_eq!(dotprod(&c, &b), 0.0);
    }

    #[test]
    fn ordering_is_lexicographic(a in (-5i64..5, -5i64..5, -5i64..5), b in (-5i64..5, -5i64..5, -5i64..5)) {
        let va = Vector3::new(a.0, a.1, a.2);
        let vb = Vector3::new(b.0, b.1, b.2);
        prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
    }
}

#[test]
fn normalize_gives_unit_length() {
    let mut v = Vec3::new(3.0, 0.0, 4.0);
    normalize(&mut v);
    assert_eq!(v, Vec3::new(0.6, 0.0, 0.8));
}

#[test]
fn zero_vector_normalizes_to_nan() {
    let mut v = Vec3::splat(0.0);
    v.normalize();
    assert!(v.iter().all(|c| c.is_nan()));
}

#[test]
fn display_uses_angle_brackets() {
    assert_eq!(Vec3::new(1.0, -2.5, 0.0).to_string(), "<1, -2.5, 0>");
}
