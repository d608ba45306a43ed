use std::fmt::Debug;
use std::io::Cursor;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use soa_mesh::data::{Column, DsHandle, FieldType, Idx};
use soa_mesh::entity::{Corners, Edges, Entity, Faces, Points, Sides, Zones};
use soa_mesh::geometry::Vec3;
use soa_mesh::mesh_error::MeshError;

/// Overwrite every field of `ds` with seeded random contents.
fn fill_random(ds: &DsHandle, rng: &mut SmallRng) {
    let schema = ds.borrow().schema();
    let n = ds.borrow().len();
    for (name, ty) in schema {
        match ty {
            FieldType::Int => {
                for v in ds.field_mut::<i32>(&name).unwrap().iter_mut() {
                    *v = rng.r#gen();
                }
            }
            FieldType::Real => {
                for v in ds.field_mut::<f64>(&name).unwrap().iter_mut() {
                    *v = rng.r#gen::<f64>() * 1e6 - 5e5;
                }
            }
            FieldType::Vec3 => {
                for v in ds.field_mut::<Vec3>(&name).unwrap().iter_mut() {
                    *v = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
                }
            }
            FieldType::Index => {
                for v in ds.field_mut::<Idx>(&name).unwrap().iter_mut() {
                    *v = Idx::from_raw(rng.gen_range(-1..64));
                }
            }
            FieldType::IndexList => {
                let mut lists = ds.field_mut::<Vec<Idx>>(&name).unwrap();
                for i in 0..n {
                    let k = rng.gen_range(0..5);
                    let list: Vec<Idx> = (0..k).map(|_| Idx::from_raw(rng.gen_range(0..64))).collect();
                    lists.set(i, &list).unwrap();
                }
            }
        }
    }
}

fn write_then_read<E: Entity + PartialEq + Debug>(
    local: usize,
    ghost: usize,
    seed: u64,
) -> Result<(E, E), MeshError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut original = E::standalone()?;
    original.resize(local, local + ghost, ghost)?;
    fill_random(original.ds(), &mut rng);

    let mut buf = Vec::new();
    original.write(&mut buf)?;
    let mut restored = E::standalone()?;
    restored.read(&mut Cursor::new(&buf))?;
    Ok((original, restored))
}

fn snapshot(ds: &DsHandle) -> Vec<(String, Column)> {
    let store = ds.borrow();
    store
        .field_names()
        .map(|n| (n.to_owned(), store.column(n).unwrap().clone()))
        .collect()
}

fn is_prefix(short: &Column, long: &Column) -> bool {
    match (short, long) {
        (Column::IndexList(a), Column::IndexList(b)) => a.iter().eq(b.iter().take(a.len())),
        _ => {
            let (a, b) = (short.as_bytes(), long.as_bytes());
            a.len() <= b.len() && a == &b[..a.len()]
        }
    }
}

#[test]
fn every_kind_round_trips() {
    let (a, b) = write_then_read::<Points>(8, 2, 1).unwrap();
    assert_eq!(a, b);
    let (a, b) = write_then_read::<Edges>(8, 2, 2).unwrap();
    assert_eq!(a, b);
    let (a, b) = write_then_read::<Faces>(8, 2, 3).unwrap();
    assert_eq!(a, b);
    let (a, b) = write_then_read::<Zones>(8, 2, 4).unwrap();
    assert_eq!(a, b);
    let (a, b) = write_then_read::<Sides>(8, 2, 5).unwrap();
    assert_eq!(a, b);
    let (a, b) = write_then_read::<Corners>(8, 2, 6).unwrap();
    assert_eq!(a, b);
}

#[test]
fn empty_entity_round_trips() {
    let (a, b) = write_then_read::<Corners>(0, 0, 0).unwrap();
    assert_eq!(a, b);
    assert_eq!(b.total(), 0);
}

#[test]
fn user_declared_fields_travel_with_the_entity() {
    let mut z = Zones::standalone().unwrap();
    z.ds().borrow_mut().declare_tagged("pressure", "real").unwrap();
    z.resize(3, 3, 0).unwrap();
    z.field_mut::<f64>("pressure").unwrap()[2] = 101_325.0;
    let mut buf = Vec::new();
    z.write(&mut buf).unwrap();

    let mut plain = Zones::standalone().unwrap();
    assert!(matches!(
        plain.read(&mut Cursor::new(&buf)),
        Err(MeshError::Format { .. })
    ));

    let mut extended = Zones::standalone().unwrap();
    extended.ds().borrow_mut().declare("pressure", FieldType::Real).unwrap();
    extended.read(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(extended, z);
}

#[test]
fn mismatched_counts_are_rejected() {
    let mut s = Sides::standalone().unwrap();
    assert_eq!(
        s.resize(3, 10, 2),
        Err(MeshError::InvalidPartition {
            local: 3,
            total: 10,
            ghost: 2
        })
    );
    assert_eq!(s.total(), 0);
}

proptest! {
    #[test]
    fn round_trip_is_exact(local in 0usize..40, ghost in 0usize..10, seed in any::<u64>()) {
        let (a, b) = write_then_read::<Sides>(local, ghost, seed).unwrap();
        prop_assert_eq!(&a, &b);
        let (a, b) = write_then_read::<Faces>(local, ghost, seed).unwrap();
        prop_assert_eq!(&a, &b);
    }

    #[test]
    fn single_mutation_breaks_equality(n in 1usize..30, pick in any::<prop::sample::Index>(), seed in any::<u64>()) {
        let (a, b) = write_then_read::<Corners>(n, 0, seed).unwrap();
        let i = pick.index(n);
        b.field_mut::<f64>("volume").unwrap()[i] += 1.0;
        prop_assert_ne!(&a, &b);
        prop_assert_ne!(&b, &a);
    }

    #[test]
    fn shrinking_keeps_the_prefix(
        local in 0usize..30,
        ghost in 0usize..10,
        keep_local in 0usize..30,
        keep_ghost in 0usize..10,
        seed in any::<u64>(),
    ) {
        let total = local + ghost;
        let keep_local = keep_local.min(total);
        let keep_ghost = keep_ghost.min(total - keep_local);
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut c = Corners::standalone().unwrap();
        c.resize(local, total, ghost).unwrap();
        fill_random(c.ds(), &mut rng);
        let before = snapshot(c.ds());

        c.resize(keep_local, keep_local + keep_ghost, keep_ghost).unwrap();
        let after = snapshot(c.ds());
        prop_assert_eq!(after.len(), before.len());
        for ((name, new), (_, old)) in after.iter().zip(&before) {
            prop_assert_eq!(new.len(), keep_local + keep_ghost);
            prop_assert!(is_prefix(new, old), "field `{}` lost its prefix", name);
        }
    }
}
