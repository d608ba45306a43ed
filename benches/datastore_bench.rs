use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use soa_mesh::data::{Datastore, FieldType};
use soa_mesh::geometry::Vec3;

fn store_with_fields(n: usize, seed: u64) -> Datastore {
    let mut ds = Datastore::new();
    ds.declare("volume", FieldType::Real).unwrap();
    ds.declare("centroid", FieldType::Vec3).unwrap();
    ds.declare("zone", FieldType::Index).unwrap();
    ds.declare("mask", FieldType::Int).unwrap();
    ds.resize(n).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    for v in ds.field_mut::<f64>("volume").unwrap() {
        *v = rng.r#gen();
    }
    for c in ds.field_mut::<Vec3>("centroid").unwrap() {
        *c = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
    }
    ds
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("datastore_resize");
    for &n in &[1_000usize, 100_000] {
        group.bench_with_input(BenchmarkId::new("grow_shrink", n), &n, |b, &n| {
            let mut ds = store_with_fields(n, 7);
            b.iter(|| {
                ds.resize(2 * n).unwrap();
                ds.resize(n).unwrap();
                black_box(ds.len());
            });
        });
    }
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("datastore_serialize");
    for &n in &[1_000usize, 100_000] {
        let ds = store_with_fields(n, 11);
        let mut buf = Vec::new();
        ds.write(&mut buf).unwrap();

        group.bench_with_input(BenchmarkId::new("write", n), &n, |b, _| {
            let mut out = Vec::with_capacity(buf.len());
            b.iter(|| {
                out.clear();
                ds.write(&mut out).unwrap();
                black_box(out.len());
            });
        });

        group.bench_with_input(BenchmarkId::new("read", n), &n, |b, _| {
            let mut target = store_with_fields(0, 0);
            b.iter(|| {
                target.read(&mut buf.as_slice()).unwrap();
                black_box(target.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resize, bench_serialize);
criterion_main!(benches);
