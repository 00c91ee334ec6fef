//! Benchmarks for distance computations.
//!
//! Search and clustering cost is dominated by these kernels, evaluated on
//! the standard 56-component shape descriptor.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use shapeseek::distance::{cosine_distance, earth_movers_distance, euclidean_distance};
use shapeseek::{
    search, DistanceConfig, DistanceFunction, FeatureDatabase, FeatureLayout, FeatureVector,
    MeshStatistics, SearchLimit,
};

// === Generators ===

fn random_descriptors(n: usize) -> Vec<FeatureVector> {
    let mut rng = StdRng::seed_from_u64(42);
    let len = FeatureLayout::standard().len();
    (0..n)
        .map(|_| FeatureVector::new((0..len).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect()))
        .collect()
}

fn random_database(n: usize) -> FeatureDatabase {
    let members = random_descriptors(n)
        .into_iter()
        .enumerate()
        .map(|(i, v)| MeshStatistics::new(i as u32, "?", v))
        .collect();
    FeatureDatabase::new(FeatureLayout::standard().clone(), members).expect("valid layout")
}

// === Benchmarks ===

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");
    let vectors = random_descriptors(2);
    let (a, b) = (vectors[0].as_slice(), vectors[1].as_slice());
    group.throughput(Throughput::Elements(a.len() as u64));

    group.bench_function("euclidean", |bench| {
        bench.iter(|| euclidean_distance(black_box(a), black_box(b)));
    });
    group.bench_function("cosine", |bench| {
        bench.iter(|| cosine_distance(black_box(a), black_box(b)));
    });
    group.bench_function("earth_movers", |bench| {
        bench.iter(|| earth_movers_distance(black_box(a), black_box(b)));
    });

    group.finish();
}

fn bench_composites(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");
    let layout = FeatureLayout::standard();
    let vectors = random_descriptors(2);

    let configs = [
        ("euclidean", DistanceConfig::uniform(DistanceFunction::Euclidean)),
        (
            "euclidean+emd",
            DistanceConfig::new(&[DistanceFunction::Euclidean, DistanceFunction::EarthMovers], layout)
                .expect("two functions"),
        ),
    ];
    for (name, config) in &configs {
        group.bench_with_input(BenchmarkId::from_parameter(name), config, |bench, config| {
            bench.iter(|| config.distance(black_box(&vectors[0]), black_box(&vectors[1])));
        });
    }

    group.finish();
}

fn bench_exhaustive_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("exhaustive_search");
    let config = DistanceConfig::new(
        &[DistanceFunction::Euclidean, DistanceFunction::EarthMovers],
        FeatureLayout::standard(),
    )
    .expect("two functions");

    for n in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*n as u64));
        let db = random_database(*n);
        let query = random_descriptors(1).remove(0);

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |bench, _| {
            bench.iter(|| search(&db, black_box(&query), SearchLimit::TopK(10), &config));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernels, bench_composites, bench_exhaustive_search);
criterion_main!(benches);
