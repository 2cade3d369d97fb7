//! Benchmarks for the similarity kernels and the engine pipeline

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use textsim_core::{
    AlgorithmConfig, AlgorithmFactory, AlgorithmType, EngineConfig, MemoryPool,
    SimilarityEngine, UnicodeString,
};

const LEFT: &str = "The quick brown fox jumps over the lazy dog near the riverbank";
const RIGHT: &str = "The quick brown cat leaps over the lazy dogs by the riverside";

fn config(algorithm: AlgorithmType) -> AlgorithmConfig {
    match algorithm {
        AlgorithmType::Tversky => AlgorithmConfig::new(algorithm).with_tversky(0.5, 0.5),
        _ => AlgorithmConfig::new(algorithm),
    }
}

fn bench_algorithms(c: &mut Criterion) {
    let factory = AlgorithmFactory::with_builtins();
    let pool = Arc::new(MemoryPool::new());
    let (a, b) = (UnicodeString::from(LEFT), UnicodeString::from(RIGHT));

    let mut group = c.benchmark_group("algorithms");
    group.throughput(Throughput::Bytes((LEFT.len() + RIGHT.len()) as u64));

    for algorithm in AlgorithmType::ALL {
        let instance = factory
            .create_with_pool(algorithm, config(algorithm), Some(pool.clone()))
            .unwrap();
        group.bench_function(algorithm.as_str(), |bench| {
            bench.iter(|| {
                let sim = instance.calculate_similarity(black_box(&a), black_box(&b));
                let _ = pool.reset();
                black_box(sim)
            })
        });
    }

    group.finish();
}

fn bench_banded_levenshtein(c: &mut Criterion) {
    let factory = AlgorithmFactory::with_builtins();
    let unbounded = factory
        .create(AlgorithmType::Levenshtein, AlgorithmConfig::default())
        .unwrap();
    let banded = factory
        .create(AlgorithmType::Levenshtein, AlgorithmConfig::default().with_threshold(3.0))
        .unwrap();
    let (a, b) = (UnicodeString::from(LEFT), UnicodeString::from(RIGHT));

    let mut group = c.benchmark_group("levenshtein");

    group.bench_function("unbounded", |bench| {
        bench.iter(|| black_box(unbounded.calculate_distance(black_box(&a), black_box(&b))))
    });
    group.bench_function("threshold_3", |bench| {
        bench.iter(|| black_box(banded.calculate_distance(black_box(&a), black_box(&b))))
    });

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let cached = SimilarityEngine::new();
    let uncached = SimilarityEngine::with_config(EngineConfig {
        cache_capacity: 0,
        ..EngineConfig::default()
    })
    .unwrap();

    let mut group = c.benchmark_group("engine");

    group.bench_function("cache_hit", |bench| {
        bench.iter(|| {
            black_box(cached.calculate_similarity(
                black_box(LEFT),
                black_box(RIGHT),
                AlgorithmType::JaroWinkler,
                None,
            ))
        })
    });
    group.bench_function("uncached", |bench| {
        bench.iter(|| {
            black_box(uncached.calculate_similarity(
                black_box(LEFT),
                black_box(RIGHT),
                AlgorithmType::JaroWinkler,
                None,
            ))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_algorithms, bench_banded_levenshtein, bench_engine);
criterion_main!(benches);
