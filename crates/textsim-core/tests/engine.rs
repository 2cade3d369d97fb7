//! Engine pipeline tests: caching, invalidation, batches, async

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use textsim_core::algorithms::Levenshtein;
use textsim_core::memory::THREAD_BLOCK_SIZE;
use textsim_core::{
    AlgorithmConfig, AlgorithmFactory, AlgorithmType, AsyncExecutor, ConfigurationManager,
    EngineConfig, PreprocessingMode, SimilarityAlgorithm, SimilarityEngine, SimilarityError,
};

/// Engine whose Levenshtein constructor bumps `counter` on every build
fn counting_engine(settings: EngineConfig) -> (SimilarityEngine, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let factory = Arc::new(AlgorithmFactory::with_builtins());
    let seen = Arc::clone(&counter);
    factory.register(AlgorithmType::Levenshtein, move |config, pool| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Levenshtein::with_pool(config, pool)?) as Box<dyn SimilarityAlgorithm>)
    });

    let engine = SimilarityEngine::with_components(
        factory,
        Arc::new(AsyncExecutor::new(2)),
        Arc::new(ConfigurationManager::new()),
        settings,
    )
    .unwrap();
    (engine, counter)
}

#[test]
fn test_cache_serves_identical_calls() {
    let (engine, counter) = counting_engine(EngineConfig::default());

    let first = engine
        .calculate_similarity("kitten", "sitting", AlgorithmType::Levenshtein, None)
        .unwrap();
    let second = engine
        .calculate_similarity("kitten", "sitting", AlgorithmType::Levenshtein, None)
        .unwrap();

    assert_eq!(first.to_bits(), second.to_bits());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(engine.stats().cache_hits, 1);
}

#[test]
fn test_similarity_and_distance_are_cached_separately() {
    let (engine, counter) = counting_engine(EngineConfig::default());
    engine
        .calculate_similarity("abc", "abd", AlgorithmType::Levenshtein, None)
        .unwrap();
    assert_eq!(
        engine.calculate_distance("abc", "abd", AlgorithmType::Levenshtein, None),
        Ok(1)
    );
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_global_configuration_change_recomputes() {
    let (engine, counter) = counting_engine(EngineConfig::default());
    engine
        .calculate_distance("abc", "abd", AlgorithmType::Levenshtein, None)
        .unwrap();

    engine
        .set_global_configuration(AlgorithmConfig::default().with_ngram_size(3))
        .unwrap();
    engine
        .calculate_distance("abc", "abd", AlgorithmType::Levenshtein, None)
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalid_global_configuration_keeps_cache() {
    let (engine, _) = counting_engine(EngineConfig::default());
    engine
        .calculate_distance("abc", "abd", AlgorithmType::Levenshtein, None)
        .unwrap();

    let result = engine.set_global_configuration(AlgorithmConfig::default().with_ngram_size(0));
    assert!(matches!(result, Err(SimilarityError::InvalidConfiguration(_))));
    assert_eq!(engine.cached_results(), 1);
    assert_eq!(engine.global_configuration(), AlgorithmConfig::default());
}

#[test]
fn test_expired_entries_recompute() {
    let (engine, counter) = counting_engine(EngineConfig {
        cache_ttl: Duration::ZERO,
        ..EngineConfig::default()
    });
    for _ in 0..3 {
        engine
            .calculate_distance("abc", "abd", AlgorithmType::Levenshtein, None)
            .unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_per_call_config_is_part_of_the_key() {
    let (engine, counter) = counting_engine(EngineConfig::default());
    let insensitive = AlgorithmConfig::default().case_insensitive();

    assert_eq!(
        engine.calculate_distance("ABC", "abc", AlgorithmType::Levenshtein, None),
        Ok(3)
    );
    assert_eq!(
        engine.calculate_distance("ABC", "abc", AlgorithmType::Levenshtein, Some(&insensitive)),
        Ok(0)
    );
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_algorithm_override_applies() {
    let (engine, _) = counting_engine(EngineConfig::default());
    engine
        .configuration()
        .set_algorithm_config(
            AlgorithmType::Levenshtein,
            AlgorithmConfig::default().case_insensitive(),
        )
        .unwrap();
    assert_eq!(
        engine.calculate_distance("ABC", "abc", AlgorithmType::Levenshtein, None),
        Ok(0)
    );
    assert_eq!(
        engine.calculate_distance("ABC", "abc", AlgorithmType::DamerauLevenshtein, None),
        Ok(3)
    );
}

#[test]
fn test_unregistered_algorithm_is_reported() {
    let (engine, _) = counting_engine(EngineConfig::default());
    assert!(engine.factory().unregister(AlgorithmType::Cosine));
    assert!(!engine.supports_algorithm(AlgorithmType::Cosine));

    let err = engine
        .calculate_similarity("a", "b", AlgorithmType::Cosine, None)
        .unwrap_err();
    assert!(matches!(err, SimilarityError::InvalidConfiguration(_)));
    assert!(err.message().contains("unsupported"));
}

#[test]
fn test_missing_tversky_parameters() {
    let engine = SimilarityEngine::new();
    assert!(matches!(
        engine.calculate_similarity("abc", "abd", AlgorithmType::Tversky, None),
        Err(SimilarityError::InvalidConfiguration(_))
    ));

    let config = AlgorithmConfig::default().with_tversky(1.0, 1.0);
    let sim = engine
        .calculate_similarity("abc", "abd", AlgorithmType::Tversky, Some(&config))
        .unwrap();
    // Multisets {a,b,c} vs {a,b,d}: 2 / (2 + 1 + 1)
    assert!((sim - 0.5).abs() < 1e-12);

    let unbounded = AlgorithmConfig::default().with_tversky(f64::INFINITY, 1.0);
    assert!(matches!(
        engine.calculate_similarity("ab", "abc", AlgorithmType::Tversky, Some(&unbounded)),
        Err(SimilarityError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_call_preprocessing_overrides_global() {
    let engine = SimilarityEngine::new();
    engine
        .set_global_configuration(AlgorithmConfig::default().with_preprocessing(PreprocessingMode::Word))
        .unwrap();
    assert_eq!(
        engine.calculate_similarity("ab", "ba", AlgorithmType::Jaccard, None),
        Ok(0.0)
    );

    let chars = AlgorithmConfig::default().with_preprocessing(PreprocessingMode::Character);
    assert_eq!(
        engine.calculate_similarity("ab", "ba", AlgorithmType::Jaccard, Some(&chars)),
        Ok(1.0)
    );
}

#[test]
fn test_batches() {
    let engine = SimilarityEngine::new();
    let pairs = vec![
        ("kitten".to_string(), "sitting".to_string()),
        ("ab".to_string(), "abc".to_string()),
        ("".to_string(), "".to_string()),
    ];

    let distances = engine.calculate_distance_batch(&pairs, AlgorithmType::Hamming, None);
    assert!(distances[0].is_err());
    assert!(distances[1].is_err());
    assert_eq!(distances[2], Ok(0));

    let sequential = engine.calculate_similarity_batch(&pairs, AlgorithmType::Levenshtein, None);
    let parallel =
        engine.calculate_similarity_batch_parallel(pairs.clone(), AlgorithmType::Levenshtein, None);
    let deferred = engine
        .calculate_similarity_batch_async(pairs, AlgorithmType::Levenshtein, None)
        .wait()
        .unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!(sequential, deferred);
    assert_eq!(sequential[2], Ok(1.0));
}

#[test]
fn test_async_matches_sync() {
    let engine = SimilarityEngine::new();
    let handles: Vec<_> = AlgorithmType::ALL
        .iter()
        .filter(|&&a| a != AlgorithmType::Tversky)
        .map(|&algorithm| {
            (
                algorithm,
                engine.calculate_similarity_async("réunion", "reunion", algorithm, None),
            )
        })
        .collect();

    for (algorithm, handle) in handles {
        let expected = engine.calculate_similarity("réunion", "reunion", algorithm, None);
        assert_eq!(handle.wait(), expected, "{algorithm}");
    }
}

#[test]
fn test_shutdown_rejects_async_work() {
    let engine = SimilarityEngine::new();
    engine.shutdown();
    let handle = engine.calculate_similarity_async("a", "b", AlgorithmType::Jaro, None);
    assert!(matches!(handle.wait(), Err(SimilarityError::ThreadingError(_))));

    let results =
        engine.calculate_similarity_batch_parallel(vec![("a", "b")], AlgorithmType::Jaro, None);
    assert!(matches!(results[0], Err(SimilarityError::ThreadingError(_))));
}

#[test]
fn test_memory_usage_forgets_exited_callers() {
    let engine = SimilarityEngine::new();
    thread::scope(|s| {
        for i in 0..32 {
            let engine = &engine;
            s.spawn(move || {
                let b = format!("sitting{i}");
                engine
                    .calculate_distance("kitten", &b, AlgorithmType::Levenshtein, None)
                    .unwrap()
            })
            .join()
            .unwrap();
        }
    });
    engine.clear_caches();
    assert!(engine.memory_usage() <= THREAD_BLOCK_SIZE);

    engine
        .calculate_distance("kitten", "sitting", AlgorithmType::Levenshtein, None)
        .unwrap();
    assert!(engine.memory_usage() > 0);
}
