//! SimilarityEngine - single entry point over factory, configuration, cache and executor
//!
//! Every call runs the same pipeline:
//!
//! 1. reject inputs above the size limit
//! 2. merge default, global, per-algorithm and per-call configuration
//! 3. answer from the result cache when a live entry exists
//! 4. otherwise build the algorithm through the factory, compute, cache the
//!    value, and rewind the calling thread's scratch pool
//!
//! Async variants run the identical pipeline on the executor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::SimilarityAlgorithm;
use crate::cache::{CacheKey, Operation, ResultCache};
use crate::config::ConfigurationManager;
use crate::error::{DistanceResult, SimilarityError, SimilarityResult};
use crate::executor::{AsyncExecutor, TaskHandle};
use crate::factory::AlgorithmFactory;
use crate::memory::{ScratchPool, ThreadAffinePool, THREAD_BLOCK_SIZE};
use crate::types::{AlgorithmConfig, AlgorithmType};
use crate::unicode::UnicodeString;

/// Default cap on either input, in bytes
pub const DEFAULT_MAX_INPUT_BYTES: usize = 100_000;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Executor workers; 0 means one per available core
    pub worker_threads: usize,
    /// Cached results kept before eviction; 0 disables the cache
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    /// Used when the merged configuration has no `max_string_length`
    pub max_input_bytes: usize,
    /// Block size of each worker thread's scratch pool
    pub pool_block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            cache_capacity: 10_000,
            cache_ttl: Duration::from_secs(300),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            pool_block_size: THREAD_BLOCK_SIZE,
        }
    }
}

/// Counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_operations: u64,
    pub cache_hits: u64,
}

/// State shared with tasks running on the executor.
struct EngineCore {
    factory: Arc<AlgorithmFactory>,
    config: Arc<ConfigurationManager>,
    cache: ResultCache,
    pool: Arc<ThreadAffinePool>,
    max_input_bytes: usize,
    total_operations: AtomicU64,
    cache_hits: AtomicU64,
}

impl EngineCore {
    fn similarity(
        &self,
        s1: &str,
        s2: &str,
        algorithm: AlgorithmType,
        call: Option<&AlgorithmConfig>,
    ) -> SimilarityResult {
        self.run(Operation::Similarity, s1, s2, algorithm, call, |alg, a, b| {
            alg.calculate_similarity(a, b)
        })
    }

    fn distance(
        &self,
        s1: &str,
        s2: &str,
        algorithm: AlgorithmType,
        call: Option<&AlgorithmConfig>,
    ) -> DistanceResult {
        let value = self.run(Operation::Distance, s1, s2, algorithm, call, |alg, a, b| {
            alg.calculate_distance(a, b).map(f64::from)
        })?;
        Ok(value as u32)
    }

    fn run<F>(
        &self,
        operation: Operation,
        s1: &str,
        s2: &str,
        algorithm: AlgorithmType,
        call: Option<&AlgorithmConfig>,
        compute: F,
    ) -> Result<f64, SimilarityError>
    where
        F: FnOnce(&dyn SimilarityAlgorithm, &UnicodeString, &UnicodeString) -> Result<f64, SimilarityError>,
    {
        self.total_operations.fetch_add(1, Ordering::Relaxed);

        let config = self.config.merge(algorithm, call);
        let limit = config.max_string_length.unwrap_or(self.max_input_bytes);
        if s1.len() > limit || s2.len() > limit {
            return Err(SimilarityError::InvalidInput(format!(
                "input exceeds maximum length of {limit} bytes"
            )));
        }

        let key = CacheKey::new(operation, &config, s1, s2);
        if let Some(value) = self.cache.get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let a = UnicodeString::new(s1);
        let b = UnicodeString::new(s2);
        let pool: Arc<dyn ScratchPool> = self.pool.clone();
        let instance = self.factory.create_with_pool(algorithm, config, Some(pool))?;
        let result = compute(instance.as_ref(), &a, &b);
        drop(instance);

        if let Err(e) = self.pool.reset_local() {
            tracing::debug!(error = %e, "scratch pool not rewound");
        }

        let value = result?;
        self.cache.insert(key, value);
        Ok(value)
    }
}

/// Thread-safe similarity engine
///
/// Owns its factory, configuration manager, result cache, executor and
/// per-thread scratch pools. Components can be shared between engines via
/// [`SimilarityEngine::with_components`].
pub struct SimilarityEngine {
    core: Arc<EngineCore>,
    executor: Arc<AsyncExecutor>,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityEngine {
    /// Create an engine with default configuration and built-in algorithms
    pub fn new() -> Self {
        let settings = EngineConfig::default();
        let executor = Arc::new(AsyncExecutor::new(settings.worker_threads));
        Self::assemble(
            Arc::new(AlgorithmFactory::with_builtins()),
            executor,
            Arc::new(ConfigurationManager::new()),
            Arc::new(ThreadAffinePool::new()),
            &settings,
        )
    }

    /// Create with custom engine configuration
    pub fn with_config(settings: EngineConfig) -> Result<Self, SimilarityError> {
        let executor = Arc::new(AsyncExecutor::new(settings.worker_threads));
        Self::with_components(
            Arc::new(AlgorithmFactory::with_builtins()),
            executor,
            Arc::new(ConfigurationManager::new()),
            settings,
        )
    }

    /// Create from explicitly constructed components.
    ///
    /// `settings.worker_threads` is ignored; the executor is used as given.
    pub fn with_components(
        factory: Arc<AlgorithmFactory>,
        executor: Arc<AsyncExecutor>,
        config: Arc<ConfigurationManager>,
        settings: EngineConfig,
    ) -> Result<Self, SimilarityError> {
        let pool = Arc::new(ThreadAffinePool::with_block_size(settings.pool_block_size)?);
        Ok(Self::assemble(factory, executor, config, pool, &settings))
    }

    fn assemble(
        factory: Arc<AlgorithmFactory>,
        executor: Arc<AsyncExecutor>,
        config: Arc<ConfigurationManager>,
        pool: Arc<ThreadAffinePool>,
        settings: &EngineConfig,
    ) -> Self {
        tracing::info!(
            workers = executor.thread_count(),
            cache_capacity = settings.cache_capacity,
            algorithms = factory.supported_algorithms().len(),
            "similarity engine ready"
        );
        Self {
            core: Arc::new(EngineCore {
                factory,
                config,
                cache: ResultCache::new(settings.cache_capacity, settings.cache_ttl),
                pool,
                max_input_bytes: settings.max_input_bytes,
                total_operations: AtomicU64::new(0),
                cache_hits: AtomicU64::new(0),
            }),
            executor,
        }
    }

    pub fn calculate_similarity(
        &self,
        s1: &str,
        s2: &str,
        algorithm: AlgorithmType,
        config: Option<&AlgorithmConfig>,
    ) -> SimilarityResult {
        self.core.similarity(s1, s2, algorithm, config)
    }

    pub fn calculate_distance(
        &self,
        s1: &str,
        s2: &str,
        algorithm: AlgorithmType,
        config: Option<&AlgorithmConfig>,
    ) -> DistanceResult {
        self.core.distance(s1, s2, algorithm, config)
    }

    pub fn calculate_similarity_async(
        &self,
        s1: impl Into<String>,
        s2: impl Into<String>,
        algorithm: AlgorithmType,
        config: Option<AlgorithmConfig>,
    ) -> TaskHandle<f64> {
        let core = Arc::clone(&self.core);
        let (s1, s2) = (s1.into(), s2.into());
        self.executor
            .submit(move || core.similarity(&s1, &s2, algorithm, config.as_ref()))
    }

    pub fn calculate_distance_async(
        &self,
        s1: impl Into<String>,
        s2: impl Into<String>,
        algorithm: AlgorithmType,
        config: Option<AlgorithmConfig>,
    ) -> TaskHandle<u32> {
        let core = Arc::clone(&self.core);
        let (s1, s2) = (s1.into(), s2.into());
        self.executor
            .submit(move || core.distance(&s1, &s2, algorithm, config.as_ref()))
    }

    /// Similarity of every pair on the calling thread. One failing pair does
    /// not affect the others.
    pub fn calculate_similarity_batch<A, B>(
        &self,
        pairs: &[(A, B)],
        algorithm: AlgorithmType,
        config: Option<&AlgorithmConfig>,
    ) -> Vec<SimilarityResult>
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        pairs
            .iter()
            .map(|(a, b)| self.core.similarity(a.as_ref(), b.as_ref(), algorithm, config))
            .collect()
    }

    pub fn calculate_distance_batch<A, B>(
        &self,
        pairs: &[(A, B)],
        algorithm: AlgorithmType,
        config: Option<&AlgorithmConfig>,
    ) -> Vec<DistanceResult>
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        pairs
            .iter()
            .map(|(a, b)| self.core.distance(a.as_ref(), b.as_ref(), algorithm, config))
            .collect()
    }

    /// Batch similarity with one executor task per pair. Results keep input
    /// order.
    pub fn calculate_similarity_batch_parallel<A, B>(
        &self,
        pairs: Vec<(A, B)>,
        algorithm: AlgorithmType,
        config: Option<AlgorithmConfig>,
    ) -> Vec<SimilarityResult>
    where
        A: Into<String>,
        B: Into<String>,
    {
        let handles: Vec<TaskHandle<f64>> = pairs
            .into_iter()
            .map(|(a, b)| self.calculate_similarity_async(a, b, algorithm, config.clone()))
            .collect();
        handles.into_iter().map(TaskHandle::wait).collect()
    }

    /// The whole batch as a single executor task, pairs run in order.
    pub fn calculate_similarity_batch_async<A, B>(
        &self,
        pairs: Vec<(A, B)>,
        algorithm: AlgorithmType,
        config: Option<AlgorithmConfig>,
    ) -> TaskHandle<Vec<SimilarityResult>>
    where
        A: Into<String>,
        B: Into<String>,
    {
        let prepared = pairs.into_iter().map(|(a, b)| Ok((a.into(), b.into()))).collect();
        self.submit_batch(prepared, algorithm, config, std::convert::identity)
    }

    /// Pairs that already failed are passed through in place. Each result is
    /// converted with `finish` on the worker.
    pub(crate) fn submit_batch<R, F>(
        &self,
        pairs: Vec<Result<(String, String), SimilarityError>>,
        algorithm: AlgorithmType,
        config: Option<AlgorithmConfig>,
        finish: F,
    ) -> TaskHandle<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(SimilarityResult) -> R + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        self.executor.submit(move || {
            Ok(pairs
                .into_iter()
                .map(|pair| {
                    let result = pair
                        .and_then(|(a, b)| core.similarity(&a, &b, algorithm, config.as_ref()));
                    finish(result)
                })
                .collect())
        })
    }

    /// Replace the global configuration and drop every cached result.
    pub fn set_global_configuration(&self, config: AlgorithmConfig) -> Result<(), SimilarityError> {
        self.core.config.set_global_configuration(config)?;
        self.core.cache.clear();
        Ok(())
    }

    pub fn global_configuration(&self) -> AlgorithmConfig {
        self.core.config.global_configuration()
    }

    pub fn configuration(&self) -> &ConfigurationManager {
        &self.core.config
    }

    pub fn factory(&self) -> &AlgorithmFactory {
        &self.core.factory
    }

    /// Drop cached results and rewind every idle scratch pool.
    pub fn clear_caches(&self) {
        self.core.cache.clear();
        if let Err(e) = self.core.pool.reset_all() {
            tracing::debug!(error = %e, "some scratch pools were busy during clear");
        }
    }

    pub fn cached_results(&self) -> usize {
        self.core.cache.len()
    }

    /// Bytes reserved by scratch pools across all threads.
    pub fn memory_usage(&self) -> usize {
        self.core.pool.total_capacity_bytes()
    }

    pub fn supported_algorithms(&self) -> Vec<AlgorithmType> {
        self.core.factory.supported_algorithms()
    }

    pub fn supports_algorithm(&self, algorithm: AlgorithmType) -> bool {
        self.core.factory.supports(algorithm)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_operations: self.core.total_operations.load(Ordering::Relaxed),
            cache_hits: self.core.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Stop the executor. Synchronous calls keep working; async calls made
    /// afterwards resolve to a threading error.
    pub fn shutdown(&self) {
        self.executor.shutdown();
        tracing::info!("similarity engine shut down");
    }
}
