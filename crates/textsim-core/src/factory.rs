//! Algorithm registry: algorithm type -> constructor
//!
//! Factories are normally constructed explicitly and owned by an engine.
//! [`AlgorithmFactory::global`] offers a shared, lazily built registry for
//! callers that want one.

use std::sync::{Arc, OnceLock};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::algorithms::{
    Chebyshev, Cosine, DamerauLevenshtein, Euclidean, Hamming, Jaccard, Jaro, JaroWinkler,
    Levenshtein, Manhattan, Overlap, SimilarityAlgorithm, SorensenDice, Tversky,
};
use crate::error::SimilarityError;
use crate::memory::ScratchPool;
use crate::types::{AlgorithmConfig, AlgorithmType};

/// Builds an algorithm instance from a configuration and an optional pool.
pub type AlgorithmConstructor = Arc<
    dyn Fn(
            AlgorithmConfig,
            Option<Arc<dyn ScratchPool>>,
        ) -> Result<Box<dyn SimilarityAlgorithm>, SimilarityError>
        + Send
        + Sync,
>;

/// Thread-safe map from algorithm type to constructor.
///
/// Lookups take a shared lock; the constructor runs after the lock is
/// released.
pub struct AlgorithmFactory {
    constructors: RwLock<AHashMap<AlgorithmType, AlgorithmConstructor>>,
    default_pool: RwLock<Option<Arc<dyn ScratchPool>>>,
}

impl Default for AlgorithmFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl AlgorithmFactory {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(AHashMap::new()),
            default_pool: RwLock::new(None),
        }
    }

    /// A registry with every built-in algorithm registered.
    pub fn with_builtins() -> Self {
        let factory = Self::new();
        factory.register_builtins();
        factory
    }

    /// Process-wide registry with the built-ins, created on first use.
    pub fn global() -> &'static AlgorithmFactory {
        static GLOBAL: OnceLock<AlgorithmFactory> = OnceLock::new();
        GLOBAL.get_or_init(AlgorithmFactory::with_builtins)
    }

    pub fn register_builtins(&self) {
        let mut constructors = self.constructors.write();
        for algorithm in AlgorithmType::ALL {
            constructors.insert(algorithm, builtin(algorithm));
        }
    }

    /// Register (or replace) the constructor for `algorithm`.
    pub fn register<F>(&self, algorithm: AlgorithmType, constructor: F)
    where
        F: Fn(
                AlgorithmConfig,
                Option<Arc<dyn ScratchPool>>,
            ) -> Result<Box<dyn SimilarityAlgorithm>, SimilarityError>
            + Send
            + Sync
            + 'static,
    {
        let replaced = self
            .constructors
            .write()
            .insert(algorithm, Arc::new(constructor))
            .is_some();
        tracing::debug!(%algorithm, replaced, "registered algorithm");
    }

    /// Remove the constructor for `algorithm`. Returns whether one existed.
    pub fn unregister(&self, algorithm: AlgorithmType) -> bool {
        let removed = self.constructors.write().remove(&algorithm).is_some();
        if removed {
            tracing::debug!(%algorithm, "unregistered algorithm");
        }
        removed
    }

    /// Instantiate `algorithm` with the factory's default pool.
    pub fn create(
        &self,
        algorithm: AlgorithmType,
        config: AlgorithmConfig,
    ) -> Result<Box<dyn SimilarityAlgorithm>, SimilarityError> {
        let pool = self.default_pool();
        self.create_with_pool(algorithm, config, pool)
    }

    /// Instantiate `algorithm` with an explicit pool (or none).
    pub fn create_with_pool(
        &self,
        algorithm: AlgorithmType,
        mut config: AlgorithmConfig,
        pool: Option<Arc<dyn ScratchPool>>,
    ) -> Result<Box<dyn SimilarityAlgorithm>, SimilarityError> {
        let constructor = self
            .constructors
            .read()
            .get(&algorithm)
            .cloned()
            .ok_or_else(|| {
                SimilarityError::InvalidConfiguration(format!(
                    "unsupported algorithm type: {algorithm}"
                ))
            })?;
        config.algorithm = algorithm;
        constructor(config, pool)
    }

    pub fn supports(&self, algorithm: AlgorithmType) -> bool {
        self.constructors.read().contains_key(&algorithm)
    }

    /// Registered algorithm types in discriminant order.
    pub fn supported_algorithms(&self) -> Vec<AlgorithmType> {
        let mut algorithms: Vec<AlgorithmType> = self.constructors.read().keys().copied().collect();
        algorithms.sort();
        algorithms
    }

    pub fn set_default_pool(&self, pool: Option<Arc<dyn ScratchPool>>) {
        *self.default_pool.write() = pool;
    }

    pub fn default_pool(&self) -> Option<Arc<dyn ScratchPool>> {
        self.default_pool.read().clone()
    }
}

fn constructor<A, F>(make: F) -> AlgorithmConstructor
where
    A: SimilarityAlgorithm + 'static,
    F: Fn(AlgorithmConfig, Option<Arc<dyn ScratchPool>>) -> Result<A, SimilarityError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(move |config, pool| {
        let algorithm: Box<dyn SimilarityAlgorithm> = Box::new(make(config, pool)?);
        Ok(algorithm)
    })
}

fn builtin(algorithm: AlgorithmType) -> AlgorithmConstructor {
    match algorithm {
        AlgorithmType::Levenshtein => constructor(Levenshtein::with_pool),
        AlgorithmType::DamerauLevenshtein => constructor(DamerauLevenshtein::with_pool),
        AlgorithmType::Hamming => constructor(Hamming::with_pool),
        AlgorithmType::Jaro => constructor(Jaro::with_pool),
        AlgorithmType::JaroWinkler => constructor(JaroWinkler::with_pool),
        AlgorithmType::Jaccard => constructor(Jaccard::with_pool),
        AlgorithmType::SorensenDice => constructor(SorensenDice::with_pool),
        AlgorithmType::Overlap => constructor(Overlap::with_pool),
        AlgorithmType::Tversky => constructor(Tversky::with_pool),
        AlgorithmType::Cosine => constructor(Cosine::with_pool),
        AlgorithmType::Euclidean => constructor(Euclidean::with_pool),
        AlgorithmType::Manhattan => constructor(Manhattan::with_pool),
        AlgorithmType::Chebyshev => constructor(Chebyshev::with_pool),
    }
}
