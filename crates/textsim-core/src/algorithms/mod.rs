//! Similarity algorithms
//!
//! Every algorithm implements [`SimilarityAlgorithm`]. Shared behaviour
//! (quick answers, case folding, configuration locking, call metrics) lives
//! in [`base::AlgorithmCore`], which each variant embeds.
//!
//! # Families
//!
//! - Edit distance: [`Levenshtein`], [`DamerauLevenshtein`] (restricted/OSA), [`Hamming`]
//! - Phonetic: [`Jaro`], [`JaroWinkler`]
//! - Token set: [`Jaccard`], [`SorensenDice`], [`Overlap`], [`Tversky`]
//! - Vector space: [`Cosine`], [`Euclidean`], [`Manhattan`], [`Chebyshev`]
//!
//! # Example
//!
//! ```
//! use textsim_core::algorithms::{Levenshtein, SimilarityAlgorithm};
//! use textsim_core::{AlgorithmConfig, UnicodeString};
//!
//! let lev = Levenshtein::new(AlgorithmConfig::default()).unwrap();
//! let d = lev
//!     .calculate_distance(&UnicodeString::from("kitten"), &UnicodeString::from("sitting"))
//!     .unwrap();
//! assert_eq!(d, 3);
//! ```

pub mod base;
pub mod edit;
pub mod phonetic;
pub mod simd;
pub mod token;
pub mod tokenize;
pub mod vector;

use std::time::Duration;

use crate::error::{DistanceResult, SimilarityError, SimilarityResult};
use crate::types::{AlgorithmConfig, AlgorithmType};
use crate::unicode::UnicodeString;

pub use base::AlgorithmCore;
pub use edit::{DamerauLevenshtein, Hamming, Levenshtein};
pub use phonetic::{Jaro, JaroWinkler};
pub use token::{Jaccard, Overlap, SorensenDice, Tversky};
pub use vector::{Chebyshev, Cosine, Euclidean, Manhattan};

/// Snapshot of an algorithm's call counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlgorithmMetrics {
    pub call_count: u64,
    pub total_time: Duration,
}

impl AlgorithmMetrics {
    pub fn average_time(&self) -> Duration {
        if self.call_count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_time.as_nanos() / u128::from(self.call_count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Contract shared by every similarity algorithm.
///
/// Implementations are thread-safe: configuration sits behind a
/// reader/writer lock and metrics are atomic, so a single instance can be
/// shared across worker threads.
pub trait SimilarityAlgorithm: Send + Sync {
    /// Similarity in `0.0..=maximum_similarity()`.
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult;

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult;

    fn algorithm_type(&self) -> AlgorithmType;

    fn algorithm_name(&self) -> &'static str {
        self.algorithm_type().display_name()
    }

    /// Current configuration (a copy).
    fn configuration(&self) -> AlgorithmConfig;

    /// Replace the configuration. Invalid configurations are rejected and
    /// the previous one stays in effect.
    fn update_configuration(&self, config: AlgorithmConfig) -> Result<(), SimilarityError>;

    fn metrics(&self) -> AlgorithmMetrics;

    fn supports_early_termination(&self) -> bool {
        false
    }

    fn is_symmetric(&self) -> bool {
        true
    }

    fn is_metric(&self) -> bool {
        false
    }

    fn maximum_similarity(&self) -> f64 {
        1.0
    }

    fn maximum_distance(&self) -> u32 {
        u32::MAX
    }
}

/// Expands to the trait methods every variant forwards to its `core`.
macro_rules! delegate_to_core {
    () => {
        fn algorithm_type(&self) -> $crate::types::AlgorithmType {
            self.core.algorithm()
        }

        fn configuration(&self) -> $crate::types::AlgorithmConfig {
            self.core.config()
        }

        fn update_configuration(
            &self,
            config: $crate::types::AlgorithmConfig,
        ) -> Result<(), $crate::error::SimilarityError> {
            self.core.update(config)
        }

        fn metrics(&self) -> $crate::algorithms::AlgorithmMetrics {
            self.core.metrics()
        }
    };
}

/// Declares an algorithm struct wrapping an [`AlgorithmCore`] with the
/// usual constructors.
macro_rules! algorithm_struct {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        pub struct $name {
            core: $crate::algorithms::base::AlgorithmCore,
        }

        impl $name {
            pub fn new(
                config: $crate::types::AlgorithmConfig,
            ) -> Result<Self, $crate::error::SimilarityError> {
                Self::with_pool(config, None)
            }

            pub fn with_pool(
                config: $crate::types::AlgorithmConfig,
                pool: Option<std::sync::Arc<dyn $crate::memory::ScratchPool>>,
            ) -> Result<Self, $crate::error::SimilarityError> {
                Ok(Self {
                    core: $crate::algorithms::base::AlgorithmCore::new($kind, config, pool)?,
                })
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("config", &self.core.config())
                    .finish()
            }
        }
    };
}

pub(crate) use algorithm_struct;
pub(crate) use delegate_to_core;

/// `round((1 - similarity) * 1000)`, the integer distance used by
/// non-edit algorithms.
pub(crate) fn scaled_distance(similarity: f64) -> u32 {
    ((1.0 - similarity.clamp(0.0, 1.0)) * 1000.0).round() as u32
}
