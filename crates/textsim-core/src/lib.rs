//! textsim Core Engine
//!
//! Unicode-aware string similarity: thirteen algorithms behind one trait,
//! bump-allocated scratch memory, a layered configuration manager, a result
//! cache and a worker pool for asynchronous calls.
//!
//! # Features
//!
//! - `simd` - Runtime-detected AVX2 dot product for character histograms
//!   (scalar fallback everywhere else, identical results)
//!
//! # Example
//!
//! ```rust
//! use textsim_core::{AlgorithmConfig, AlgorithmType, SimilarityEngine};
//!
//! let engine = SimilarityEngine::new();
//!
//! let d = engine
//!     .calculate_distance("kitten", "sitting", AlgorithmType::Levenshtein, None)
//!     .unwrap();
//! assert_eq!(d, 3);
//!
//! let config = AlgorithmConfig::default().case_insensitive();
//! let sim = engine
//!     .calculate_similarity("ABC", "abc", AlgorithmType::JaroWinkler, Some(&config))
//!     .unwrap();
//! assert_eq!(sim, 1.0);
//! ```

pub mod algorithms;
pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod factory;
pub mod memory;
pub mod tracing;
pub mod types;
pub mod unicode;

// Re-export main types at crate root
pub use algorithms::{AlgorithmMetrics, SimilarityAlgorithm};
pub use config::ConfigurationManager;
pub use engine::{EngineConfig, EngineStats, SimilarityEngine};
pub use error::{DistanceResult, ErrorCode, SimilarityError, SimilarityResult};
pub use executor::{AsyncExecutor, TaskHandle};
pub use factory::AlgorithmFactory;
pub use memory::{MemoryPool, PoolError, ScratchPool, ThreadAffinePool};
pub use types::{
    AlgorithmConfig, AlgorithmType, CaseSensitivity, NormalizationMode, PreprocessingMode,
};
pub use unicode::UnicodeString;
