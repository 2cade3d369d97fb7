//! Shared algorithm template: quick answers, preprocessing, metrics

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::AlgorithmMetrics;
use crate::error::{DistanceResult, SimilarityError, SimilarityResult};
use crate::memory::{LocalPool, ScratchPool};
use crate::types::{AlgorithmConfig, AlgorithmType};
use crate::unicode::UnicodeString;

/// Outcome decided without running the algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAnswer {
    /// Both empty, identical, or equal ignoring case
    Same,
    /// Exactly one side is empty
    OneEmpty { other_len: usize },
}

impl QuickAnswer {
    pub fn check(config: &AlgorithmConfig, s1: &UnicodeString, s2: &UnicodeString) -> Option<Self> {
        match (s1.is_empty(), s2.is_empty()) {
            (true, true) => return Some(QuickAnswer::Same),
            (true, false) => return Some(QuickAnswer::OneEmpty { other_len: s2.len() }),
            (false, true) => return Some(QuickAnswer::OneEmpty { other_len: s1.len() }),
            (false, false) => {}
        }
        if s1 == s2 || (config.is_case_insensitive() && s1.eq_ignore_case(s2)) {
            return Some(QuickAnswer::Same);
        }
        None
    }

    pub fn similarity(self) -> f64 {
        match self {
            QuickAnswer::Same => 1.0,
            QuickAnswer::OneEmpty { .. } => 0.0,
        }
    }

    pub fn distance(self) -> u32 {
        match self {
            QuickAnswer::Same => 0,
            QuickAnswer::OneEmpty { other_len } => u32::try_from(other_len).unwrap_or(u32::MAX),
        }
    }
}

/// State and template logic embedded in every algorithm.
pub struct AlgorithmCore {
    algorithm: AlgorithmType,
    config: RwLock<AlgorithmConfig>,
    pool: Option<Arc<dyn ScratchPool>>,
    calls: AtomicU64,
    total_nanos: AtomicU64,
}

impl AlgorithmCore {
    /// Validate and adopt `config`. The selector is forced to `algorithm`.
    pub fn new(
        algorithm: AlgorithmType,
        mut config: AlgorithmConfig,
        pool: Option<Arc<dyn ScratchPool>>,
    ) -> Result<Self, SimilarityError> {
        config.algorithm = algorithm;
        config.validate()?;
        Ok(Self {
            algorithm,
            config: RwLock::new(config),
            pool,
            calls: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
        })
    }

    pub fn algorithm(&self) -> AlgorithmType {
        self.algorithm
    }

    pub fn config(&self) -> AlgorithmConfig {
        self.config.read().clone()
    }

    pub fn update(&self, mut config: AlgorithmConfig) -> Result<(), SimilarityError> {
        config.algorithm = self.algorithm;
        if let Err(e) = config.validate() {
            tracing::warn!(algorithm = %self.algorithm, error = %e, "rejected configuration update");
            return Err(e);
        }
        *self.config.write() = config;
        Ok(())
    }

    /// Scratch pool for the calling thread, if the algorithm was given one.
    pub fn local_pool(&self) -> Option<LocalPool<'_>> {
        self.pool.as_ref().map(|p| p.local())
    }

    pub fn metrics(&self) -> AlgorithmMetrics {
        AlgorithmMetrics {
            call_count: self.calls.load(Ordering::Relaxed),
            total_time: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
        }
    }

    /// Run a similarity computation through the shared template.
    ///
    /// `compute` receives a configuration snapshot and the case-folded
    /// inputs; it only sees non-trivial pairs.
    pub fn similarity<F>(&self, s1: &UnicodeString, s2: &UnicodeString, compute: F) -> SimilarityResult
    where
        F: FnOnce(&AlgorithmConfig, &UnicodeString, &UnicodeString) -> SimilarityResult,
    {
        self.run(s1, s2, QuickAnswer::similarity, compute)
    }

    /// Distance counterpart of [`AlgorithmCore::similarity`].
    pub fn distance<F>(&self, s1: &UnicodeString, s2: &UnicodeString, compute: F) -> DistanceResult
    where
        F: FnOnce(&AlgorithmConfig, &UnicodeString, &UnicodeString) -> DistanceResult,
    {
        self.run(s1, s2, QuickAnswer::distance, compute)
    }

    fn run<T, Q, F>(
        &self,
        s1: &UnicodeString,
        s2: &UnicodeString,
        quick: Q,
        compute: F,
    ) -> Result<T, SimilarityError>
    where
        Q: FnOnce(QuickAnswer) -> T,
        F: FnOnce(&AlgorithmConfig, &UnicodeString, &UnicodeString) -> Result<T, SimilarityError>,
    {
        let start = Instant::now();
        let config = self.config();

        let result = match QuickAnswer::check(&config, s1, s2) {
            Some(answer) => Ok(quick(answer)),
            None => {
                let a = preprocess(s1, &config);
                let b = preprocess(s2, &config);
                panic::catch_unwind(AssertUnwindSafe(|| compute(&config, &*a, &*b)))
                    .unwrap_or_else(|payload| {
                        Err(SimilarityError::ComputationOverflow(panic_message(&*payload)))
                    })
            }
        };

        self.record(start.elapsed());
        result
    }

    fn record(&self, elapsed: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Apply case folding per configuration.
pub fn preprocess<'a>(input: &'a UnicodeString, config: &AlgorithmConfig) -> Cow<'a, UnicodeString> {
    if config.is_case_insensitive() && !input.is_empty() {
        Cow::Owned(input.to_lower())
    } else {
        Cow::Borrowed(input)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "algorithm panicked".to_string()
    }
}
