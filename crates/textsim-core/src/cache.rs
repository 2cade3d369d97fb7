//! TTL- and size-bounded result cache
//!
//! Keys fingerprint the operation, the algorithm, every configuration field
//! that can change a result, and the raw input pair. Only successful results
//! are stored.

use std::time::{Duration, Instant};

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::types::{AlgorithmConfig, AlgorithmType, CaseSensitivity, NormalizationMode, PreprocessingMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Similarity,
    Distance,
}

/// Result-relevant part of an [`AlgorithmConfig`], with floats compared by
/// bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConfigFingerprint {
    preprocessing: PreprocessingMode,
    normalization: NormalizationMode,
    case_sensitivity: CaseSensitivity,
    ngram_size: u32,
    threshold: Option<u64>,
    alpha: Option<u64>,
    beta: Option<u64>,
    prefix_weight: Option<u64>,
    prefix_length: Option<u32>,
}

impl From<&AlgorithmConfig> for ConfigFingerprint {
    fn from(config: &AlgorithmConfig) -> Self {
        let bits = |v: Option<f64>| v.map(f64::to_bits);
        Self {
            preprocessing: config.preprocessing,
            normalization: config.normalization,
            case_sensitivity: config.case_sensitivity,
            ngram_size: config.ngram_size,
            threshold: bits(config.threshold),
            alpha: bits(config.alpha),
            beta: bits(config.beta),
            prefix_weight: bits(config.prefix_weight),
            prefix_length: config.prefix_length,
        }
    }
}

/// Fingerprint of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: Operation,
    algorithm: AlgorithmType,
    config: ConfigFingerprint,
    s1: Box<str>,
    s2: Box<str>,
}

impl CacheKey {
    pub fn new(operation: Operation, config: &AlgorithmConfig, s1: &str, s2: &str) -> Self {
        Self {
            operation,
            algorithm: config.algorithm,
            config: ConfigFingerprint::from(config),
            s1: s1.into(),
            s2: s2.into(),
        }
    }
}

struct Entry {
    value: f64,
    inserted: Instant,
}

/// Mutex-guarded map from [`CacheKey`] to a numeric result.
pub struct ResultCache {
    entries: Mutex<AHashMap<CacheKey, Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl ResultCache {
    /// A cache holding at most `capacity` entries for `ttl` each.
    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(AHashMap::new()),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<f64> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.inserted.elapsed() < self.ttl {
            return Some(entry.value);
        }
        entries.remove(key);
        None
    }

    pub fn insert(&self, key: CacheKey, value: f64) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            self.evict(&mut entries);
        }
        entries.insert(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Purge expired entries; if still full, drop the oldest half.
    fn evict(&self, entries: &mut AHashMap<CacheKey, Entry>) {
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted.elapsed() < ttl);

        if entries.len() >= self.capacity {
            let mut stamps: Vec<Instant> = entries.values().map(|e| e.inserted).collect();
            stamps.sort_unstable();
            let drop_count = (entries.len() / 2).max(1);
            let cutoff = stamps[drop_count - 1];
            let mut dropped = 0;
            entries.retain(|_, entry| {
                if dropped < drop_count && entry.inserted <= cutoff {
                    dropped += 1;
                    false
                } else {
                    true
                }
            });
        }

        tracing::debug!(before, after = entries.len(), "result cache eviction sweep");
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let cleared = entries.len();
        entries.clear();
        if cleared > 0 {
            tracing::debug!(cleared, "result cache invalidated");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}
