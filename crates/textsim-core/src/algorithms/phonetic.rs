//! Jaro and Jaro-Winkler
//!
//! Distances are reported on the fixed 0..=1000 scale:
//! `round((1 - similarity) * 1000)`.

use super::{algorithm_struct, delegate_to_core, scaled_distance, SimilarityAlgorithm};
use crate::error::{DistanceResult, SimilarityError, SimilarityResult};
use crate::memory::{MemoryPool, Scratch};
use crate::types::{AlgorithmConfig, AlgorithmType};
use crate::unicode::UnicodeString;

/// Boost applies only when plain Jaro reaches this score
pub const DEFAULT_BOOST_THRESHOLD: f64 = 0.7;
pub const DEFAULT_PREFIX_WEIGHT: f64 = 0.1;
pub const DEFAULT_PREFIX_LENGTH: u32 = 4;
const MAX_PREFIX_WEIGHT: f64 = 0.25;

algorithm_struct!(
    /// Jaro similarity: matches within a sliding window, penalised by
    /// transpositions.
    Jaro => AlgorithmType::Jaro
);

algorithm_struct!(
    /// Jaro with a bonus for a shared prefix of up to four codepoints.
    JaroWinkler => AlgorithmType::JaroWinkler
);

impl SimilarityAlgorithm for Jaro {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |_, a, b| {
            let local = self.core.local_pool();
            jaro(a.chars(), b.chars(), local.as_deref())
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core.distance(s1, s2, |_, a, b| {
            let local = self.core.local_pool();
            jaro(a.chars(), b.chars(), local.as_deref()).map(scaled_distance)
        })
    }

    delegate_to_core!();
}

impl SimilarityAlgorithm for JaroWinkler {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| {
            let local = self.core.local_pool();
            jaro_winkler(a.chars(), b.chars(), config, local.as_deref())
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core.distance(s1, s2, |config, a, b| {
            let local = self.core.local_pool();
            jaro_winkler(a.chars(), b.chars(), config, local.as_deref()).map(scaled_distance)
        })
    }

    delegate_to_core!();
}

/// Plain Jaro similarity over codepoints.
pub fn jaro(s1: &[char], s2: &[char], pool: Option<&MemoryPool>) -> Result<f64, SimilarityError> {
    let (len1, len2) = (s1.len(), s2.len());
    if len1 == 0 && len2 == 0 {
        return Ok(1.0);
    }
    if len1 == 0 || len2 == 0 {
        return Ok(0.0);
    }

    let range = (len1.max(len2) / 2).saturating_sub(1);
    let mut matched1 = Scratch::filled(pool, len1, false)?;
    let mut matched2 = Scratch::filled(pool, len2, false)?;

    let mut matches = 0usize;
    for (i, &c) in s1.iter().enumerate() {
        let lo = i.saturating_sub(range);
        let hi = (i + range).min(len2 - 1);
        if lo > hi {
            continue;
        }
        for j in lo..=hi {
            if !matched2[j] && s2[j] == c {
                matched1[i] = true;
                matched2[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return Ok(0.0);
    }

    // Walk matched characters of both sides in order; mismatches pair up
    let mut half_transpositions = 0usize;
    let mut k = 0;
    for (i, &c) in s1.iter().enumerate() {
        if !matched1[i] {
            continue;
        }
        while k < len2 && !matched2[k] {
            k += 1;
        }
        if k < len2 {
            if s2[k] != c {
                half_transpositions += 1;
            }
            k += 1;
        }
    }
    let transpositions = (half_transpositions / 2) as f64;

    let m = matches as f64;
    let score = (m / len1 as f64 + m / len2 as f64 + (m - transpositions) / m) / 3.0;
    Ok(score.clamp(0.0, 1.0))
}

/// Jaro-Winkler with the configured boost threshold, prefix cap and weight.
pub fn jaro_winkler(
    s1: &[char],
    s2: &[char],
    config: &AlgorithmConfig,
    pool: Option<&MemoryPool>,
) -> Result<f64, SimilarityError> {
    let base = jaro(s1, s2, pool)?;
    if base < config.threshold.unwrap_or(DEFAULT_BOOST_THRESHOLD) {
        return Ok(base);
    }

    let cap = config.prefix_length.unwrap_or(DEFAULT_PREFIX_LENGTH) as usize;
    let prefix = s1
        .iter()
        .zip(s2)
        .take(cap)
        .take_while(|(a, b)| a == b)
        .count();
    if prefix == 0 {
        return Ok(base);
    }

    let weight = config
        .prefix_weight
        .unwrap_or(DEFAULT_PREFIX_WEIGHT)
        .clamp(0.0, MAX_PREFIX_WEIGHT);
    Ok((base + prefix as f64 * weight * (1.0 - base)).clamp(0.0, 1.0))
}
