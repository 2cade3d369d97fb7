//! Token-set family: Jaccard, Sorensen-Dice, Overlap, Tversky
//!
//! Inputs are tokenized per the configured preprocessing mode and counted
//! into multisets. Two empty token multisets score 1.0, one empty scores
//! 0.0. Distances use the fixed 0..=1000 scale.

use super::tokenize::{self, Counter};
use super::{algorithm_struct, delegate_to_core, scaled_distance, SimilarityAlgorithm};
use crate::error::{DistanceResult, SimilarityError, SimilarityResult};
use crate::types::{AlgorithmConfig, AlgorithmType, PreprocessingMode};
use crate::unicode::UnicodeString;

algorithm_struct!(
    /// `|A ∩ B| / |A ∪ B|`. Word mode compares distinct words; every other
    /// mode compares multisets.
    Jaccard => AlgorithmType::Jaccard
);

algorithm_struct!(
    /// `2|A ∩ B| / (|A| + |B|)`
    SorensenDice => AlgorithmType::SorensenDice
);

algorithm_struct!(
    /// `|A ∩ B| / min(|A|, |B|)`
    Overlap => AlgorithmType::Overlap
);

algorithm_struct!(
    /// `|A ∩ B| / (|A ∩ B| + α|A - B| + β|B - A|)`.
    ///
    /// Requires `alpha` and `beta`. Asymmetric unless they are equal.
    Tversky => AlgorithmType::Tversky
);

/// Tokenize both sides and score them, handling the empty cases.
fn score_tokens<F>(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString, score: F) -> f64
where
    F: FnOnce(&Counter<'_>, &Counter<'_>) -> f64,
{
    let ca = tokenize::counter(a.chars(), config);
    let cb = tokenize::counter(b.chars(), config);
    match (ca.is_empty(), cb.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => score(&ca, &cb).clamp(0.0, 1.0),
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn jaccard(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> f64 {
    score_tokens(config, a, b, |ca, cb| {
        let (intersection, union) = if config.preprocessing == PreprocessingMode::Word {
            tokenize::set_sizes(ca, cb)
        } else {
            let (i, u, _, _) = tokenize::multiset_sizes(ca, cb);
            (i, u)
        };
        ratio(intersection as f64, union as f64)
    })
}

pub fn sorensen_dice(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> f64 {
    score_tokens(config, a, b, |ca, cb| {
        let (intersection, _, total_a, total_b) = tokenize::multiset_sizes(ca, cb);
        ratio(2.0 * intersection as f64, (total_a + total_b) as f64)
    })
}

pub fn overlap(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> f64 {
    score_tokens(config, a, b, |ca, cb| {
        let (intersection, _, total_a, total_b) = tokenize::multiset_sizes(ca, cb);
        ratio(intersection as f64, total_a.min(total_b) as f64)
    })
}

pub fn tversky(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> SimilarityResult {
    let (alpha, beta) = match (config.alpha, config.beta) {
        (Some(alpha), Some(beta)) => (alpha, beta),
        _ => {
            return Err(SimilarityError::InvalidConfiguration(
                "Tversky requires alpha and beta parameters".into(),
            ))
        }
    };
    Ok(score_tokens(config, a, b, |ca, cb| {
        let (intersection, _, total_a, total_b) = tokenize::multiset_sizes(ca, cb);
        let shared = intersection as f64;
        let only_a = (total_a - intersection) as f64;
        let only_b = (total_b - intersection) as f64;
        ratio(shared, shared + alpha * only_a + beta * only_b)
    }))
}

impl SimilarityAlgorithm for Jaccard {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| Ok(jaccard(config, a, b)))
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| Ok(scaled_distance(jaccard(config, a, b))))
    }

    delegate_to_core!();

    fn is_metric(&self) -> bool {
        true
    }
}

impl SimilarityAlgorithm for SorensenDice {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core
            .similarity(s1, s2, |config, a, b| Ok(sorensen_dice(config, a, b)))
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core.distance(s1, s2, |config, a, b| {
            Ok(scaled_distance(sorensen_dice(config, a, b)))
        })
    }

    delegate_to_core!();
}

impl SimilarityAlgorithm for Overlap {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| Ok(overlap(config, a, b)))
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| Ok(scaled_distance(overlap(config, a, b))))
    }

    delegate_to_core!();
}

impl SimilarityAlgorithm for Tversky {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, tversky)
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| tversky(config, a, b).map(scaled_distance))
    }

    delegate_to_core!();

    fn is_symmetric(&self) -> bool {
        let config = self.core.config();
        config.alpha == config.beta
    }
}
