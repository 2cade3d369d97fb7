//! Vector-space family: Cosine, Euclidean, Manhattan, Chebyshev
//!
//! Inputs become term-frequency vectors via the shared tokenizer. The three
//! geometric distances are reported as `round(d * 1000)` and converted back
//! to a similarity from `d = distance / 1000`.

use super::tokenize::{self, Counter};
use super::{algorithm_struct, delegate_to_core, scaled_distance, simd, SimilarityAlgorithm};
use crate::error::{DistanceResult, SimilarityResult};
use crate::types::{AlgorithmConfig, AlgorithmType, PreprocessingMode};
use crate::unicode::UnicodeString;

algorithm_struct!(
    /// Cosine of the angle between term-frequency vectors.
    Cosine => AlgorithmType::Cosine
);

algorithm_struct!(
    /// L2 distance between frequency vectors; similarity `exp(-d)`.
    Euclidean => AlgorithmType::Euclidean
);

algorithm_struct!(
    /// L1 distance between frequency vectors; similarity `1 / (1 + d)`.
    Manhattan => AlgorithmType::Manhattan
);

algorithm_struct!(
    /// L∞ distance between frequency vectors; similarity `exp(-d)`.
    Chebyshev => AlgorithmType::Chebyshev
);

/// 256-bin byte histogram, optionally folding `A-Z` into `a-z`.
pub fn ascii_histogram(bytes: &[u8], fold_case: bool) -> [u32; 256] {
    let mut counts = [0u32; 256];
    for &b in bytes {
        counts[b as usize] += 1;
    }
    if fold_case {
        for upper in b'A'..=b'Z' {
            let lower = (upper + 32) as usize;
            counts[lower] += counts[upper as usize];
            counts[upper as usize] = 0;
        }
    }
    counts
}

pub fn cosine(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> f64 {
    if config.preprocessing == PreprocessingMode::Character {
        if a.is_ascii() && b.is_ascii() {
            return cosine_ascii(a.as_bytes(), b.as_bytes(), config.is_case_insensitive());
        }
        return cosine_presence(a.chars(), b.chars());
    }
    let ca = tokenize::counter(a.chars(), config);
    let cb = tokenize::counter(b.chars(), config);
    cosine_counters(&ca, &cb)
}

fn cosine_ascii(a: &[u8], b: &[u8], fold_case: bool) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }
    let ha = ascii_histogram(a, fold_case);
    let hb = ascii_histogram(b, fold_case);
    let denominator = (simd::norm_squared(&ha) * simd::norm_squared(&hb)).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (simd::dot(&ha, &hb) / denominator).clamp(0.0, 1.0)
}

/// Binary presence vectors: `|A ∩ B| / sqrt(|A| * |B|)` over distinct codepoints.
fn cosine_presence(a: &[char], b: &[char]) -> f64 {
    let sa: ahash::AHashSet<char> = a.iter().copied().collect();
    let sb: ahash::AHashSet<char> = b.iter().copied().collect();
    match (sa.is_empty(), sb.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }
    let shared = sa.intersection(&sb).count() as f64;
    (shared / ((sa.len() * sb.len()) as f64).sqrt()).clamp(0.0, 1.0)
}

fn cosine_counters(a: &Counter<'_>, b: &Counter<'_>) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }
    if a == b {
        return 1.0;
    }
    let norm = |c: &Counter<'_>| c.values().map(|&f| f64::from(f) * f64::from(f)).sum::<f64>();
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(term, &fa)| b.get(term).map(|&fb| f64::from(fa) * f64::from(fb)))
        .sum();
    (dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 1.0)
}

/// Per-term absolute frequency differences over the union of terms.
fn differences<'a>(a: &'a Counter<'a>, b: &'a Counter<'a>) -> impl Iterator<Item = f64> + 'a {
    let from_a = a.iter().map(move |(term, &fa)| {
        let fb = b.get(term).copied().unwrap_or(0);
        f64::from(fa.abs_diff(fb))
    });
    let only_b = b
        .iter()
        .filter(move |(term, _)| !a.contains_key(*term))
        .map(|(_, &fb)| f64::from(fb));
    from_a.chain(only_b)
}

fn with_counters<F>(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString, f: F) -> f64
where
    F: FnOnce(&Counter<'_>, &Counter<'_>) -> f64,
{
    let ca = tokenize::counter(a.chars(), config);
    let cb = tokenize::counter(b.chars(), config);
    f(&ca, &cb)
}

pub fn euclidean(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> f64 {
    with_counters(config, a, b, |ca, cb| {
        differences(ca, cb).map(|d| d * d).sum::<f64>().sqrt()
    })
}

pub fn manhattan(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> f64 {
    with_counters(config, a, b, |ca, cb| differences(ca, cb).sum())
}

pub fn chebyshev(config: &AlgorithmConfig, a: &UnicodeString, b: &UnicodeString) -> f64 {
    with_counters(config, a, b, |ca, cb| differences(ca, cb).fold(0.0, f64::max))
}

/// `round(d * 1000)`, saturating at `u32::MAX`.
fn fixed_point(distance: f64) -> u32 {
    (distance * 1000.0).round() as u32
}

fn from_fixed_point(distance: u32) -> f64 {
    f64::from(distance) / 1000.0
}

impl SimilarityAlgorithm for Cosine {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| Ok(cosine(config, a, b)))
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| Ok(scaled_distance(cosine(config, a, b))))
    }

    delegate_to_core!();
}

impl SimilarityAlgorithm for Euclidean {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| {
            let d = from_fixed_point(fixed_point(euclidean(config, a, b)));
            Ok((-d).exp())
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| Ok(fixed_point(euclidean(config, a, b))))
    }

    delegate_to_core!();

    fn is_metric(&self) -> bool {
        true
    }
}

impl SimilarityAlgorithm for Manhattan {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| {
            let d = from_fixed_point(fixed_point(manhattan(config, a, b)));
            Ok(1.0 / (1.0 + d))
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| Ok(fixed_point(manhattan(config, a, b))))
    }

    delegate_to_core!();

    fn is_metric(&self) -> bool {
        true
    }
}

impl SimilarityAlgorithm for Chebyshev {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| {
            let d = from_fixed_point(fixed_point(chebyshev(config, a, b)));
            Ok((-d).exp())
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| Ok(fixed_point(chebyshev(config, a, b))))
    }

    delegate_to_core!();

    fn is_metric(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> UnicodeString {
        UnicodeString::from(text)
    }

    #[test]
    fn test_ascii_histogram_folds_case() {
        let h = ascii_histogram(b"AaB", true);
        assert_eq!(h[b'a' as usize], 2);
        assert_eq!(h[b'b' as usize], 1);
        assert_eq!(h[b'A' as usize], 0);

        let h = ascii_histogram(b"AaB", false);
        assert_eq!(h[b'A' as usize], 1);
    }

    #[test]
    fn test_cosine_character_paths() {
        let cfg = AlgorithmConfig::new(AlgorithmType::Cosine);
        // ASCII histogram: a=(1,1,0) b=(1,0,1) -> 1/2
        assert!((cosine(&cfg, &s("ab"), &s("ac")) - 0.5).abs() < 1e-12);
        // Presence sets: {é,t} vs {é,a}
        assert!((cosine(&cfg, &s("été"), &s("éa")) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_word_vectors() {
        let cfg = AlgorithmConfig::new(AlgorithmType::Cosine)
            .with_preprocessing(PreprocessingMode::Word);
        assert_eq!(cosine(&cfg, &s("a b a"), &s("b a a")), 1.0);
        assert_eq!(cosine(&cfg, &s("x y"), &s("z")), 0.0);
    }

    #[test]
    fn test_geometric_distances() {
        let cfg = AlgorithmConfig::new(AlgorithmType::Euclidean);
        // counts: a:2,b:1 vs a:1,c:1 -> diffs 1,1,1
        assert!((euclidean(&cfg, &s("aab"), &s("ac")) - 3f64.sqrt()).abs() < 1e-12);
        assert_eq!(manhattan(&cfg, &s("aab"), &s("ac")), 3.0);
        assert_eq!(chebyshev(&cfg, &s("aab"), &s("ac")), 1.0);
    }

    #[test]
    fn test_fixed_point_similarity() {
        let euc = Euclidean::new(AlgorithmConfig::new(AlgorithmType::Euclidean)).unwrap();
        assert_eq!(euc.calculate_distance(&s("aab"), &s("ac")), Ok(1732));
        let sim = euc.calculate_similarity(&s("aab"), &s("ac")).unwrap();
        assert!((sim - (-1.732f64).exp()).abs() < 1e-12);

        let man = Manhattan::new(AlgorithmConfig::new(AlgorithmType::Manhattan)).unwrap();
        let sim = man.calculate_similarity(&s("aab"), &s("ac")).unwrap();
        assert!((sim - 0.25).abs() < 1e-12);
    }
}
