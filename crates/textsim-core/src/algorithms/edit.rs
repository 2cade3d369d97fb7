//! Edit-distance family: Levenshtein, restricted Damerau-Levenshtein, Hamming
//!
//! All three work on already case-folded input. The DP kernels are generic
//! over the element type so pure-ASCII pairs run on bytes and everything
//! else on codepoints.

use super::{algorithm_struct, delegate_to_core, SimilarityAlgorithm};
use crate::error::{DistanceResult, SimilarityError, SimilarityResult};
use crate::memory::{MemoryPool, Scratch};
use crate::types::AlgorithmType;
use crate::unicode::UnicodeString;

algorithm_struct!(
    /// Insert/delete/substitute edit distance.
    ///
    /// With a `threshold` configured, only a diagonal band of width
    /// `2 * threshold + 1` is evaluated and any distance above the threshold
    /// is reported as `threshold + 1`.
    Levenshtein => AlgorithmType::Levenshtein
);

algorithm_struct!(
    /// Restricted Damerau-Levenshtein (optimal string alignment).
    ///
    /// Adjacent transpositions count as one edit, but no substring is edited
    /// more than once, so `CA -> ABC` is 3 rather than 2.
    DamerauLevenshtein => AlgorithmType::DamerauLevenshtein
);

algorithm_struct!(
    /// Count of differing aligned codepoints. Inputs must have equal length.
    Hamming => AlgorithmType::Hamming
);

impl Levenshtein {
    /// Distance on folded input, honouring the configured threshold.
    fn compute(&self, threshold: Option<f64>, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        let local = self.core.local_pool();
        let pool = local.as_deref();

        let distance = match (threshold, s1.is_ascii() && s2.is_ascii()) {
            (Some(k), true) => banded(s1.as_bytes(), s2.as_bytes(), threshold_bound(k), pool)?,
            (Some(k), false) => banded(s1.chars(), s2.chars(), threshold_bound(k), pool)?,
            (None, true) => single_row(s1.as_bytes(), s2.as_bytes(), pool)?,
            (None, false) => single_row(s1.chars(), s2.chars(), pool)?,
        };
        Ok(distance)
    }
}

impl SimilarityAlgorithm for Levenshtein {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |config, a, b| {
            let distance = self.compute(config.threshold, a, b)?;
            Ok(length_normalized(distance, a.len().max(b.len())))
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core
            .distance(s1, s2, |config, a, b| self.compute(config.threshold, a, b))
    }

    delegate_to_core!();

    fn supports_early_termination(&self) -> bool {
        true
    }

    fn is_metric(&self) -> bool {
        true
    }
}

impl SimilarityAlgorithm for DamerauLevenshtein {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |_, a, b| {
            let local = self.core.local_pool();
            let distance = osa(a.chars(), b.chars(), local.as_deref())?;
            Ok(length_normalized(distance, a.len().max(b.len())))
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core.distance(s1, s2, |_, a, b| {
            let local = self.core.local_pool();
            osa(a.chars(), b.chars(), local.as_deref())
        })
    }

    delegate_to_core!();

    fn supports_early_termination(&self) -> bool {
        true
    }

    fn is_metric(&self) -> bool {
        true
    }
}

impl SimilarityAlgorithm for Hamming {
    fn calculate_similarity(&self, s1: &UnicodeString, s2: &UnicodeString) -> SimilarityResult {
        self.core.similarity(s1, s2, |_, a, b| {
            let distance = hamming(a, b)?;
            Ok(length_normalized(distance, a.len()))
        })
    }

    fn calculate_distance(&self, s1: &UnicodeString, s2: &UnicodeString) -> DistanceResult {
        self.core.distance(s1, s2, |_, a, b| hamming(a, b))
    }

    delegate_to_core!();

    fn is_metric(&self) -> bool {
        true
    }
}

/// `1 - distance / len`, 1.0 for zero length.
fn length_normalized(distance: u32, len: usize) -> f64 {
    if len == 0 {
        return 1.0;
    }
    (1.0 - f64::from(distance) / len as f64).clamp(0.0, 1.0)
}

fn threshold_bound(threshold: f64) -> u32 {
    if threshold >= f64::from(u32::MAX - 1) {
        u32::MAX - 1
    } else {
        threshold as u32
    }
}

fn to_u32(n: usize) -> Result<u32, SimilarityError> {
    u32::try_from(n)
        .map_err(|_| SimilarityError::ComputationOverflow(format!("length {n} exceeds u32 range")))
}

/// Unbounded Levenshtein with one rolling row over the shorter input.
pub fn single_row<T: Eq + Copy>(
    s1: &[T],
    s2: &[T],
    pool: Option<&MemoryPool>,
) -> Result<u32, SimilarityError> {
    let (short, long) = if s1.len() <= s2.len() { (s1, s2) } else { (s2, s1) };
    to_u32(long.len())?;

    let mut row = Scratch::filled(pool, short.len() + 1, 0u32)?;
    for (i, cell) in row.iter_mut().enumerate() {
        *cell = i as u32;
    }

    for (j, &c2) in long.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = j as u32 + 1;
        for (i, &c1) in short.iter().enumerate() {
            let above = row[i + 1];
            row[i + 1] = if c1 == c2 {
                diagonal
            } else {
                1 + above.min(row[i]).min(diagonal)
            };
            diagonal = above;
        }
    }

    Ok(row[short.len()])
}

/// Levenshtein restricted to the band `|i - j| <= k`.
///
/// Returns the exact distance when it is at most `k`, otherwise `k + 1`.
pub fn banded<T: Eq + Copy>(
    s1: &[T],
    s2: &[T],
    k: u32,
    pool: Option<&MemoryPool>,
) -> Result<u32, SimilarityError> {
    let (n, m) = (s1.len(), s2.len());
    let over = k.saturating_add(1);
    if n.abs_diff(m) > k as usize {
        return Ok(over);
    }
    to_u32(n.max(m))?;

    let k = k as usize;
    let mut prev = Scratch::filled(pool, m + 1, over)?;
    let mut cur = Scratch::filled(pool, m + 1, over)?;
    for (j, cell) in prev.iter_mut().enumerate().take(k.min(m) + 1) {
        *cell = j as u32;
    }

    for i in 1..=n {
        let lo = i.saturating_sub(k).max(1);
        let hi = (i + k).min(m);

        cur[0] = if i <= k { i as u32 } else { over };
        cur[lo - 1] = if lo == 1 { cur[0] } else { over };

        let mut row_min = cur[0];
        for j in lo..=hi {
            let value = if s1[i - 1] == s2[j - 1] {
                prev[j - 1]
            } else {
                prev[j - 1].min(prev[j]).min(cur[j - 1]).saturating_add(1)
            };
            cur[j] = value.min(over);
            row_min = row_min.min(cur[j]);
        }
        if hi < m {
            cur[hi + 1] = over;
        }

        if row_min > k as u32 {
            return Ok(over);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    Ok(prev[m].min(over))
}

/// Optimal string alignment distance with three rolling rows.
pub fn osa<T: Eq + Copy>(s1: &[T], s2: &[T], pool: Option<&MemoryPool>) -> Result<u32, SimilarityError> {
    let (n, m) = (s1.len(), s2.len());
    to_u32(n.max(m))?;

    let mut two_back = Scratch::filled(pool, m + 1, 0u32)?;
    let mut prev = Scratch::filled(pool, m + 1, 0u32)?;
    let mut cur = Scratch::filled(pool, m + 1, 0u32)?;
    for (j, cell) in prev.iter_mut().enumerate() {
        *cell = j as u32;
    }

    for i in 1..=n {
        cur[0] = i as u32;
        for j in 1..=m {
            let cost = u32::from(s1[i - 1] != s2[j - 1]);
            let mut value = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && s1[i - 1] == s2[j - 2] && s1[i - 2] == s2[j - 1] {
                value = value.min(two_back[j - 2] + cost);
            }
            cur[j] = value;
        }
        // two_back <- prev <- cur; the old two_back row is overwritten next pass
        std::mem::swap(&mut two_back, &mut prev);
        std::mem::swap(&mut prev, &mut cur);
    }

    Ok(prev[m])
}

fn hamming(a: &UnicodeString, b: &UnicodeString) -> DistanceResult {
    if a.len() != b.len() {
        return Err(SimilarityError::InvalidInput(format!(
            "Hamming distance requires equal-length strings ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let differing = if a.is_ascii() && b.is_ascii() {
        a.as_bytes().iter().zip(b.as_bytes()).filter(|(x, y)| x != y).count()
    } else {
        a.chars().iter().zip(b.chars()).filter(|(x, y)| x != y).count()
    };
    to_u32(differing)
}
