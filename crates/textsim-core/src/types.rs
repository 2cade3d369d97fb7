//! Algorithm selectors and per-call configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimilarityError;

/// Every algorithm the engine knows about.
///
/// Discriminants are stable and shared with the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum AlgorithmType {
    Levenshtein = 0,
    DamerauLevenshtein,
    Hamming,
    Jaro,
    JaroWinkler,
    Jaccard,
    SorensenDice,
    Overlap,
    Tversky,
    Cosine,
    Euclidean,
    Manhattan,
    Chebyshev,
}

impl AlgorithmType {
    pub const ALL: [AlgorithmType; 13] = [
        AlgorithmType::Levenshtein,
        AlgorithmType::DamerauLevenshtein,
        AlgorithmType::Hamming,
        AlgorithmType::Jaro,
        AlgorithmType::JaroWinkler,
        AlgorithmType::Jaccard,
        AlgorithmType::SorensenDice,
        AlgorithmType::Overlap,
        AlgorithmType::Tversky,
        AlgorithmType::Cosine,
        AlgorithmType::Euclidean,
        AlgorithmType::Manhattan,
        AlgorithmType::Chebyshev,
    ];

    /// Canonical lowercase name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmType::Levenshtein => "levenshtein",
            AlgorithmType::DamerauLevenshtein => "damerau-levenshtein",
            AlgorithmType::Hamming => "hamming",
            AlgorithmType::Jaro => "jaro",
            AlgorithmType::JaroWinkler => "jaro-winkler",
            AlgorithmType::Jaccard => "jaccard",
            AlgorithmType::SorensenDice => "sorensen-dice",
            AlgorithmType::Overlap => "overlap",
            AlgorithmType::Tversky => "tversky",
            AlgorithmType::Cosine => "cosine",
            AlgorithmType::Euclidean => "euclidean",
            AlgorithmType::Manhattan => "manhattan",
            AlgorithmType::Chebyshev => "chebyshev",
        }
    }

    /// Human-readable name, e.g. "Jaro-Winkler".
    pub fn display_name(self) -> &'static str {
        match self {
            AlgorithmType::Levenshtein => "Levenshtein",
            AlgorithmType::DamerauLevenshtein => "Damerau-Levenshtein",
            AlgorithmType::Hamming => "Hamming",
            AlgorithmType::Jaro => "Jaro",
            AlgorithmType::JaroWinkler => "Jaro-Winkler",
            AlgorithmType::Jaccard => "Jaccard",
            AlgorithmType::SorensenDice => "Sorensen-Dice",
            AlgorithmType::Overlap => "Overlap",
            AlgorithmType::Tversky => "Tversky",
            AlgorithmType::Cosine => "Cosine",
            AlgorithmType::Euclidean => "Euclidean",
            AlgorithmType::Manhattan => "Manhattan",
            AlgorithmType::Chebyshev => "Chebyshev",
        }
    }

    /// Case-insensitive lookup by name. Accepts "dice" as an alias.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        if name == "dice" {
            return Some(AlgorithmType::SorensenDice);
        }
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How input strings are split into tokens for token and vector algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PreprocessingMode {
    /// Whole string is a single token
    None = 0,
    /// One token per codepoint
    Character,
    /// Maximal runs of word characters
    Word,
    /// Sliding windows of `ngram_size` codepoints
    NGram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum NormalizationMode {
    None = 0,
    Distance,
    Similarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CaseSensitivity {
    Sensitive = 0,
    Insensitive,
}

/// Per-call algorithm configuration.
///
/// A plain value: copied across threads, never shared mutably. Fields equal
/// to the `Default` value count as "unset" when layers are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    pub algorithm: AlgorithmType,
    pub preprocessing: PreprocessingMode,
    pub normalization: NormalizationMode,
    pub case_sensitivity: CaseSensitivity,
    pub ngram_size: u32,

    /// Early-termination bound (Levenshtein) or boost threshold (Jaro-Winkler)
    pub threshold: Option<f64>,
    /// Tversky weight for `|A - B|`
    pub alpha: Option<f64>,
    /// Tversky weight for `|B - A|`
    pub beta: Option<f64>,
    /// Jaro-Winkler prefix scaling factor, 0.0..=0.25
    pub prefix_weight: Option<f64>,
    /// Jaro-Winkler prefix cap, at most 4
    pub prefix_length: Option<u32>,
    /// Maximum input length in bytes
    pub max_string_length: Option<usize>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmType::Levenshtein,
            preprocessing: PreprocessingMode::Character,
            normalization: NormalizationMode::Similarity,
            case_sensitivity: CaseSensitivity::Sensitive,
            ngram_size: 2,
            threshold: None,
            alpha: None,
            beta: None,
            prefix_weight: None,
            prefix_length: None,
            max_string_length: None,
        }
    }
}

impl AlgorithmConfig {
    pub fn new(algorithm: AlgorithmType) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_preprocessing(mut self, mode: PreprocessingMode) -> Self {
        self.preprocessing = mode;
        self
    }

    pub fn with_normalization(mut self, mode: NormalizationMode) -> Self {
        self.normalization = mode;
        self
    }

    pub fn with_case_sensitivity(mut self, case: CaseSensitivity) -> Self {
        self.case_sensitivity = case;
        self
    }

    pub fn case_insensitive(self) -> Self {
        self.with_case_sensitivity(CaseSensitivity::Insensitive)
    }

    pub fn with_ngram_size(mut self, n: u32) -> Self {
        self.ngram_size = n;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_tversky(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = Some(alpha);
        self.beta = Some(beta);
        self
    }

    pub fn with_prefix(mut self, weight: f64, length: u32) -> Self {
        self.prefix_weight = Some(weight);
        self.prefix_length = Some(length);
        self
    }

    pub fn with_max_string_length(mut self, max: usize) -> Self {
        self.max_string_length = Some(max);
        self
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_sensitivity == CaseSensitivity::Insensitive
    }

    /// Check the configuration for internal consistency.
    ///
    /// Pure function of the fields; the algorithm selector decides which
    /// algorithm-specific rules apply.
    pub fn validate(&self) -> Result<(), SimilarityError> {
        if self.ngram_size == 0 {
            return Err(invalid("ngram_size must be greater than 0"));
        }

        if self.algorithm == AlgorithmType::Tversky {
            match (self.alpha, self.beta) {
                (Some(alpha), Some(beta)) => {
                    if !is_non_negative(alpha) || !is_non_negative(beta) {
                        return Err(invalid("Tversky alpha and beta must be finite and >= 0"));
                    }
                }
                _ => return Err(invalid("Tversky requires both alpha and beta")),
            }
        }

        if self.algorithm == AlgorithmType::JaroWinkler {
            if let Some(weight) = self.prefix_weight {
                if !(0.0..=0.25).contains(&weight) {
                    return Err(invalid("Jaro-Winkler prefix_weight must lie in [0, 0.25]"));
                }
            }
            if let Some(length) = self.prefix_length {
                if length > 4 {
                    return Err(invalid("Jaro-Winkler prefix_length must be <= 4"));
                }
            }
        }

        if let Some(threshold) = self.threshold {
            if !is_non_negative(threshold) {
                return Err(invalid("threshold must be finite and >= 0"));
            }
        }

        Ok(())
    }

    /// Overlay `other` on top of `self`: fields of `other` that are set win.
    ///
    /// `PreprocessingMode::None` and `NormalizationMode::None` count as unset,
    /// as do the default algorithm, case sensitivity and n-gram size.
    pub fn merged_with(&self, other: &AlgorithmConfig) -> AlgorithmConfig {
        let unset = AlgorithmConfig::default();
        let mut merged = self.clone();

        if other.algorithm != unset.algorithm {
            merged.algorithm = other.algorithm;
        }
        if other.preprocessing != PreprocessingMode::None {
            merged.preprocessing = other.preprocessing;
        }
        if other.normalization != NormalizationMode::None {
            merged.normalization = other.normalization;
        }
        if other.case_sensitivity != unset.case_sensitivity {
            merged.case_sensitivity = other.case_sensitivity;
        }
        if other.ngram_size != unset.ngram_size {
            merged.ngram_size = other.ngram_size;
        }

        merged.threshold = other.threshold.or(merged.threshold);
        merged.alpha = other.alpha.or(merged.alpha);
        merged.beta = other.beta.or(merged.beta);
        merged.prefix_weight = other.prefix_weight.or(merged.prefix_weight);
        merged.prefix_length = other.prefix_length.or(merged.prefix_length);
        merged.max_string_length = other.max_string_length.or(merged.max_string_length);

        merged
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn invalid(msg: &str) -> SimilarityError {
    SimilarityError::InvalidConfiguration(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip_and_alias() {
        for t in AlgorithmType::ALL {
            assert_eq!(AlgorithmType::from_name(t.as_str()), Some(t));
        }
        assert_eq!(AlgorithmType::from_name("DICE"), Some(AlgorithmType::SorensenDice));
        assert_eq!(AlgorithmType::from_name("Jaro-Winkler"), Some(AlgorithmType::JaroWinkler));
        assert_eq!(AlgorithmType::from_name("soundex"), None);
    }

    #[test]
    fn test_discriminants_are_stable() {
        assert_eq!(AlgorithmType::Levenshtein as u8, 0);
        assert_eq!(AlgorithmType::Chebyshev as u8, 12);
        assert_eq!(AlgorithmType::from_u8(8), Some(AlgorithmType::Tversky));
        assert_eq!(AlgorithmType::from_u8(13), None);
    }

    #[test]
    fn test_validate_ngram_size() {
        let cfg = AlgorithmConfig::default().with_ngram_size(0);
        assert!(matches!(
            cfg.validate(),
            Err(SimilarityError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_tversky_requires_params() {
        let cfg = AlgorithmConfig::new(AlgorithmType::Tversky);
        assert!(cfg.validate().is_err());
        assert!(cfg.clone().with_tversky(0.5, 0.5).validate().is_ok());
        assert!(cfg.clone().with_tversky(-0.1, 0.5).validate().is_err());
        assert!(cfg.clone().with_tversky(f64::INFINITY, 1.0).validate().is_err());
        assert!(cfg.with_tversky(1.0, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_jaro_winkler_ranges() {
        let cfg = AlgorithmConfig::new(AlgorithmType::JaroWinkler);
        assert!(cfg.clone().with_prefix(0.25, 4).validate().is_ok());
        assert!(cfg.clone().with_prefix(0.3, 4).validate().is_err());
        assert!(cfg.with_prefix(0.1, 5).validate().is_err());

        // Same values are not checked for other algorithms
        let lev = AlgorithmConfig::default().with_prefix(0.9, 9);
        assert!(lev.validate().is_ok());
    }

    #[test]
    fn test_validate_threshold() {
        assert!(AlgorithmConfig::default().with_threshold(-1.0).validate().is_err());
        assert!(AlgorithmConfig::default().with_threshold(0.0).validate().is_ok());
        assert!(AlgorithmConfig::default()
            .with_threshold(f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_merge_only_set_fields_override() {
        let base = AlgorithmConfig::default()
            .case_insensitive()
            .with_ngram_size(3)
            .with_threshold(2.0);
        let overlay = AlgorithmConfig::default().with_preprocessing(PreprocessingMode::Word);

        let merged = base.merged_with(&overlay);
        assert_eq!(merged.preprocessing, PreprocessingMode::Word);
        assert_eq!(merged.case_sensitivity, CaseSensitivity::Insensitive);
        assert_eq!(merged.ngram_size, 3);
        assert_eq!(merged.threshold, Some(2.0));
    }

    #[test]
    fn test_merge_none_modes_are_unset() {
        let base = AlgorithmConfig::default()
            .with_preprocessing(PreprocessingMode::Word)
            .with_normalization(NormalizationMode::Distance);

        // Default-valued modes are explicit choices and win
        let merged = base.merged_with(&AlgorithmConfig::default());
        assert_eq!(merged.preprocessing, PreprocessingMode::Character);
        assert_eq!(merged.normalization, NormalizationMode::Similarity);

        let unset = AlgorithmConfig {
            preprocessing: PreprocessingMode::None,
            normalization: NormalizationMode::None,
            ..AlgorithmConfig::default()
        };
        let merged = base.merged_with(&unset);
        assert_eq!(merged.preprocessing, PreprocessingMode::Word);
        assert_eq!(merged.normalization, NormalizationMode::Distance);
    }

    #[test]
    fn test_config_json_defaults() {
        let cfg: AlgorithmConfig =
            serde_json::from_str(r#"{"algorithm":"jaro-winkler","ngram_size":3}"#).unwrap();
        assert_eq!(cfg.algorithm, AlgorithmType::JaroWinkler);
        assert_eq!(cfg.ngram_size, 3);
        assert_eq!(cfg.preprocessing, PreprocessingMode::Character);
    }
}
