//! Tokenization shared by the token-set and vector-space families
//!
//! Tokens are borrowed codepoint slices of the input, so counting them never
//! copies text.

use ahash::AHashMap;

use crate::types::{AlgorithmConfig, PreprocessingMode};

/// Token multiset: token -> occurrence count
pub type Counter<'a> = AHashMap<&'a [char], u32>;

/// Split `chars` according to the configured preprocessing mode.
pub fn tokenize<'a>(chars: &'a [char], config: &AlgorithmConfig) -> Vec<&'a [char]> {
    match config.preprocessing {
        PreprocessingMode::None => vec![chars],
        PreprocessingMode::Character => chars.chunks(1).collect(),
        PreprocessingMode::Word => words(chars),
        PreprocessingMode::NGram => ngrams(chars, config.ngram_size as usize),
    }
}

/// Sliding windows of `n` codepoints. Input shorter than `n` yields itself
/// as the only gram; empty input yields nothing.
pub fn ngrams(chars: &[char], n: usize) -> Vec<&[char]> {
    if n == 0 || chars.is_empty() {
        return Vec::new();
    }
    if chars.len() < n {
        return vec![chars];
    }
    chars.windows(n).collect()
}

/// Maximal runs of word characters (alphanumeric or `_`).
pub fn words(chars: &[char]) -> Vec<&[char]> {
    chars
        .split(|c| !is_word_char(*c))
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn count<'a>(tokens: &[&'a [char]]) -> Counter<'a> {
    let mut counter = Counter::with_capacity(tokens.len());
    for token in tokens {
        *counter.entry(*token).or_insert(0) += 1;
    }
    counter
}

/// Tokenize and count in one step.
pub fn counter<'a>(chars: &'a [char], config: &AlgorithmConfig) -> Counter<'a> {
    count(&tokenize(chars, config))
}

/// Sizes of two multisets: `(intersection, union, total_a, total_b)`.
///
/// Intersection takes the minimum count per token, union the maximum.
pub fn multiset_sizes(a: &Counter<'_>, b: &Counter<'_>) -> (u64, u64, u64, u64) {
    let total_a: u64 = a.values().map(|&c| u64::from(c)).sum();
    let total_b: u64 = b.values().map(|&c| u64::from(c)).sum();

    let intersection: u64 = a
        .iter()
        .filter_map(|(token, &ca)| b.get(token).map(|&cb| u64::from(ca.min(cb))))
        .sum();

    (intersection, total_a + total_b - intersection, total_a, total_b)
}

/// Set sizes ignoring multiplicity: `(intersection, union)`.
pub fn set_sizes(a: &Counter<'_>, b: &Counter<'_>) -> (u64, u64) {
    let intersection = a.keys().filter(|token| b.contains_key(*token)).count() as u64;
    let union = (a.len() + b.len()) as u64 - intersection;
    (intersection, union)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn strings(tokens: &[&[char]]) -> Vec<String> {
        tokens.iter().map(|t| t.iter().collect()).collect()
    }

    #[test]
    fn test_modes() {
        let text = chars("hello world");
        let cfg = AlgorithmConfig::default();

        let none = tokenize(&text, &cfg.clone().with_preprocessing(PreprocessingMode::None));
        assert_eq!(strings(&none), vec!["hello world"]);

        let chars_mode = tokenize(&text, &cfg);
        assert_eq!(chars_mode.len(), 11);

        let words_mode = tokenize(&text, &cfg.clone().with_preprocessing(PreprocessingMode::Word));
        assert_eq!(strings(&words_mode), vec!["hello", "world"]);

        let grams = tokenize(
            &text,
            &cfg.with_preprocessing(PreprocessingMode::NGram).with_ngram_size(3),
        );
        assert_eq!(grams.len(), 9);
        assert_eq!(strings(&grams[..2]), vec!["hel", "ell"]);
    }

    #[test]
    fn test_ngram_short_and_empty() {
        assert_eq!(strings(&ngrams(&chars("ab"), 3)), vec!["ab"]);
        assert!(ngrams(&[], 2).is_empty());
    }

    #[test]
    fn test_words_unicode_and_punctuation() {
        let text = chars("naïve, café_au-lait! 42");
        assert_eq!(strings(&words(&text)), vec!["naïve", "café_au", "lait", "42"]);
    }

    #[test]
    fn test_multiset_sizes() {
        let a = chars("aab");
        let b = chars("abb");
        let ca = count(&tokenize(&a, &AlgorithmConfig::default()));
        let cb = count(&tokenize(&b, &AlgorithmConfig::default()));
        // min: a=1, b=1; max: a=2, b=2
        assert_eq!(multiset_sizes(&ca, &cb), (2, 4, 3, 3));
        assert_eq!(set_sizes(&ca, &cb), (2, 2));
    }
}
