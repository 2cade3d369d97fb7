//! Invariants that hold across the whole algorithm set

use textsim_core::algorithms::edit::{banded, single_row};
use textsim_core::{
    AlgorithmConfig, AlgorithmFactory, AlgorithmType, SimilarityAlgorithm, UnicodeString,
};

const SAMPLES: &[&str] = &[
    "a",
    "ab",
    "abc",
    "hello",
    "help",
    "kitten",
    "sitting",
    "the cat sat",
    "the hat sat",
    "naïve café",
    "naive cafe",
    "Привет мир",
    "привет",
    "αβγδ",
    "🦀 rust",
    "aaaaab",
];

/// Triples here are chosen so that restricted Damerau-Levenshtein also
/// satisfies the triangle inequality.
const TRIANGLE: &[&str] = &[
    "", "a", "ab", "kitten", "sitting", "mitten", "fitting", "sit", "kit", "knitting", "smitten",
    "écrit", "écrits", "written",
];

fn s(text: &str) -> UnicodeString {
    UnicodeString::from(text)
}

fn build(algorithm: AlgorithmType, config: AlgorithmConfig) -> Box<dyn SimilarityAlgorithm> {
    let config = match algorithm {
        AlgorithmType::Tversky if config.alpha.is_none() => config.with_tversky(0.5, 0.5),
        _ => config,
    };
    AlgorithmFactory::with_builtins().create(algorithm, config).unwrap()
}

fn all_algorithms() -> Vec<Box<dyn SimilarityAlgorithm>> {
    AlgorithmType::ALL
        .iter()
        .map(|&algorithm| build(algorithm, AlgorithmConfig::default()))
        .collect()
}

#[test]
fn test_identity() {
    for algorithm in all_algorithms() {
        for text in SAMPLES.iter().chain([""].iter()) {
            let name = algorithm.algorithm_name();
            assert_eq!(algorithm.calculate_distance(&s(text), &s(text)), Ok(0), "{name}: {text:?}");
            assert_eq!(algorithm.calculate_similarity(&s(text), &s(text)), Ok(1.0), "{name}: {text:?}");
        }
    }
}

#[test]
fn test_one_side_empty() {
    let empty = UnicodeString::default();
    for algorithm in all_algorithms() {
        let name = algorithm.algorithm_name();
        for text in SAMPLES {
            let other = s(text);
            let len = other.len() as u32;
            assert_eq!(algorithm.calculate_distance(&empty, &other), Ok(len), "{name}: {text:?}");
            assert_eq!(algorithm.calculate_distance(&other, &empty), Ok(len), "{name}: {text:?}");
            assert_eq!(algorithm.calculate_similarity(&empty, &other), Ok(0.0), "{name}: {text:?}");
        }
    }
}

#[test]
fn test_symmetric_algorithms_are_symmetric() {
    for algorithm in all_algorithms() {
        assert!(algorithm.is_symmetric());
        let name = algorithm.algorithm_name();
        for a in SAMPLES {
            for b in SAMPLES {
                let (x, y) = (s(a), s(b));
                let forward = algorithm.calculate_similarity(&x, &y);
                let backward = algorithm.calculate_similarity(&y, &x);
                match (&forward, &backward) {
                    (Ok(f), Ok(r)) => assert_eq!(f, r, "{name}: {a:?} / {b:?}"),
                    _ => assert!(forward.is_err() && backward.is_err(), "{name}: {a:?} / {b:?}"),
                }

                let forward = algorithm.calculate_distance(&x, &y);
                let backward = algorithm.calculate_distance(&y, &x);
                match (&forward, &backward) {
                    (Ok(f), Ok(r)) => assert_eq!(f, r, "{name}: {a:?} / {b:?}"),
                    _ => assert!(forward.is_err() && backward.is_err(), "{name}: {a:?} / {b:?}"),
                }
            }
        }
    }
}

#[test]
fn test_tversky_with_unequal_weights_is_asymmetric() {
    let tversky = build(
        AlgorithmType::Tversky,
        AlgorithmConfig::default().with_tversky(1.0, 0.0),
    );
    assert!(!tversky.is_symmetric());

    let forward = tversky.calculate_similarity(&s("abc"), &s("abcd")).unwrap();
    let backward = tversky.calculate_similarity(&s("abcd"), &s("abc")).unwrap();
    assert_ne!(forward, backward);
}

#[test]
fn test_triangle_inequality() {
    let metrics = [
        (AlgorithmType::Levenshtein, 0),
        (AlgorithmType::DamerauLevenshtein, 0),
        // Rounding each leg to the nearest thousandth can cost one unit
        (AlgorithmType::Euclidean, 1),
        (AlgorithmType::Manhattan, 0),
        (AlgorithmType::Chebyshev, 0),
    ];
    for (algorithm, tolerance) in metrics {
        let instance = build(algorithm, AlgorithmConfig::default());
        let d = |a: &str, b: &str| instance.calculate_distance(&s(a), &s(b)).unwrap();
        for &x in TRIANGLE {
            for &y in TRIANGLE {
                for &z in TRIANGLE {
                    assert!(
                        d(x, z) <= d(x, y) + d(y, z) + tolerance,
                        "{algorithm}: {x:?} {y:?} {z:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_hamming_triangle_inequality() {
    let words = ["kitten", "sitten", "mitten", "kitted", "bitter", "kittie"];
    let hamming = build(AlgorithmType::Hamming, AlgorithmConfig::default());
    let d = |a: &str, b: &str| hamming.calculate_distance(&s(a), &s(b)).unwrap();
    for x in words {
        for y in words {
            for z in words {
                assert!(d(x, z) <= d(x, y) + d(y, z), "{x} {y} {z}");
            }
        }
    }
}

#[test]
fn test_banded_agrees_with_single_row() {
    let chars: Vec<Vec<char>> = SAMPLES.iter().map(|w| w.chars().collect()).collect();
    for a in &chars {
        for b in &chars {
            let exact = single_row(&a[..], &b[..], None).unwrap();
            for k in 0..6 {
                let bounded = banded(&a[..], &b[..], k, None).unwrap();
                if exact <= k {
                    assert_eq!(bounded, exact, "{a:?} / {b:?} k={k}");
                } else {
                    assert_eq!(bounded, k + 1, "{a:?} / {b:?} k={k}");
                }
            }
        }
    }
}

#[test]
fn test_threshold_configuration_caps_distance() {
    let lev = build(
        AlgorithmType::Levenshtein,
        AlgorithmConfig::default().with_threshold(2.0),
    );
    assert_eq!(lev.calculate_distance(&s("kitten"), &s("sitting")), Ok(3));
    assert_eq!(lev.calculate_distance(&s("kitten"), &s("mitten")), Ok(1));
    assert_eq!(lev.calculate_distance(&s("abc"), &s("xyzxyz")), Ok(3));
}

#[test]
fn test_case_insensitive_matches_for_every_algorithm() {
    for algorithm in AlgorithmType::ALL {
        let instance = build(algorithm, AlgorithmConfig::default().case_insensitive());
        assert_eq!(
            instance.calculate_similarity(&s("ABC"), &s("abc")),
            Ok(1.0),
            "{algorithm}"
        );
        assert_eq!(instance.calculate_distance(&s("ABC"), &s("abc")), Ok(0), "{algorithm}");
    }
}

#[test]
fn test_similarity_stays_in_range() {
    for algorithm in all_algorithms() {
        for a in SAMPLES {
            for b in SAMPLES {
                if let Ok(sim) = algorithm.calculate_similarity(&s(a), &s(b)) {
                    assert!(
                        (0.0..=algorithm.maximum_similarity()).contains(&sim),
                        "{}: {a:?} / {b:?} = {sim}",
                        algorithm.algorithm_name()
                    );
                }
            }
        }
    }
}
