//! Boundary surface for language bindings
//!
//! Plain data in, plain data out: inputs arrive as raw bytes, configuration
//! as a loosely typed [`ConfigInput`] (camelCase JSON), and every operation
//! answers with a [`BoundaryResult`] instead of an error type.

use serde::{Deserialize, Serialize};

use crate::engine::SimilarityEngine;
use crate::error::{ErrorCode, SimilarityError};
use crate::executor::TaskHandle;
use crate::types::{
    AlgorithmConfig, AlgorithmType, CaseSensitivity, NormalizationMode, PreprocessingMode,
};

/// Algorithm chosen by numeric id or by (case-insensitive) name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlgorithmSelector {
    Id(u8),
    Name(String),
}

impl AlgorithmSelector {
    pub fn resolve(&self) -> Result<AlgorithmType, SimilarityError> {
        let resolved = match self {
            AlgorithmSelector::Id(id) => AlgorithmType::from_u8(*id),
            AlgorithmSelector::Name(name) => AlgorithmType::from_name(name),
        };
        resolved.ok_or_else(|| {
            SimilarityError::InvalidConfiguration(format!("unknown algorithm: {}", self.describe()))
        })
    }

    fn describe(&self) -> String {
        match self {
            AlgorithmSelector::Id(id) => id.to_string(),
            AlgorithmSelector::Name(name) => name.clone(),
        }
    }
}

impl From<AlgorithmType> for AlgorithmSelector {
    fn from(algorithm: AlgorithmType) -> Self {
        AlgorithmSelector::Id(algorithm as u8)
    }
}

impl From<&str> for AlgorithmSelector {
    fn from(name: &str) -> Self {
        AlgorithmSelector::Name(name.to_string())
    }
}

/// Configuration as supplied by a binding. Absent fields stay unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<AlgorithmSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<PreprocessingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitivity: Option<CaseSensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ngram_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_string_length: Option<usize>,
}

impl ConfigInput {
    /// Parse a JSON object.
    pub fn from_json(json: &str) -> Result<Self, SimilarityError> {
        serde_json::from_str(json)
            .map_err(|e| SimilarityError::InvalidConfiguration(format!("malformed configuration: {e}")))
    }

    /// Overlay the supplied fields on the default configuration.
    pub fn to_config(&self) -> Result<AlgorithmConfig, SimilarityError> {
        let mut config = AlgorithmConfig::default();
        if let Some(selector) = &self.algorithm {
            config.algorithm = selector.resolve()?;
        }
        if let Some(mode) = self.preprocessing {
            config.preprocessing = mode;
        }
        if let Some(mode) = self.normalization {
            config.normalization = mode;
        }
        if let Some(case) = self.case_sensitivity {
            config.case_sensitivity = case;
        }
        if let Some(n) = self.ngram_size {
            config.ngram_size = n;
        }
        config.threshold = self.threshold;
        config.alpha = self.alpha;
        config.beta = self.beta;
        config.prefix_weight = self.prefix_weight;
        config.prefix_length = self.prefix_length;
        config.max_string_length = self.max_string_length;
        Ok(config)
    }

    /// Like [`ConfigInput::to_config`], but absent preprocessing and
    /// normalization stay `None` so the global and per-algorithm layers
    /// show through when merged.
    pub fn to_call_config(&self) -> Result<AlgorithmConfig, SimilarityError> {
        let mut config = self.to_config()?;
        if self.preprocessing.is_none() {
            config.preprocessing = PreprocessingMode::None;
        }
        if self.normalization.is_none() {
            config.normalization = NormalizationMode::None;
        }
        Ok(config)
    }
}

impl From<&AlgorithmConfig> for ConfigInput {
    fn from(config: &AlgorithmConfig) -> Self {
        Self {
            algorithm: Some(AlgorithmSelector::Name(config.algorithm.as_str().to_string())),
            preprocessing: Some(config.preprocessing),
            normalization: Some(config.normalization),
            case_sensitivity: Some(config.case_sensitivity),
            ngram_size: Some(config.ngram_size),
            threshold: config.threshold,
            alpha: config.alpha,
            beta: config.beta,
            prefix_weight: config.prefix_weight,
            prefix_length: config.prefix_length,
            max_string_length: config.max_string_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryError {
    pub code: ErrorCode,
    pub message: String,
}

/// `{success, value}` or `{success, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BoundaryError>,
}

impl<T> From<Result<T, SimilarityError>> for BoundaryResult<T> {
    fn from(result: Result<T, SimilarityError>) -> Self {
        match result {
            Ok(value) => Self {
                success: true,
                value: Some(value),
                error: None,
            },
            Err(e) => Self {
                success: false,
                value: None,
                error: Some(BoundaryError {
                    code: e.code(),
                    message: e.message().to_string(),
                }),
            },
        }
    }
}

/// Entry of [`get_supported_algorithms`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmInfo {
    #[serde(rename = "type")]
    pub id: u8,
    pub name: String,
}

fn decode(bytes: &[u8]) -> Result<&str, SimilarityError> {
    std::str::from_utf8(bytes).map_err(|e| {
        SimilarityError::UnicodeConversion(format!("invalid UTF-8 at byte {}", e.valid_up_to()))
    })
}

fn call_config(config: Option<&ConfigInput>) -> Result<Option<AlgorithmConfig>, SimilarityError> {
    config.map(ConfigInput::to_call_config).transpose()
}

pub fn similarity(
    engine: &SimilarityEngine,
    s1: &[u8],
    s2: &[u8],
    algorithm: &AlgorithmSelector,
    config: Option<&ConfigInput>,
) -> BoundaryResult<f64> {
    let run = || -> Result<f64, SimilarityError> {
        let algorithm = algorithm.resolve()?;
        let config = call_config(config)?;
        engine.calculate_similarity(decode(s1)?, decode(s2)?, algorithm, config.as_ref())
    };
    run().into()
}

pub fn distance(
    engine: &SimilarityEngine,
    s1: &[u8],
    s2: &[u8],
    algorithm: &AlgorithmSelector,
    config: Option<&ConfigInput>,
) -> BoundaryResult<u32> {
    let run = || -> Result<u32, SimilarityError> {
        let algorithm = algorithm.resolve()?;
        let config = call_config(config)?;
        engine.calculate_distance(decode(s1)?, decode(s2)?, algorithm, config.as_ref())
    };
    run().into()
}

/// One result per pair; a bad selector or configuration fails every pair.
pub fn similarity_batch<P, Q>(
    engine: &SimilarityEngine,
    pairs: &[(P, Q)],
    algorithm: &AlgorithmSelector,
    config: Option<&ConfigInput>,
) -> Vec<BoundaryResult<f64>>
where
    P: AsRef<[u8]>,
    Q: AsRef<[u8]>,
{
    let setup = algorithm
        .resolve()
        .and_then(|algorithm| Ok((algorithm, call_config(config)?)));
    let (algorithm, config) = match setup {
        Ok(setup) => setup,
        Err(e) => return pairs.iter().map(|_| Err::<f64, _>(e.clone()).into()).collect(),
    };

    pairs
        .iter()
        .map(|(a, b)| {
            let result = decode(a.as_ref()).and_then(|a| {
                let b = decode(b.as_ref())?;
                engine.calculate_similarity(a, b, algorithm, config.as_ref())
            });
            result.into()
        })
        .collect()
}

fn decode_owned(bytes: &[u8]) -> Result<String, SimilarityError> {
    decode(bytes).map(str::to_string)
}

type Prepared = (String, String, AlgorithmType, Option<AlgorithmConfig>);

fn prepare(
    s1: &[u8],
    s2: &[u8],
    algorithm: &AlgorithmSelector,
    config: Option<&ConfigInput>,
) -> Result<Prepared, SimilarityError> {
    Ok((
        decode_owned(s1)?,
        decode_owned(s2)?,
        algorithm.resolve()?,
        call_config(config)?,
    ))
}

pub fn similarity_async(
    engine: &SimilarityEngine,
    s1: &[u8],
    s2: &[u8],
    algorithm: &AlgorithmSelector,
    config: Option<&ConfigInput>,
) -> TaskHandle<f64> {
    let prepared = prepare(s1, s2, algorithm, config);
    match prepared {
        Ok((a, b, algorithm, config)) => engine.calculate_similarity_async(a, b, algorithm, config),
        Err(e) => TaskHandle::ready(Err(e)),
    }
}

pub fn distance_async(
    engine: &SimilarityEngine,
    s1: &[u8],
    s2: &[u8],
    algorithm: &AlgorithmSelector,
    config: Option<&ConfigInput>,
) -> TaskHandle<u32> {
    let prepared = prepare(s1, s2, algorithm, config);
    match prepared {
        Ok((a, b, algorithm, config)) => engine.calculate_distance_async(a, b, algorithm, config),
        Err(e) => TaskHandle::ready(Err(e)),
    }
}

/// Resolves to one result per pair, shaped like [`similarity_batch`]. Pairs
/// that are not valid UTF-8 fail individually; a bad selector or
/// configuration fails every pair.
pub fn similarity_batch_async<P, Q>(
    engine: &SimilarityEngine,
    pairs: &[(P, Q)],
    algorithm: &AlgorithmSelector,
    config: Option<&ConfigInput>,
) -> TaskHandle<Vec<BoundaryResult<f64>>>
where
    P: AsRef<[u8]>,
    Q: AsRef<[u8]>,
{
    let setup = algorithm
        .resolve()
        .and_then(|algorithm| Ok((algorithm, call_config(config)?)));
    let (algorithm, config) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            let failed = pairs.iter().map(|_| Err::<f64, _>(e.clone()).into()).collect();
            return TaskHandle::ready(Ok(failed));
        }
    };

    let decoded = pairs
        .iter()
        .map(|(a, b)| -> Result<(String, String), SimilarityError> {
            Ok((decode_owned(a.as_ref())?, decode_owned(b.as_ref())?))
        })
        .collect();
    engine.submit_batch(decoded, algorithm, config, BoundaryResult::<f64>::from)
}

/// Absent fields take their default values; an unknown algorithm name or a
/// configuration that fails validation is rejected.
pub fn set_global_configuration(
    engine: &SimilarityEngine,
    config: &ConfigInput,
) -> BoundaryResult<bool> {
    config
        .to_config()
        .and_then(|config| engine.set_global_configuration(config))
        .map(|()| true)
        .into()
}

pub fn get_global_configuration(engine: &SimilarityEngine) -> ConfigInput {
    ConfigInput::from(&engine.global_configuration())
}

pub fn get_supported_algorithms(engine: &SimilarityEngine) -> Vec<AlgorithmInfo> {
    engine
        .supported_algorithms()
        .into_iter()
        .map(|algorithm| AlgorithmInfo {
            id: algorithm as u8,
            name: algorithm.display_name().to_string(),
        })
        .collect()
}

pub fn get_memory_usage(engine: &SimilarityEngine) -> usize {
    engine.memory_usage()
}

pub fn clear_caches(engine: &SimilarityEngine) {
    engine.clear_caches();
}

pub fn parse_algorithm_type(name: &str) -> Option<AlgorithmType> {
    AlgorithmType::from_name(name)
}

pub fn get_algorithm_name(id: u8) -> Option<&'static str> {
    AlgorithmType::from_u8(id).map(AlgorithmType::display_name)
}
