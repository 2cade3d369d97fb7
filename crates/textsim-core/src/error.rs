//! Error types shared by every similarity operation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric error code handed across the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    Success = 0,
    InvalidInput,
    InvalidConfiguration,
    MemoryAllocation,
    UnicodeConversion,
    ComputationOverflow,
    ThreadingError,
    Unknown,
}

impl ErrorCode {
    /// Stable lowercase name, used in boundary results.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::InvalidConfiguration => "invalid_configuration",
            ErrorCode::MemoryAllocation => "memory_allocation",
            ErrorCode::UnicodeConversion => "unicode_conversion",
            ErrorCode::ComputationOverflow => "computation_overflow",
            ErrorCode::ThreadingError => "threading_error",
            ErrorCode::Unknown => "unknown",
        }
    }
}

/// Errors that can occur while computing a similarity or distance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimilarityError {
    /// Input rejected before computation (size limits, Hamming length mismatch)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration failed validation or lacks required parameters
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Scratch memory could not be obtained
    #[error("memory allocation failed: {0}")]
    MemoryAllocation(String),

    /// Malformed UTF-8 input
    #[error("unicode conversion failed: {0}")]
    UnicodeConversion(String),

    /// Distance math failed mid-computation
    #[error("computation overflow: {0}")]
    ComputationOverflow(String),

    /// Work submitted to (or pending on) an executor that shut down
    #[error("threading error: {0}")]
    ThreadingError(String),

    /// Anything else
    #[error("{0}")]
    Unknown(String),
}

impl SimilarityError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SimilarityError::InvalidInput(_) => ErrorCode::InvalidInput,
            SimilarityError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            SimilarityError::MemoryAllocation(_) => ErrorCode::MemoryAllocation,
            SimilarityError::UnicodeConversion(_) => ErrorCode::UnicodeConversion,
            SimilarityError::ComputationOverflow(_) => ErrorCode::ComputationOverflow,
            SimilarityError::ThreadingError(_) => ErrorCode::ThreadingError,
            SimilarityError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            SimilarityError::InvalidInput(m)
            | SimilarityError::InvalidConfiguration(m)
            | SimilarityError::MemoryAllocation(m)
            | SimilarityError::UnicodeConversion(m)
            | SimilarityError::ComputationOverflow(m)
            | SimilarityError::ThreadingError(m)
            | SimilarityError::Unknown(m) => m,
        }
    }
}

/// Result of a similarity computation (0.0..=1.0 for normalized algorithms)
pub type SimilarityResult = Result<f64, SimilarityError>;

/// Result of a distance computation
pub type DistanceResult = Result<u32, SimilarityError>;
