//! Error kinds reported by the alignment and variant-calling engine.

use thiserror::Error;

/// Closed set of failures the engine reports to its callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Empty input: {which} sequence has no bases after normalization")]
    EmptyInput { which: String },

    #[error("Invalid symbol '{symbol}' at position {position} in {which} sequence")]
    InvalidSymbol {
        which: String,
        symbol: char,
        position: usize,
    },

    #[error("No significant alignment found (best local score {best_score})")]
    NoSignificantAlignment { best_score: i32 },

    #[error("Region [{start}, {end}) lies outside the aligned span of the sequences (reference length {reference_len})")]
    RegionOutOfBounds {
        start: usize,
        end: usize,
        reference_len: usize,
    },

    #[error("No acceptable record found for gene {gene}")]
    NotFound { gene: String },
}

impl EngineError {
    pub fn empty_input<S: Into<String>>(which: S) -> Self {
        Self::EmptyInput { which: which.into() }
    }

    pub fn not_found<S: Into<String>>(gene: S) -> Self {
        Self::NotFound { gene: gene.into() }
    }

    /// Whether the caller can continue with a degraded (zero-coverage) result.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RegionOutOfBounds { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
