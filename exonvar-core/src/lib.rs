//! exonvar Core Library
//!
//! Affine-gap pairwise alignment, exon-region variant calling, feature
//! extraction and gene locating for exonvar.

pub mod error;
pub mod sequence;
pub mod scoring;
pub mod align;
pub mod variants;
pub mod features;
pub mod locate;
pub mod pipeline;
pub mod io;

// Re-export commonly used types and functions
pub use error::{EngineError, EngineResult};
pub use sequence::Sequence;
pub use scoring::{AlignmentMode, ScoringScheme};
pub use align::{
    align, AffineAligner, Aligner, Alignment, AlignmentPath, AlignmentSummary, Checkpoint,
};
pub use variants::{call_variants, AnalysisMetrics, Region, RegionCall, Variant};
pub use features::{FeatureExtractor, FeatureVector, FEATURE_NAMES};
pub use locate::{GeneLocator, LocateMethod, LocatedGene, RawRecord};
pub use pipeline::{AnalysisConfig, AnalysisReport, Analyzer};
pub use io as formats;

/// Version information for the exonvar core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
