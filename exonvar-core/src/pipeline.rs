//! End-to-end analysis of a sample against the reference.
//!
//! Locate the gene record, align it, call variants inside the configured
//! region and derive the classifier features. Each call returns its own
//! [`AnalysisReport`]; nothing is cached between calls.

use crate::align::{AffineAligner, Aligner, AlignmentSummary};
use crate::error::EngineResult;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::locate::{GeneLocator, LocateMethod, RawRecord, DEFAULT_GENE};
use crate::scoring::{AlignmentMode, ScoringScheme};
use crate::sequence::Sequence;
use crate::variants::{call_variants, Region, RegionCall};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub region: Region,
    pub scheme: ScoringScheme,
    pub mode: AlignmentMode,
    pub gene: String,
    /// Linear-gap scheme for ranking records without a matching header
    pub screening: ScoringScheme,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            scheme: ScoringScheme::default(),
            mode: AlignmentMode::Local,
            gene: DEFAULT_GENE.to_string(),
            screening: ScoringScheme::screening(),
        }
    }
}

/// Stages reported to progress callbacks, with their completion fraction.
pub mod stage {
    pub const VALIDATING: (f64, &str) = (0.1, "Validating sequence...");
    pub const ALIGNING: (f64, &str) = (0.3, "Running alignment...");
    pub const CALLING: (f64, &str) = (0.7, "Calling variants...");
    pub const DONE: (f64, &str) = (1.0, "Done");
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Header of the analyzed record, when one was located
    pub header: Option<String>,
    pub locate_method: Option<LocateMethod>,
    pub alignment: AlignmentSummary,
    pub region: RegionCall,
    pub features: FeatureVector,
    /// Recoverable conditions met along the way
    pub warnings: Vec<String>,
}

impl AnalysisReport {
    /// Pretty-printed JSON, the shape consumed by the classifier and summarizer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct Analyzer {
    config: AnalysisConfig,
    aligner: Box<dyn Aligner>,
    locator: GeneLocator,
    extractor: FeatureExtractor,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let aligner = Box::new(AffineAligner::new(config.scheme, config.mode));
        let locator = GeneLocator::new(config.gene.clone()).with_scheme(config.screening);
        let extractor = FeatureExtractor::new(config.scheme);
        Self { config, aligner, locator, extractor }
    }

    /// Replace the DP aligner, e.g. with a banded implementation.
    pub fn with_aligner(mut self, aligner: Box<dyn Aligner>) -> Self {
        self.aligner = aligner;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Locate the gene among `records` and analyze it.
    pub fn analyze(
        &self,
        reference: &Sequence,
        records: &[RawRecord],
    ) -> EngineResult<AnalysisReport> {
        self.analyze_with_progress(reference, records, |_, _| {})
    }

    pub fn analyze_with_progress<F>(
        &self,
        reference: &Sequence,
        records: &[RawRecord],
        mut progress: F,
    ) -> EngineResult<AnalysisReport>
    where
        F: FnMut(f64, &str),
    {
        progress(stage::VALIDATING.0, stage::VALIDATING.1);
        let located = self.locator.locate(records, reference)?;

        let mut report = self.run(reference, &located.sequence, &mut progress)?;
        report.header = Some(located.header);
        report.locate_method = Some(located.method);
        Ok(report)
    }

    /// Analyze one already-selected sample sequence.
    pub fn analyze_sequence(
        &self,
        reference: &Sequence,
        sample: &Sequence,
    ) -> EngineResult<AnalysisReport> {
        self.run(reference, sample, &mut |_, _| {})
    }

    /// Analyze every valid record independently, in parallel.
    ///
    /// Results keep the input order.
    pub fn analyze_batch(
        &self,
        reference: &Sequence,
        records: &[RawRecord],
    ) -> Vec<(String, EngineResult<AnalysisReport>)> {
        records
            .par_iter()
            .map(|record| {
                let result =
                    Sequence::labelled(&record.header, &record.sequence).and_then(|sample| {
                        let mut report = self.analyze_sequence(reference, &sample)?;
                        report.header = Some(record.header.clone());
                        Ok(report)
                    });
                (record.header.clone(), result)
            })
            .collect()
    }

    fn run(
        &self,
        reference: &Sequence,
        sample: &Sequence,
        progress: &mut dyn FnMut(f64, &str),
    ) -> EngineResult<AnalysisReport> {
        let region = self.config.region;
        let mut warnings = Vec::new();

        progress(stage::ALIGNING.0, stage::ALIGNING.1);
        log::info!(
            "aligning {} bp sample against {} bp reference ({})",
            sample.len(),
            reference.len(),
            self.aligner.name()
        );
        let alignment = self.aligner.align(reference, sample)?;
        let summary = alignment.summary(reference, sample);
        log::info!("alignment score {}, identity {:.2}%", summary.score, summary.identity_pct);

        progress(stage::CALLING.0, stage::CALLING.1);
        if let Err(err) = region.check_reachable(&alignment.path, reference.len()) {
            if !err.is_recoverable() {
                return Err(err);
            }
            log::warn!("{}", err);
            warnings.push(err.to_string());
        }
        let call = call_variants(&alignment.path, reference, sample, region);
        log::info!(
            "region {}: {} variants ({} substitutions), coverage {:.2}%",
            region,
            call.metrics.total_variants,
            call.substitutions().count(),
            call.metrics.coverage_pct
        );

        let empty = Sequence::from_aligned(Vec::new());
        let region_sample = call.subsequence.as_ref().unwrap_or(&empty);
        let region_reference = reference.slice(region.start, region.end);
        let features = self.extractor.extract_from_precomputed(
            region_sample,
            Some(&region_reference),
            &call.variants,
            Some(summary.identity_pct),
            Some(&call.metrics),
        );

        progress(stage::DONE.0, stage::DONE.1);

        Ok(AnalysisReport {
            header: None,
            locate_method: None,
            alignment: summary,
            region: call,
            features,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn config(region: Region, mode: AlignmentMode) -> AnalysisConfig {
        AnalysisConfig { region, mode, ..AnalysisConfig::default() }
    }

    #[test]
    fn test_analyze_located_record() {
        let reference = Sequence::new("AAAACCCCGGGGTTTT").unwrap();
        let records = vec![
            RawRecord::new("unrelated", "GGGGGGGG"),
            RawRecord::new("felis PKD1", "AAAACCTCGGGGTTTT"),
        ];
        let analyzer = Analyzer::new(config(Region::new(4, 8), AlignmentMode::Global));

        let mut stages = Vec::new();
        let report = analyzer
            .analyze_with_progress(&reference, &records, |fraction, _| stages.push(fraction))
            .unwrap();

        assert_eq!(stages, vec![0.1, 0.3, 0.7, 1.0]);
        assert_eq!(report.header.as_deref(), Some("felis PKD1"));
        assert_eq!(report.locate_method, Some(LocateMethod::HeaderMatch));
        assert_eq!(report.region.variants.len(), 1);
        assert_eq!(report.alignment.identity_pct, 93.75);
        assert_eq!(report.features.get("coverage_pct"), Some(100.0));
        assert_eq!(report.features.get("len"), Some(4.0));
        assert!(report.warnings.is_empty());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"exon_disponivel\": true"));
        assert!(json.contains("\"locate_method\": \"header-match\""));
    }

    #[test]
    fn test_unreachable_region_is_recoverable() {
        let reference = Sequence::new("ACGTACGTAC").unwrap();
        let sample = Sequence::new("ACGTACGTAC").unwrap();
        let analyzer = Analyzer::new(config(Region::default(), AlignmentMode::Global));

        let report = analyzer.analyze_sequence(&reference, &sample).unwrap();
        assert_eq!(report.region.subsequence, None);
        assert_eq!(report.region.metrics.coverage_pct, 0.0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.features.get("coverage_pct"), Some(0.0));
    }

    #[test]
    fn test_local_span_covers_part_of_region() {
        // The sample matches reference 8..18 only; the region starts at 4
        let reference = Sequence::new("CCCCCCCCACGTTGCAAC").unwrap();
        let sample = Sequence::new("ACGTTGCAAC").unwrap();
        let analyzer = Analyzer::new(config(Region::new(4, 12), AlignmentMode::Local));

        let report = analyzer.analyze_sequence(&reference, &sample).unwrap();
        assert_eq!(report.alignment.reference_start, 8);
        assert_eq!(report.alignment.reference_end, 18);
        assert_eq!(report.region.subsequence.as_ref().unwrap().to_string(), "ACGT");
        assert!(report.region.variants.is_empty());
        assert_eq!(report.region.metrics.coverage_pct, 50.0);
        assert!(report.region.metrics.region_available);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_hard_failures_propagate() {
        let reference = Sequence::new("AAAAAAAA").unwrap();
        let sample = Sequence::new("CCCC").unwrap();
        let analyzer = Analyzer::new(config(Region::new(0, 4), AlignmentMode::Local));
        assert!(matches!(
            analyzer.analyze_sequence(&reference, &sample),
            Err(EngineError::NoSignificantAlignment { .. })
        ));
    }

    #[test]
    fn test_batch_keeps_order() {
        let reference = Sequence::new("AAAACCCCGGGGTTTT").unwrap();
        let records = vec![
            RawRecord::new("first", "AAAACCCCGGGGTTTT"),
            RawRecord::new("broken", ""),
            RawRecord::new("third", "AAAACCTCGGGGTTTT"),
        ];
        let analyzer = Analyzer::new(config(Region::new(4, 8), AlignmentMode::Global));
        let results = analyzer.analyze_batch(&reference, &records);

        let headers: Vec<&str> = results.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(headers, vec!["first", "broken", "third"]);
        assert!(results[0].1.as_ref().unwrap().region.variants.is_empty());
        assert!(matches!(results[1].1, Err(EngineError::EmptyInput { .. })));
        assert_eq!(results[2].1.as_ref().unwrap().region.variants.len(), 1);
    }
}
