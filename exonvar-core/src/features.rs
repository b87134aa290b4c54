//! Fixed-schema feature vectors for the downstream classifier.
//!
//! The classifier is trained on rows keyed by [`FEATURE_NAMES`]; the names
//! must not change between releases. Every key is always present, and any
//! feature whose inputs are missing is `0.0`.

use crate::align::align;
use crate::scoring::{AlignmentMode, ScoringScheme};
use crate::sequence::{is_transition, is_transversion, Sequence, CANONICAL_BASES};
use crate::variants::{call_variants, AnalysisMetrics, Region, Variant};
use serde::Serialize;
use std::collections::BTreeMap;

/// Column names of the classifier's input row.
pub const FEATURE_NAMES: [&str; 19] = [
    "freq_A",
    "freq_C",
    "freq_G",
    "freq_T",
    "len",
    "gc_content",
    "at_content",
    "identity_pct",
    "mismatch_density",
    "transition_ratio",
    "transversion_ratio",
    "ts_tv_ratio",
    "insertion_count",
    "deletion_count",
    "gap_density",
    "frameshift_flag",
    "coverage_pct",
    "length_delta",
    "length_deviation_flag",
];

/// Relative length difference above which a sample is flagged.
pub const LENGTH_DEVIATION_THRESHOLD: f64 = 0.10;

/// Closed name -> value mapping over [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<&'static str, f64>,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: FEATURE_NAMES.iter().map(|&name| (name, 0.0)).collect(),
        }
    }
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(&name, &value)| (name, value))
    }

    /// Values in [`FEATURE_NAMES`] order, for positional consumers.
    pub fn to_row(&self) -> Vec<f64> {
        FEATURE_NAMES
            .iter()
            .map(|name| self.values.get(name).copied().unwrap_or(0.0))
            .collect()
    }

    /// Header line plus one value line.
    pub fn to_csv(&self) -> String {
        let header = FEATURE_NAMES.join(",");
        let row: Vec<String> = self.to_row().iter().map(|v| v.to_string()).collect();
        format!("{}\n{}\n", header, row.join(","))
    }

    fn set(&mut self, name: &'static str, value: f64) {
        debug_assert!(FEATURE_NAMES.contains(&name), "unknown feature {}", name);
        let value = if value.is_finite() { value } else { 0.0 };
        self.values.insert(name, value);
    }
}

/// Derives feature vectors from samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor {
    /// Scheme for the global alignment of the raw-sequence entry point
    pub scheme: ScoringScheme,
}

impl FeatureExtractor {
    pub fn new(scheme: ScoringScheme) -> Self {
        Self { scheme }
    }

    /// Features from results already computed upstream.
    pub fn extract_from_precomputed(
        &self,
        sample: &Sequence,
        reference: Option<&Sequence>,
        variants: &[Variant],
        identity: Option<f64>,
        metrics: Option<&AnalysisMetrics>,
    ) -> FeatureVector {
        let mut features = FeatureVector::default();

        let counts = sample.base_counts();
        let canonical = counts.canonical_total() as f64;
        let fraction = |n: usize| if canonical > 0.0 { n as f64 / canonical } else { 0.0 };
        for (&base, name) in CANONICAL_BASES.iter().zip(["freq_A", "freq_C", "freq_G", "freq_T"]) {
            features.set(name, fraction(counts.count(base)));
        }
        features.set("gc_content", fraction(counts.g + counts.c));
        features.set("at_content", fraction(counts.a + counts.t));

        let sample_len = sample.residue_count();
        features.set("len", sample_len as f64);
        features.set("identity_pct", identity.unwrap_or(0.0));

        let tally = VariantTally::from_variants(variants);
        let (inserted, deleted) = match metrics {
            Some(m) => (m.inserted_nt, m.deleted_nt),
            None => (tally.insertions, tally.deletions),
        };
        features.set("insertion_count", inserted as f64);
        features.set("deletion_count", deleted as f64);
        features.set("frameshift_flag", frameshift(inserted, deleted));
        features.set("ts_tv_ratio", ratio(tally.transitions, tally.transversions));
        features.set("coverage_pct", metrics.map(|m| m.coverage_pct).unwrap_or(0.0));

        if let Some(reference) = reference {
            let ref_len = reference.len();
            features.set("mismatch_density", ratio(tally.substitutions, ref_len));
            features.set("transition_ratio", ratio(tally.transitions, ref_len));
            features.set("transversion_ratio", ratio(tally.transversions, ref_len));
            features.set("gap_density", ratio(inserted + deleted, ref_len));

            let delta = sample_len as f64 - ref_len as f64;
            features.set("length_delta", delta);
            let deviates = ref_len > 0 && delta.abs() / ref_len as f64 > LENGTH_DEVIATION_THRESHOLD;
            features.set("length_deviation_flag", if deviates { 1.0 } else { 0.0 });
        }

        features
    }

    /// Features from raw sequences only.
    ///
    /// With a reference, variants, identity and metrics are re-derived from an
    /// independent global alignment over the whole reference.
    pub fn extract_from_raw_sequences(
        &self,
        sample: &Sequence,
        reference: Option<&Sequence>,
    ) -> FeatureVector {
        let Some(reference) = reference else {
            return self.extract_from_precomputed(sample, None, &[], None, None);
        };

        match align(reference, sample, &self.scheme, AlignmentMode::Global) {
            Ok(alignment) => {
                let region = Region::new(0, reference.len());
                let call = call_variants(&alignment.path, reference, sample, region);
                let identity = alignment.identity(reference, sample);
                self.extract_from_precomputed(
                    sample,
                    Some(reference),
                    &call.variants,
                    Some(identity),
                    Some(&call.metrics),
                )
            }
            Err(err) => {
                log::warn!("feature re-alignment failed, degrading to composition only: {}", err);
                self.extract_from_precomputed(sample, Some(reference), &[], None, None)
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct VariantTally {
    substitutions: usize,
    transitions: usize,
    transversions: usize,
    insertions: usize,
    deletions: usize,
}

impl VariantTally {
    fn from_variants(variants: &[Variant]) -> Self {
        let mut tally = Self::default();
        for variant in variants {
            match *variant {
                Variant::Substitution { reference, alt, .. } => {
                    tally.substitutions += 1;
                    let (from, to) = (reference as u8, alt as u8);
                    if is_transition(from, to) {
                        tally.transitions += 1;
                    } else if is_transversion(from, to) {
                        tally.transversions += 1;
                    }
                }
                Variant::Insertion { .. } => tally.insertions += 1,
                Variant::Deletion { .. } => tally.deletions += 1,
            }
        }
        tally
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn frameshift(inserted: usize, deleted: usize) -> f64 {
    let net = inserted as i64 - deleted as i64;
    if net.rem_euclid(3) != 0 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> Sequence {
        Sequence::new(s).unwrap()
    }

    fn assert_complete(features: &FeatureVector) {
        assert_eq!(features.len(), FEATURE_NAMES.len());
        for name in FEATURE_NAMES {
            assert!(features.get(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_sample_only() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract_from_raw_sequences(&seq("AACGTN"), None);
        assert_complete(&features);
        assert_eq!(features.get("freq_A"), Some(0.4));
        assert_eq!(features.get("gc_content"), Some(0.4));
        assert_eq!(features.get("at_content"), Some(0.6));
        assert_eq!(features.get("len"), Some(6.0));
        assert_eq!(features.get("mismatch_density"), Some(0.0));
        assert_eq!(features.get("identity_pct"), Some(0.0));
        assert_eq!(features.get("length_delta"), Some(0.0));
    }

    #[test]
    fn test_all_ambiguous_sample() {
        let features = FeatureExtractor::default().extract_from_raw_sequences(&seq("NNNN"), None);
        assert_complete(&features);
        assert_eq!(features.get("freq_A"), Some(0.0));
        assert_eq!(features.get("gc_content"), Some(0.0));
    }

    #[test]
    fn test_raw_sequences_with_reference() {
        let reference = seq("AAAACCCCGGGGTTTT");
        let sample = seq("AAAACCTCGGGGTTTT");
        let features =
            FeatureExtractor::default().extract_from_raw_sequences(&sample, Some(&reference));
        assert_complete(&features);
        assert_eq!(features.get("identity_pct"), Some(93.75));
        assert_eq!(features.get("mismatch_density"), Some(1.0 / 16.0));
        // C>T is a transition
        assert_eq!(features.get("transition_ratio"), Some(1.0 / 16.0));
        assert_eq!(features.get("transversion_ratio"), Some(0.0));
        assert_eq!(features.get("ts_tv_ratio"), Some(0.0));
        assert_eq!(features.get("coverage_pct"), Some(100.0));
        assert_eq!(features.get("frameshift_flag"), Some(0.0));
        assert_eq!(features.get("length_deviation_flag"), Some(0.0));
    }

    #[test]
    fn test_frameshift_and_length_deviation() {
        let reference = seq("AAAACCCCGGGG");
        let sample = seq("AAAAGGGG");
        let features =
            FeatureExtractor::default().extract_from_raw_sequences(&sample, Some(&reference));
        assert_eq!(features.get("deletion_count"), Some(4.0));
        assert_eq!(features.get("insertion_count"), Some(0.0));
        assert_eq!(features.get("frameshift_flag"), Some(1.0));
        assert_eq!(features.get("gap_density"), Some(4.0 / 12.0));
        assert_eq!(features.get("length_delta"), Some(-4.0));
        assert_eq!(features.get("length_deviation_flag"), Some(1.0));
    }

    #[test]
    fn test_in_frame_indel_is_not_frameshift() {
        assert_eq!(frameshift(3, 0), 0.0);
        assert_eq!(frameshift(0, 6), 0.0);
        assert_eq!(frameshift(4, 1), 0.0);
        assert_eq!(frameshift(0, 1), 1.0);
        assert_eq!(frameshift(2, 0), 1.0);
    }

    #[test]
    fn test_ts_tv_ratio() {
        let variants = vec![
            Variant::Substitution { genomic_pos: 1, exon_pos: 1, reference: 'A', alt: 'G' },
            Variant::Substitution { genomic_pos: 2, exon_pos: 2, reference: 'C', alt: 'T' },
            Variant::Substitution { genomic_pos: 3, exon_pos: 3, reference: 'A', alt: 'C' },
        ];
        let features = FeatureExtractor::default().extract_from_precomputed(
            &seq("GTC"),
            Some(&seq("ACA")),
            &variants,
            Some(0.0),
            None,
        );
        assert_eq!(features.get("ts_tv_ratio"), Some(2.0));
        assert_eq!(features.get("mismatch_density"), Some(1.0));
    }

    #[test]
    fn test_csv_row_matches_schema() {
        let features = FeatureVector::default();
        let csv = features.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap().split(',').count(), FEATURE_NAMES.len());
        assert_eq!(lines.next().unwrap().split(',').count(), FEATURE_NAMES.len());
        assert_eq!(features.to_row().len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_json_is_flat_mapping() {
        let json = serde_json::to_value(FeatureVector::default()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), FEATURE_NAMES.len());
        assert_eq!(object["frameshift_flag"], 0.0);
    }
}
