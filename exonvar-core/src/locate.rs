//! Picking the record that represents the target gene in a multi-record input.

use crate::align::align;
use crate::error::{EngineError, EngineResult};
use crate::scoring::{AlignmentMode, ScoringScheme};
use crate::sequence::Sequence;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gene targeted by the default configuration.
pub const DEFAULT_GENE: &str = "PKD1";

/// A raw record as read from a FASTA-like input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub header: String,
    pub sequence: String,
}

impl RawRecord {
    pub fn new<H: Into<String>, S: Into<String>>(header: H, sequence: S) -> Self {
        Self { header: header.into(), sequence: sequence.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocateMethod {
    HeaderMatch,
    AlignmentMatch,
}

impl fmt::Display for LocateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateMethod::HeaderMatch => write!(f, "header-match"),
            LocateMethod::AlignmentMatch => write!(f, "alignment-match"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedGene {
    pub header: String,
    pub sequence: Sequence,
    pub method: LocateMethod,
    /// Screening score, for alignment matches
    pub score: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct GeneLocator {
    pub gene: String,
    /// Linear-gap scheme used to rank records when no header matches
    pub scheme: ScoringScheme,
}

impl Default for GeneLocator {
    fn default() -> Self {
        Self::new(DEFAULT_GENE)
    }
}

impl GeneLocator {
    pub fn new<S: Into<String>>(gene: S) -> Self {
        Self { gene: gene.into(), scheme: ScoringScheme::screening() }
    }

    pub fn with_scheme(mut self, scheme: ScoringScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Select the record representing the gene.
    ///
    /// Header matches win (longest sequence, first on ties); otherwise every
    /// record is aligned against `reference` and the best score wins (first
    /// on ties). Records that fail validation are skipped.
    pub fn locate(&self, records: &[RawRecord], reference: &Sequence) -> EngineResult<LocatedGene> {
        let candidates: Vec<(&RawRecord, Sequence)> = records
            .iter()
            .filter_map(|record| match Sequence::labelled(&record.header, &record.sequence) {
                Ok(sequence) => Some((record, sequence)),
                Err(err) => {
                    log::warn!("skipping record '{}': {}", record.header, err);
                    None
                }
            })
            .collect();

        if candidates.is_empty() {
            return Err(EngineError::not_found(&self.gene));
        }

        let needle = self.gene.to_uppercase();
        let mut best_header_match: Option<&(&RawRecord, Sequence)> = None;
        let header_matches = candidates
            .iter()
            .filter(|(r, _)| r.header.to_uppercase().contains(&needle));
        for candidate in header_matches {
            if best_header_match.map_or(true, |(_, best)| candidate.1.len() > best.len()) {
                best_header_match = Some(candidate);
            }
        }

        if let Some((record, sequence)) = best_header_match {
            log::info!("found {} by header: {}", self.gene, record.header);
            return Ok(LocatedGene {
                header: record.header.clone(),
                sequence: sequence.clone(),
                method: LocateMethod::HeaderMatch,
                score: None,
            });
        }

        log::info!(
            "no header mentions {}; ranking {} records by alignment",
            self.gene,
            candidates.len()
        );

        let scores: Vec<Option<i32>> = candidates
            .par_iter()
            .map(|(record, sequence)| {
                match align(reference, sequence, &self.scheme, AlignmentMode::Local) {
                    Ok(alignment) => {
                        log::debug!(
                            "record '{}' screening score {}",
                            record.header,
                            alignment.score
                        );
                        Some(alignment.score)
                    }
                    Err(err) => {
                        log::debug!("record '{}' not scored: {}", record.header, err);
                        None
                    }
                }
            })
            .collect();

        let mut best: Option<(usize, i32)> = None;
        for (index, score) in scores.iter().enumerate() {
            if let Some(score) = *score {
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((index, score));
                }
            }
        }

        let (index, score) = best.ok_or_else(|| EngineError::not_found(&self.gene))?;
        let (record, sequence) = &candidates[index];
        log::info!("best alignment match for {}: {} (score {})", self.gene, record.header, score);

        Ok(LocatedGene {
            header: record.header.clone(),
            sequence: sequence.clone(),
            method: LocateMethod::AlignmentMatch,
            score: Some(score),
        })
    }
}
