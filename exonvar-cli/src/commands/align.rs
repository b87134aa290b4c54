//! Align command implementation - pairwise alignment of one sample against the reference

use anyhow::Result;
use exonvar_core::{formats, AffineAligner, Aligner, AlignmentMode};
use std::path::PathBuf;

use super::{ensure_exists, write_output};
use crate::config::Config;

pub fn execute(
    config: &Config,
    reference: PathBuf,
    sample: PathBuf,
    mode: Option<AlignmentMode>,
) -> Result<()> {
    ensure_exists(&reference)?;
    ensure_exists(&sample)?;

    let reference = formats::read_reference(&reference)?;
    let (header, sample) = formats::read_first_sequence(&sample)?;

    let aligner = AffineAligner::new(config.scoring, mode.unwrap_or(config.alignment.mode));
    log::info!("Aligning '{}' ({} bp) with {}", header, sample.len(), aligner.name());

    let alignment = aligner.align(&reference, &sample)?;
    let summary = alignment.summary(&reference, &sample);
    log::info!("Score: {}, identity: {:.2}%", summary.score, summary.identity_pct);

    write_output(None, &serde_json::to_string_pretty(&summary)?)
}
