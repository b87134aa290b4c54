//! Features command implementation - classifier input for a single sample

use anyhow::Result;
use exonvar_core::{formats, FeatureExtractor};
use std::path::PathBuf;

use super::{ensure_exists, write_output};
use crate::config::Config;
use crate::OutputFormat;

pub fn execute(
    config: &Config,
    sample: PathBuf,
    reference: Option<PathBuf>,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    ensure_exists(&sample)?;
    let reference = match reference {
        Some(path) => {
            ensure_exists(&path)?;
            Some(formats::read_reference(&path)?)
        }
        None => {
            log::info!("No reference given, computing composition features only");
            None
        }
    };

    let (header, sample) = formats::read_first_sequence(&sample)?;
    log::info!("Extracting features for '{}' ({} bp)", header, sample.len());

    let extractor = FeatureExtractor::new(config.scoring);
    let features = extractor.extract_from_raw_sequences(&sample, reference.as_ref());

    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&features)?,
        OutputFormat::Csv => features.to_csv().trim_end().to_string(),
    };
    write_output(out.as_ref(), &content)
}
