//! Locate command implementation - pick the record representing the target gene

use anyhow::Result;
use exonvar_core::{formats, GeneLocator, LocateMethod};
use serde::Serialize;
use std::path::PathBuf;

use super::{ensure_exists, write_output};
use crate::config::Config;

#[derive(Debug, Serialize)]
struct LocateOutput {
    header: String,
    method: LocateMethod,
    length: usize,
    score: Option<i32>,
}

pub fn execute(
    config: &Config,
    input: PathBuf,
    reference: PathBuf,
    gene: Option<String>,
) -> Result<()> {
    ensure_exists(&input)?;
    ensure_exists(&reference)?;

    let gene = gene.unwrap_or_else(|| config.locator.gene.clone());
    log::info!("Locating {} in {}", gene, input.display());

    let reference = formats::read_reference(&reference)?;
    let records = formats::read_records(&input)?;
    log::info!("Loaded {} records", records.len());

    let locator = GeneLocator::new(gene).with_scheme(config.locator_scheme());
    let located = locator.locate(&records, &reference)?;

    let output = LocateOutput {
        header: located.header,
        method: located.method,
        length: located.sequence.len(),
        score: located.score,
    };
    write_output(None, &serde_json::to_string_pretty(&output)?)
}
