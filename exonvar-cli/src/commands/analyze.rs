//! Analyze command implementation - locate, align, call variants and extract features

use anyhow::Result;
use exonvar_core::{formats, AlignmentMode, AnalysisReport, Analyzer, Region};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use super::{ensure_exists, write_output};
use crate::config::Config;

/// One entry of a `--all` batch report.
#[derive(Debug, Serialize)]
struct BatchEntry {
    header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    reference: PathBuf,
    input: PathBuf,
    region: Option<Region>,
    mode: Option<AlignmentMode>,
    gene: Option<String>,
    out: Option<PathBuf>,
    all: bool,
    show_progress: bool,
) -> Result<()> {
    ensure_exists(&reference)?;
    ensure_exists(&input)?;

    let mut analysis = config.analysis_config(region, mode);
    if let Some(gene) = gene {
        analysis.gene = gene;
    }
    log::info!(
        "Analyzing {} against {} (region {} [{}], {} mode)",
        input.display(),
        reference.display(),
        config.region.name,
        analysis.region,
        analysis.mode
    );

    let reference = formats::read_reference(&reference)?;
    let records = formats::read_records(&input)?;
    log::info!("Loaded {} records", records.len());

    let analyzer = Analyzer::new(analysis);

    let json = if all {
        let spinner =
            if show_progress { ProgressBar::new_spinner() } else { ProgressBar::hidden() };
        spinner.set_message(format!("Analyzing {} records...", records.len()));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let entries: Vec<BatchEntry> = analyzer
            .analyze_batch(&reference, &records)
            .into_iter()
            .map(|(header, result)| match result {
                Ok(report) => BatchEntry { header, report: Some(report), error: None },
                Err(err) => {
                    log::warn!("Record '{}' failed: {}", header, err);
                    BatchEntry { header, report: None, error: Some(err.to_string()) }
                }
            })
            .collect();

        spinner.finish_and_clear();
        let failed = entries.iter().filter(|e| e.error.is_some()).count();
        log::info!("Analyzed {} records ({} failed)", entries.len(), failed);
        serde_json::to_string_pretty(&entries)?
    } else {
        let pb = if show_progress { ProgressBar::new(100) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
                .progress_chars("#>-"),
        );

        let report = analyzer.analyze_with_progress(&reference, &records, |fraction, stage| {
            pb.set_position((fraction * 100.0).round() as u64);
            pb.set_message(stage.to_string());
        })?;
        pb.finish_and_clear();

        log::info!(
            "Record '{}': {} variants, coverage {:.2}%",
            report.header.as_deref().unwrap_or("-"),
            report.region.metrics.total_variants,
            report.region.metrics.coverage_pct
        );
        report.to_json()?
    };

    write_output(out.as_ref(), &json)
}
