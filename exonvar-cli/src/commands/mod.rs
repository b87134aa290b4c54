//! Command implementations for exonvar CLI

pub mod locate;
pub mod align;
pub mod analyze;
pub mod features;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Fail early with a suggestion-friendly error when an input is missing.
pub fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()).into());
    }
    Ok(())
}

/// Write `content` to `out`, or to stdout when no path is given.
pub fn write_output(out: Option<&PathBuf>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            log::info!("Output: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
