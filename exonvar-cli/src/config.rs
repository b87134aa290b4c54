//! Configuration handling for exonvar CLI
//!
//! Supports loading configuration from exonvar.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use exonvar_core::variants::{EXON29_END, EXON29_START};
use exonvar_core::{AlignmentMode, AnalysisConfig, Region, ScoringScheme};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "exonvar.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub region: RegionConfig,
    #[serde(default)]
    pub scoring: ScoringScheme,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Worker threads for batch analysis; 0 lets rayon decide
    #[serde(default = "default_threads")]
    pub threads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region start in reference coordinates (0-based)
    #[serde(default = "default_region_start")]
    pub start: usize,

    /// Region end (exclusive)
    #[serde(default = "default_region_end")]
    pub end: usize,

    /// Label used in logs and reports
    #[serde(default = "default_region_name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Alignment mode ("local" or "global")
    #[serde(default)]
    pub mode: AlignmentMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Gene name searched for in record headers
    #[serde(default = "default_gene")]
    pub gene: String,

    /// Screening match score
    #[serde(default = "default_locator_match")]
    pub match_score: i32,

    /// Screening mismatch score
    #[serde(default = "default_locator_mismatch")]
    pub mismatch_score: i32,

    /// Screening linear gap score
    #[serde(default = "default_locator_gap")]
    pub gap: i32,
}

// Default value functions
fn default_threads() -> usize { 0 }
fn default_region_start() -> usize { EXON29_START }
fn default_region_end() -> usize { EXON29_END }
fn default_region_name() -> String { "exon29".to_string() }
fn default_gene() -> String { exonvar_core::locate::DEFAULT_GENE.to_string() }
fn default_locator_match() -> i32 { 1 }
fn default_locator_mismatch() -> i32 { -1 }
fn default_locator_gap() -> i32 { -1 }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { threads: default_threads() }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            start: default_region_start(),
            end: default_region_end(),
            name: default_region_name(),
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self { mode: AlignmentMode::Local }
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            gene: default_gene(),
            match_score: default_locator_match(),
            mismatch_score: default_locator_mismatch(),
            gap: default_locator_gap(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            region: RegionConfig::default(),
            scoring: ScoringScheme::default(),
            alignment: AlignmentConfig::default(),
            locator: LocatorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::file_not_found(path.to_path_buf()).into());
                }
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).map_err(CliError::from)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> CliResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate example configuration file content
    pub fn example_toml() -> CliResult<String> {
        Self::default().to_toml()
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> CliResult<()> {
        self.scoring
            .validate()
            .map_err(|e| CliError::config(format!("[scoring] {}", e)))?;

        if self.region.start >= self.region.end {
            return Err(CliError::config(format!(
                "[region] start ({}) must be below end ({})",
                self.region.start, self.region.end
            )));
        }
        if self.locator.gene.trim().is_empty() {
            return Err(CliError::config("[locator] gene must not be empty"));
        }
        self.locator_scheme()
            .validate()
            .map_err(|e| CliError::config(format!("[locator] {}", e)))?;
        Ok(())
    }

    pub fn region(&self) -> Region {
        Region::new(self.region.start, self.region.end)
    }

    /// Linear-gap scheme for ranking records by alignment.
    pub fn locator_scheme(&self) -> ScoringScheme {
        ScoringScheme::linear(
            self.locator.match_score,
            self.locator.mismatch_score,
            self.locator.gap,
        )
    }

    /// Engine settings with optional command-line overrides applied.
    pub fn analysis_config(
        &self,
        region: Option<Region>,
        mode: Option<AlignmentMode>,
    ) -> AnalysisConfig {
        AnalysisConfig {
            region: region.unwrap_or_else(|| self.region()),
            scheme: self.scoring,
            mode: mode.unwrap_or(self.alignment.mode),
            gene: self.locator.gene.clone(),
            screening: self.locator_scheme(),
        }
    }
}
