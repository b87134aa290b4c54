use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use exonvar_core::{AlignmentMode, Region};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use config::Config;
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "exonvar")]
#[command(about = "exonvar - exon alignment, variant calling and feature extraction")]
#[command(version)]
#[command(long_about = "
exonvar aligns sample sequences against a gene reference with affine gap
penalties, reports the variants that fall inside an exon region and derives
a fixed feature vector for downstream classifiers.

Examples:
  exonvar locate --input samples.fa --reference pkd1.fa
  exonvar align --reference pkd1.fa --sample cat.fa --mode global
  exonvar analyze --reference pkd1.fa --input samples.fa --region 9950-10150 --out report.json
  exonvar analyze --reference pkd1.fa --input samples.fa --all
  exonvar features --sample cat.fa --reference pkd1.fa --format csv
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the record representing the target gene
    Locate {
        /// Multi-record sample file (FASTA/FASTQ, optionally gzipped)
        #[arg(short, long)]
        input: PathBuf,

        /// Reference sequence file (single record)
        #[arg(short, long)]
        reference: PathBuf,

        /// Gene name to search for in headers
        #[arg(long)]
        gene: Option<String>,
    },

    /// Align one sample against the reference
    Align {
        /// Reference sequence file (single record)
        #[arg(short, long)]
        reference: PathBuf,

        /// Sample file; the first record is aligned
        #[arg(short, long)]
        sample: PathBuf,

        /// Alignment mode
        #[arg(long)]
        mode: Option<ModeArg>,
    },

    /// Locate, align, call region variants and extract features
    Analyze {
        /// Reference sequence file (single record)
        #[arg(short, long)]
        reference: PathBuf,

        /// Multi-record sample file
        #[arg(short, long)]
        input: PathBuf,

        /// Region to call variants in, as START-END (0-based, end exclusive)
        #[arg(long)]
        region: Option<Region>,

        /// Alignment mode
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Gene name to search for in headers
        #[arg(long)]
        gene: Option<String>,

        /// Output file (JSON); stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Analyze every record instead of locating one
        #[arg(long)]
        all: bool,
    },

    /// Compute the classifier feature vector of a sample
    Features {
        /// Sample file; the first record is used
        #[arg(short, long)]
        sample: PathBuf,

        /// Reference sequence file; composition features only when omitted
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show or generate configuration
    Config {
        /// Print a default exonvar.toml
        #[arg(long)]
        example: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Smith-Waterman: best local match
    Local,
    /// Needleman-Wunsch: end-to-end
    Global,
}

impl From<ModeArg> for AlignmentMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => AlignmentMode::Local,
            ModeArg::Global => AlignmentMode::Global,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        print_error_and_exit(&CliError::from_anyhow(err));
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let threads = cli.threads.unwrap_or(config.general.threads);
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread count")?;
    }

    match cli.command {
        Commands::Locate { input, reference, gene } => {
            commands::locate::execute(&config, input, reference, gene)
        }
        Commands::Align { reference, sample, mode } => {
            commands::align::execute(&config, reference, sample, mode.map(Into::into))
        }
        Commands::Analyze { reference, input, region, mode, gene, out, all } => {
            commands::analyze::execute(
                &config,
                reference,
                input,
                region,
                mode.map(Into::into),
                gene,
                out,
                all,
                !cli.quiet,
            )
        }
        Commands::Features { sample, reference, format, out } => {
            commands::features::execute(&config, sample, reference, format, out)
        }
        Commands::Config { example, show } => cmd_config(&config, example, show),
    }
}

fn cmd_config(config: &Config, example: bool, show: bool) -> Result<()> {
    if example {
        print!("{}", Config::example_toml()?);
    } else if show {
        print!("{}", config.to_toml()?);
    } else {
        return Err(CliError::validation("config needs --example or --show").into());
    }
    Ok(())
}
