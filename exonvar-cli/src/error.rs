//! Error handling for exonvar CLI

use exonvar_core::formats::FastaError;
use exonvar_core::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for exonvar CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid sequence: {message}")]
    InvalidSequence { message: String },

    #[error("Alignment error: {message}")]
    Alignment { message: String },

    #[error("Gene not found: {gene}")]
    GeneNotFound { gene: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat { message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Pick the most specific CLI error for a failure bubbled up through `anyhow`.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let err = match err.downcast::<CliError>() {
            Ok(cli_err) => return cli_err,
            Err(err) => err,
        };
        if let Some(engine_err) = err.downcast_ref::<EngineError>() {
            return engine_err.clone().into();
        }
        if let Some(fasta_err) = err.downcast_ref::<FastaError>() {
            return match fasta_err {
                FastaError::Io(io_err) => Self::io(io_err.to_string()),
                FastaError::InvalidSequence(engine_err) => engine_err.clone().into(),
                other => Self::invalid_format(other.to_string()),
            };
        }
        // `{:#}` keeps the context chain on one line
        Self::io(format!("{:#}", err))
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::EmptyInput { .. } | EngineError::InvalidSymbol { .. } => {
                Self::InvalidSequence { message: err.to_string() }
            }
            EngineError::NoSignificantAlignment { .. } => {
                Self::Alignment { message: err.to_string() }
            }
            EngineError::RegionOutOfBounds { .. } => Self::validation(err.to_string()),
            EngineError::NotFound { gene } => Self::GeneNotFound { gene },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::io(format!("JSON serialization error: {}", err))
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file\n\
                 • Compressed FASTA files need a .gz extension",
                path.display()
            ));
        }

        CliError::InvalidFormat { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Inputs must be FASTA or FASTQ records\n\
                 • The reference file must hold exactly one record\n\
                 • Ensure the file is not corrupted or truncated",
            );
        }

        CliError::InvalidSequence { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Sequences may only contain IUPAC nucleotide symbols (ACGTURYSWKMBDHVN)\n\
                 • Gap characters ('-') are not accepted in input sequences",
            );
        }

        CliError::Alignment { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that the sample comes from the same gene as the reference\n\
                 • Try --mode global to force an end-to-end alignment",
            );
        }

        CliError::GeneNotFound { gene } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that a record header mentions {}\n\
                 • Use --gene to search for a different gene name\n\
                 • Use 'exonvar analyze --all' to analyze every record",
                gene
            ));
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your exonvar.toml configuration file\n\
                 • Use 'exonvar config --example' to generate a sample configuration\n\
                 • Gap penalties must be zero or negative",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}
