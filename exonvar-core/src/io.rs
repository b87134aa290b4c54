//! FASTA input for the engine
//!
//! Reads multi-record sample files and single-record reference files,
//! plain or gzip-compressed, using the needletail parser.

use crate::error::EngineError;
use crate::locate::RawRecord;
use crate::sequence::Sequence;
use anyhow::Result;
use flate2::read::GzDecoder;
use needletail::parse_fastx_reader;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty file or no sequences found")]
    EmptyFile,
    #[error("Expected a single reference record, found {0}")]
    MultipleRecords(usize),
    #[error("Invalid sequence: {0}")]
    InvalidSequence(#[from] EngineError),
}

/// Read every record of a FASTA/FASTQ file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    log::debug!("reading records from {}", path.display());

    if path.to_string_lossy().ends_with(".gz") {
        parse_reader(BufReader::new(GzDecoder::new(file)))
    } else {
        parse_reader(BufReader::new(file))
    }
}

/// Parse records from in-memory FASTA text, e.g. an uploaded file.
pub fn records_from_str(text: &str) -> Result<Vec<RawRecord>> {
    parse_reader(Cursor::new(text.as_bytes()))
}

/// Parse FASTA/FASTQ data from any readable source.
pub fn parse_reader<R: Read + Send>(reader: R) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    let mut fastx_reader =
        parse_fastx_reader(reader).map_err(|e| FastaError::Parse(e.to_string()))?;

    while let Some(record) = fastx_reader.next() {
        let record = record.map_err(|e| FastaError::Parse(e.to_string()))?;
        let header = String::from_utf8_lossy(record.id()).trim().to_string();
        let sequence = String::from_utf8_lossy(&record.seq()).to_string();
        records.push(RawRecord { header, sequence });
    }

    if records.is_empty() {
        Err(FastaError::EmptyFile.into())
    } else {
        Ok(records)
    }
}

/// Read a reference file holding exactly one record into a normalized sequence.
pub fn read_reference<P: AsRef<Path>>(path: P) -> Result<Sequence> {
    let records = read_records(&path)?;
    if records.len() != 1 {
        return Err(FastaError::MultipleRecords(records.len()).into());
    }
    let sequence = Sequence::labelled("reference", &records[0].sequence).map_err(FastaError::from)?;
    log::info!(
        "loaded reference '{}' ({} bp) from {}",
        records[0].header,
        sequence.len(),
        path.as_ref().display()
    );
    Ok(sequence)
}

/// Read the first record of a sample file into a normalized sequence.
pub fn read_first_sequence<P: AsRef<Path>>(path: P) -> Result<(String, Sequence)> {
    let mut records = read_records(path)?;
    let record = records.swap_remove(0);
    let sequence = Sequence::labelled(&record.header, &record.sequence).map_err(FastaError::from)?;
    Ok((record.header, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_records_from_str() {
        let text = ">cat PKD1 exon29\nACGT\nacgt\n>other\nTTTT\n";
        let records = records_from_str(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].header, "cat PKD1 exon29");
        assert_eq!(records[0].sequence, "ACGTacgt");
        assert_eq!(records[1].header, "other");
    }

    #[test]
    fn test_read_reference_single_record() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">ref").unwrap();
        writeln!(file, "acgtac").unwrap();
        writeln!(file, "GTAC").unwrap();

        let reference = read_reference(file.path()).unwrap();
        assert_eq!(reference.to_string(), "ACGTACGTAC");
    }

    #[test]
    fn test_read_reference_rejects_multiple_records() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">a\nACGT\n>b\nACGT").unwrap();

        let err = read_reference(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FastaError>(),
            Some(FastaError::MultipleRecords(2))
        ));
    }

    #[test]
    fn test_gzipped_records() {
        let file = tempfile::Builder::new().suffix(".fa.gz").tempfile().unwrap();
        {
            let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
            encoder.write_all(b">sample\nACGTNN\n").unwrap();
            encoder.finish().unwrap();
        }

        let (header, sequence) = read_first_sequence(file.path()).unwrap();
        assert_eq!(header, "sample");
        assert_eq!(sequence.to_string(), "ACGTNN");
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(records_from_str("").is_err());
    }
}
