//! Normalized nucleotide sequences.
//!
//! Every sequence that enters the engine goes through [`Sequence::labelled`]:
//! whitespace is stripped, symbols are upper-cased and checked against the
//! IUPAC nucleotide alphabet. The gap symbol only appears in subsequences
//! reconstructed by the variant caller.

use crate::error::{EngineError, EngineResult};
use serde::Serialize;
use std::fmt;

/// Placeholder written for reference bases the sample does not cover.
pub const GAP: u8 = b'-';

/// Canonical bases, in the order used by frequency features.
pub const CANONICAL_BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

const IUPAC_NUCLEOTIDES: &[u8] = b"ACGTURYSWKMBDHVN";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Sequence {
    data: Vec<u8>,
}

impl Sequence {
    /// Normalize and validate raw sequence text.
    pub fn new<T: AsRef<[u8]>>(raw: T) -> EngineResult<Self> {
        Self::labelled("input", raw)
    }

    /// Like [`Sequence::new`], naming the sequence in any error it reports.
    pub fn labelled<T: AsRef<[u8]>>(label: &str, raw: T) -> EngineResult<Self> {
        let data: Vec<u8> = raw
            .as_ref()
            .iter()
            .filter(|b| !b.is_ascii_whitespace())
            .map(|b| b.to_ascii_uppercase())
            .collect();

        if data.is_empty() {
            return Err(EngineError::empty_input(label));
        }

        if let Some(position) = data.iter().position(|b| !IUPAC_NUCLEOTIDES.contains(b)) {
            return Err(EngineError::InvalidSymbol {
                which: label.to_string(),
                symbol: data[position] as char,
                position,
            });
        }

        Ok(Self { data })
    }

    /// Wrap bytes produced by the engine itself; may contain [`GAP`].
    pub(crate) fn from_aligned(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of non-gap symbols.
    pub fn residue_count(&self) -> usize {
        self.data.iter().filter(|&&b| b != GAP).count()
    }

    /// Copy of `[start, end)`, clamped to the sequence bounds.
    pub fn slice(&self, start: usize, end: usize) -> Sequence {
        let end = end.min(self.data.len());
        let start = start.min(end);
        Self { data: self.data[start..end].to_vec() }
    }

    pub fn is_all_gaps(&self) -> bool {
        self.data.iter().all(|&b| b == GAP)
    }

    pub fn base_counts(&self) -> BaseCounts {
        let mut counts = BaseCounts::default();
        for &base in &self.data {
            match base {
                b'A' => counts.a += 1,
                b'C' => counts.c += 1,
                b'G' => counts.g += 1,
                b'T' => counts.t += 1,
                GAP => {}
                _ => counts.ambiguous += 1,
            }
        }
        counts
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

impl From<Sequence> for String {
    fn from(sequence: Sequence) -> Self {
        sequence.to_string()
    }
}

/// Symbol tallies over a sequence, gaps excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseCounts {
    pub a: usize,
    pub c: usize,
    pub g: usize,
    pub t: usize,
    pub ambiguous: usize,
}

impl BaseCounts {
    pub fn canonical_total(&self) -> usize {
        self.a + self.c + self.g + self.t
    }

    pub fn count(&self, base: u8) -> usize {
        match base {
            b'A' => self.a,
            b'C' => self.c,
            b'G' => self.g,
            b'T' => self.t,
            _ => 0,
        }
    }
}

pub fn is_canonical(base: u8) -> bool {
    CANONICAL_BASES.contains(&base)
}

pub fn is_purine(base: u8) -> bool {
    matches!(base, b'A' | b'G')
}

pub fn is_pyrimidine(base: u8) -> bool {
    matches!(base, b'C' | b'T')
}

/// A purine<->purine or pyrimidine<->pyrimidine change between two canonical bases.
pub fn is_transition(from: u8, to: u8) -> bool {
    from != to
        && ((is_purine(from) && is_purine(to)) || (is_pyrimidine(from) && is_pyrimidine(to)))
}

/// A purine<->pyrimidine change between two canonical bases.
pub fn is_transversion(from: u8, to: u8) -> bool {
    (is_purine(from) && is_pyrimidine(to)) || (is_pyrimidine(from) && is_purine(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let seq = Sequence::new("acgt\n  nnAC\tgt\r\n").unwrap();
        assert_eq!(seq.to_string(), "ACGTNNACGT");
        assert_eq!(seq.len(), 10);
    }

    #[test]
    fn test_empty_after_normalization() {
        let err = Sequence::labelled("sample", " \n\t ").unwrap_err();
        assert_eq!(err, EngineError::empty_input("sample"));
    }

    #[test]
    fn test_invalid_symbol() {
        let err = Sequence::labelled("reference", "ACGTXACGT").unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidSymbol {
                which: "reference".to_string(),
                symbol: 'X',
                position: 4,
            }
        );
        // The engine's own gap symbol is not accepted as input
        assert!(Sequence::new("AC-GT").is_err());
    }

    #[test]
    fn test_base_counts_skip_gaps_and_ambiguity() {
        let seq = Sequence::from_aligned(b"AAC-GTNR".to_vec());
        let counts = seq.base_counts();
        assert_eq!(counts.a, 2);
        assert_eq!(counts.c, 1);
        assert_eq!(counts.g, 1);
        assert_eq!(counts.t, 1);
        assert_eq!(counts.ambiguous, 2);
        assert_eq!(counts.canonical_total(), 5);
        assert_eq!(seq.residue_count(), 7);
    }

    #[test]
    fn test_slice_is_clamped() {
        let seq = Sequence::new("ACGTACGT").unwrap();
        assert_eq!(seq.slice(2, 5).to_string(), "GTA");
        assert_eq!(seq.slice(6, 20).to_string(), "GT");
        assert!(seq.slice(10, 20).is_empty());
    }

    #[test]
    fn test_transition_classes() {
        assert!(is_transition(b'A', b'G'));
        assert!(is_transition(b'C', b'T'));
        assert!(!is_transition(b'A', b'A'));
        assert!(!is_transition(b'A', b'C'));
        assert!(is_transversion(b'A', b'C'));
        assert!(is_transversion(b'T', b'G'));
        assert!(!is_transversion(b'N', b'A'));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let seq = Sequence::new("ccTc").unwrap();
        assert_eq!(serde_json::to_string(&seq).unwrap(), "\"CCTC\"");
    }
}
