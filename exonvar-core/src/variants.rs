//! Region-restricted variant calling over an alignment path.

use crate::align::{round2, AlignmentPath, Segment};
use crate::error::{EngineError, EngineResult};
use crate::sequence::{Sequence, GAP};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Start of exon 29 of the PKD1 reference, 0-based.
pub const EXON29_START: usize = 9950;
/// End (exclusive) of exon 29 of the PKD1 reference.
pub const EXON29_END: usize = 10150;

/// Half-open window `[start, end)` in reference coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Default for Region {
    fn default() -> Self {
        Self { start: EXON29_START, end: EXON29_END }
    }
}

impl Region {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether `[start, end)` shares at least one position with the region.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.end && self.start < end
    }

    /// Report a region the alignment never reaches.
    ///
    /// The condition is recoverable: variant calling still runs and reports
    /// zero coverage.
    pub fn check_reachable(&self, path: &AlignmentPath, reference_len: usize) -> EngineResult<()> {
        let span_start = path.start().reference;
        let span_end = path.end().reference;
        if self.is_empty() || self.start >= reference_len || !self.overlaps(span_start, span_end) {
            return Err(EngineError::RegionOutOfBounds {
                start: self.start,
                end: self.end,
                reference_len,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Region {
    type Err = String;

    /// Parse `start-end` (0-based, end exclusive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid region '{}': expected START-END", s))?;
        let start: usize = start
            .trim()
            .parse()
            .map_err(|e| format!("invalid region start '{}': {}", start, e))?;
        let end: usize = end
            .trim()
            .parse()
            .map_err(|e| format!("invalid region end '{}': {}", end, e))?;
        if start >= end {
            return Err(format!("invalid region '{}': start must be below end", s));
        }
        Ok(Region { start, end })
    }
}

/// One discordant position inside the region.
///
/// `genomic_pos` is 1-based in reference coordinates. Substitutions and
/// deletions report the reference base they consume. An insertion consumes no
/// reference base: it reports one past the last consumed reference coordinate,
/// i.e. the 1-based position of the reference base that follows it, and is
/// kept when that base's 0-based offset lies inside the region. Every variant
/// therefore reports a position in `[region.start + 1, region.end]`.
///
/// `exon_pos` is `genomic_pos - region.start`, so it lies in `[1, region.len()]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    Substitution {
        genomic_pos: usize,
        exon_pos: usize,
        #[serde(rename = "ref")]
        reference: char,
        alt: char,
    },
    Deletion {
        genomic_pos: usize,
        exon_pos: usize,
        #[serde(rename = "ref")]
        reference: char,
    },
    Insertion {
        genomic_pos: usize,
        exon_pos: usize,
        alt: char,
    },
}

impl Variant {
    pub fn genomic_pos(&self) -> usize {
        match *self {
            Variant::Substitution { genomic_pos, .. }
            | Variant::Deletion { genomic_pos, .. }
            | Variant::Insertion { genomic_pos, .. } => genomic_pos,
        }
    }

    pub fn exon_pos(&self) -> usize {
        match *self {
            Variant::Substitution { exon_pos, .. }
            | Variant::Deletion { exon_pos, .. }
            | Variant::Insertion { exon_pos, .. } => exon_pos,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Substitution { .. } => "substitution",
            Variant::Deletion { .. } => "deletion",
            Variant::Insertion { .. } => "insertion",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Variant::Substitution { exon_pos, reference, alt, .. } => {
                write!(f, "substitution at exon {} ({}>{})", exon_pos, reference, alt)
            }
            Variant::Deletion { exon_pos, reference, .. } => {
                write!(f, "deletion at exon {} ({}>-)", exon_pos, reference)
            }
            Variant::Insertion { exon_pos, alt, .. } => {
                write!(f, "insertion at exon {} (->{})", exon_pos, alt)
            }
        }
    }
}

/// Coverage and composition of the reconstructed region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Non-gap sample bases over region length, in percent
    pub coverage_pct: f64,
    pub total_variants: usize,
    pub inserted_nt: usize,
    pub deleted_nt: usize,
    /// Whether the sample supplied any base for the region
    #[serde(rename = "exon_disponivel")]
    pub region_available: bool,
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self {
            coverage_pct: 0.0,
            total_variants: 0,
            inserted_nt: 0,
            deleted_nt: 0,
            region_available: false,
        }
    }
}

/// Everything the variant caller derives for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCall {
    pub region: Region,
    /// Sample bases covering the region; `-` marks deleted reference bases
    pub subsequence: Option<Sequence>,
    pub variants: Vec<Variant>,
    pub metrics: AnalysisMetrics,
}

impl RegionCall {
    /// Result for a region the alignment never enters.
    pub fn unavailable(region: Region) -> Self {
        Self {
            region,
            subsequence: None,
            variants: Vec::new(),
            metrics: AnalysisMetrics::default(),
        }
    }

    pub fn substitutions(&self) -> impl Iterator<Item = &Variant> {
        self.variants
            .iter()
            .filter(|v| matches!(v, Variant::Substitution { .. }))
    }
}

/// Walk `path` and classify every discordant position inside `region`.
pub fn call_variants(
    path: &AlignmentPath,
    reference: &Sequence,
    query: &Sequence,
    region: Region,
) -> RegionCall {
    let ref_bytes = reference.as_bytes();
    let query_bytes = query.as_bytes();

    let mut subsequence = Vec::with_capacity(region.len());
    let mut variants = Vec::new();
    let mut inserted_nt = 0usize;
    let mut deleted_nt = 0usize;
    let mut entered = false;

    for segment in path.segments() {
        match segment {
            Segment::Aligned { reference: r0, sample: q0, len } => {
                for k in 0..len {
                    let r = r0 + k;
                    if !region.contains(r) {
                        continue;
                    }
                    let (Some(&ref_base), Some(&alt)) = (ref_bytes.get(r), query_bytes.get(q0 + k))
                    else {
                        break;
                    };
                    entered = true;
                    subsequence.push(alt);
                    if ref_base != alt {
                        variants.push(Variant::Substitution {
                            genomic_pos: r + 1,
                            exon_pos: r + 1 - region.start,
                            reference: ref_base as char,
                            alt: alt as char,
                        });
                    }
                }
            }
            Segment::Deletion { reference: r0, len, .. } => {
                for r in r0..r0 + len {
                    if !region.contains(r) {
                        continue;
                    }
                    let Some(&ref_base) = ref_bytes.get(r) else {
                        break;
                    };
                    entered = true;
                    subsequence.push(GAP);
                    deleted_nt += 1;
                    variants.push(Variant::Deletion {
                        genomic_pos: r + 1,
                        exon_pos: r + 1 - region.start,
                        reference: ref_base as char,
                    });
                }
            }
            Segment::Insertion { reference: r, sample: q0, len } => {
                // Insertions consume no reference: membership follows the current offset
                if !region.contains(r) {
                    continue;
                }
                for q in q0..q0 + len {
                    let Some(&alt) = query_bytes.get(q) else {
                        break;
                    };
                    entered = true;
                    subsequence.push(alt);
                    inserted_nt += 1;
                    variants.push(Variant::Insertion {
                        genomic_pos: r + 1,
                        exon_pos: r + 1 - region.start,
                        alt: alt as char,
                    });
                }
            }
        }
    }

    if !entered {
        log::debug!("alignment path never enters region {}", region);
        return RegionCall::unavailable(region);
    }

    let subsequence = Sequence::from_aligned(subsequence);
    let metrics = AnalysisMetrics {
        coverage_pct: coverage_pct(&subsequence, region),
        total_variants: variants.len(),
        inserted_nt,
        deleted_nt,
        region_available: !subsequence.is_all_gaps(),
    };

    RegionCall {
        region,
        subsequence: Some(subsequence),
        variants,
        metrics,
    }
}

fn coverage_pct(subsequence: &Sequence, region: Region) -> f64 {
    if region.is_empty() {
        return 0.0;
    }
    let covered = subsequence.residue_count() as f64 / region.len() as f64 * 100.0;
    round2(covered.clamp(0.0, 100.0))
}
