//! Pairwise alignment with affine gap penalties.
//!
//! Three score layers per cell (Gotoh): `H` best score of any alignment
//! ending at the cell, `D` alignments ending in a deletion (gap in the sample,
//! reference advances) and `I` alignments ending in an insertion (gap in the
//! reference, sample advances). Scores are kept in rolling rows; the full
//! matrix only stores one traceback byte per cell, which is what bounds the
//! memory footprint at `O(|reference| * |sample|)` bytes. A banded or
//! streaming implementation can be swapped in behind the [`Aligner`] trait.

use crate::error::{EngineError, EngineResult};
use crate::scoring::{AlignmentMode, ScoringScheme, SCORE_FLOOR};
use crate::sequence::Sequence;
use serde::{Deserialize, Serialize};

const NEG_INF: i32 = SCORE_FLOOR;

// Low two bits: where H came from. High bits: whether D / I extended an open gap.
const H_STOP: u8 = 0;
const H_DIAG: u8 = 1;
const H_DEL: u8 = 2;
const H_INS: u8 = 3;
const H_MASK: u8 = 0b11;
const DEL_EXTEND: u8 = 0b0100;
const INS_EXTEND: u8 = 0b1000;

/// Matrices above this many cells are logged as a memory warning.
const LARGE_MATRIX_CELLS: usize = 1 << 30;

/// One vertex of an alignment path: offsets into reference and sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    pub reference: usize,
    pub sample: usize,
}

impl Checkpoint {
    pub fn new(reference: usize, sample: usize) -> Self {
        Self { reference, sample }
    }
}

/// Maximal gap-free run of the alignment, as two equal-length half-open ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedBlock {
    pub ref_start: usize,
    pub ref_end: usize,
    pub query_start: usize,
    pub query_end: usize,
}

impl AlignedBlock {
    pub fn len(&self) -> usize {
        self.ref_end - self.ref_start
    }

    pub fn is_empty(&self) -> bool {
        self.ref_end == self.ref_start
    }
}

/// The stretch between two consecutive checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Both offsets advance by `len`
    Aligned { reference: usize, sample: usize, len: usize },
    /// Only the reference advances: bases missing from the sample
    Deletion { reference: usize, sample: usize, len: usize },
    /// Only the sample advances: bases absent from the reference
    Insertion { reference: usize, sample: usize, len: usize },
}

/// Ordered checkpoints describing one alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentPath {
    checkpoints: Vec<Checkpoint>,
}

impl AlignmentPath {
    /// Build a path from explicit checkpoints, checking that every step is
    /// either a diagonal run or a gap along one axis.
    pub fn from_checkpoints(checkpoints: Vec<Checkpoint>) -> Result<Self, String> {
        if checkpoints.is_empty() {
            return Err("alignment path needs at least one checkpoint".to_string());
        }
        for (index, pair) in checkpoints.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            if b.reference < a.reference || b.sample < a.sample {
                return Err(format!("checkpoint {} moves backwards", index + 1));
            }
            let dr = b.reference - a.reference;
            let dq = b.sample - a.sample;
            let valid = (dr == dq && dr > 0) || (dr == 0 && dq > 0) || (dq == 0 && dr > 0);
            if !valid {
                return Err(format!(
                    "step {} -> {} is neither a diagonal run nor a gap",
                    index,
                    index + 1
                ));
            }
        }
        Ok(Self { checkpoints })
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn start(&self) -> Checkpoint {
        self.checkpoints[0]
    }

    pub fn end(&self) -> Checkpoint {
        self.checkpoints[self.checkpoints.len() - 1]
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.checkpoints.windows(2).map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let dr = b.reference - a.reference;
            let dq = b.sample - a.sample;
            if dq == 0 {
                Segment::Deletion { reference: a.reference, sample: a.sample, len: dr }
            } else if dr == 0 {
                Segment::Insertion { reference: a.reference, sample: a.sample, len: dq }
            } else {
                Segment::Aligned { reference: a.reference, sample: a.sample, len: dr }
            }
        })
    }

    pub fn aligned_blocks(&self) -> Vec<AlignedBlock> {
        self.segments()
            .filter_map(|segment| match segment {
                Segment::Aligned { reference, sample, len } => Some(AlignedBlock {
                    ref_start: reference,
                    ref_end: reference + len,
                    query_start: sample,
                    query_end: sample + len,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Best alignment found for a pair of sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub score: i32,
    pub mode: AlignmentMode,
    pub path: AlignmentPath,
}

impl Alignment {
    /// Percentage of aligned (non-gap) positions carrying identical symbols.
    pub fn identity(&self, reference: &Sequence, query: &Sequence) -> f64 {
        let (ref_bytes, query_bytes) = (reference.as_bytes(), query.as_bytes());
        let mut matches = 0usize;
        let mut aligned = 0usize;

        for block in self.path.aligned_blocks() {
            let ref_run = &ref_bytes
                [block.ref_start.min(ref_bytes.len())..block.ref_end.min(ref_bytes.len())];
            let query_run = &query_bytes
                [block.query_start.min(query_bytes.len())..block.query_end.min(query_bytes.len())];
            for (r, q) in ref_run.iter().zip(query_run) {
                aligned += 1;
                if r == q {
                    matches += 1;
                }
            }
        }

        if aligned == 0 {
            0.0
        } else {
            matches as f64 / aligned as f64 * 100.0
        }
    }

    pub fn summary(&self, reference: &Sequence, query: &Sequence) -> AlignmentSummary {
        let start = self.path.start();
        let end = self.path.end();
        AlignmentSummary {
            score: self.score,
            identity_pct: round2(self.identity(reference, query)),
            reference_start: start.reference,
            reference_end: end.reference,
            sample_start: start.sample,
            sample_end: end.sample,
            reference_len: reference.len(),
            sample_len: query.len(),
        }
    }
}

/// What callers report about an alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSummary {
    pub score: i32,
    pub identity_pct: f64,
    pub reference_start: usize,
    pub reference_end: usize,
    pub sample_start: usize,
    pub sample_end: usize,
    pub reference_len: usize,
    pub sample_len: usize,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pairwise aligner seam.
pub trait Aligner: Send + Sync {
    fn align(&self, reference: &Sequence, query: &Sequence) -> EngineResult<Alignment>;
    fn name(&self) -> &'static str;
}

/// Full-matrix affine-gap dynamic programming aligner.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffineAligner {
    pub scheme: ScoringScheme,
    pub mode: AlignmentMode,
}

impl AffineAligner {
    pub fn new(scheme: ScoringScheme, mode: AlignmentMode) -> Self {
        Self { scheme, mode }
    }
}

impl Aligner for AffineAligner {
    fn align(&self, reference: &Sequence, query: &Sequence) -> EngineResult<Alignment> {
        align(reference, query, &self.scheme, self.mode)
    }

    fn name(&self) -> &'static str {
        match self.mode {
            AlignmentMode::Local => "smith-waterman-gotoh",
            AlignmentMode::Global => "needleman-wunsch-gotoh",
        }
    }
}

/// Align `query` against `reference`.
///
/// Ties are broken deterministically: diagonal over deletion over insertion,
/// opening a gap over extending one, and in local mode the first maximal cell
/// in row-major order ends the alignment.
pub fn align(
    reference: &Sequence,
    query: &Sequence,
    scheme: &ScoringScheme,
    mode: AlignmentMode,
) -> EngineResult<Alignment> {
    if reference.is_empty() {
        return Err(EngineError::empty_input("reference"));
    }
    if query.is_empty() {
        return Err(EngineError::empty_input("sample"));
    }

    let matrix = fill(reference.as_bytes(), query.as_bytes(), scheme, mode);

    if mode == AlignmentMode::Local && matrix.best_score <= 0 {
        return Err(EngineError::NoSignificantAlignment { best_score: matrix.best_score });
    }

    let path = matrix.traceback();
    log::debug!(
        "{} alignment score {} from {:?} to {:?}",
        mode,
        matrix.best_score,
        path.start(),
        path.end()
    );

    Ok(Alignment { score: matrix.best_score, mode, path })
}

struct TracebackMatrix {
    cells: Vec<u8>,
    cols: usize,
    best_score: i32,
    best_cell: (usize, usize),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Layer {
    H,
    D,
    I,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    Diagonal,
    Deletion,
    Insertion,
}

fn fill(
    reference: &[u8],
    query: &[u8],
    scheme: &ScoringScheme,
    mode: AlignmentMode,
) -> TracebackMatrix {
    let m = reference.len();
    let n = query.len();
    let cols = n + 1;
    let cell_count = (m + 1).saturating_mul(cols);
    if cell_count > LARGE_MATRIX_CELLS {
        log::warn!("alignment matrix of {} x {} cells; expect high memory use", m + 1, cols);
    }
    log::debug!("filling {} x {} {} alignment matrix", m + 1, cols, mode);

    let local = mode == AlignmentMode::Local;
    let mut cells = vec![H_STOP; cell_count];

    let mut h_prev = vec![0i32; cols];
    let mut d_prev = vec![NEG_INF; cols];
    let mut h_cur = vec![0i32; cols];
    let mut d_cur = vec![NEG_INF; cols];

    if !local {
        for j in 1..cols {
            h_prev[j] = scheme.gap_score(j);
            cells[j] = H_INS | if j > 1 { INS_EXTEND } else { 0 };
        }
    }

    let mut best_score = if local { 0 } else { NEG_INF };
    let mut best_cell = (0, 0);

    for i in 1..=m {
        let row = i * cols;
        if local {
            h_cur[0] = 0;
            d_cur[0] = NEG_INF;
        } else {
            h_cur[0] = scheme.gap_score(i);
            d_cur[0] = h_cur[0];
            cells[row] = H_DEL | if i > 1 { DEL_EXTEND } else { 0 };
        }

        let ref_base = reference[i - 1];
        let mut ins = NEG_INF;

        for j in 1..cols {
            let open_del = h_prev[j] + scheme.gap_open;
            let extend_del = d_prev[j] + scheme.gap_extend;
            let (del, del_flag) = if extend_del > open_del {
                (extend_del, DEL_EXTEND)
            } else {
                (open_del, 0)
            };

            let open_ins = h_cur[j - 1] + scheme.gap_open;
            let extend_ins = ins + scheme.gap_extend;
            let (new_ins, ins_flag) = if extend_ins > open_ins {
                (extend_ins, INS_EXTEND)
            } else {
                (open_ins, 0)
            };
            ins = new_ins;

            let diag = h_prev[j - 1] + scheme.score(ref_base, query[j - 1]);

            let (mut best, mut source) = (diag, H_DIAG);
            if del > best {
                best = del;
                source = H_DEL;
            }
            if ins > best {
                best = ins;
                source = H_INS;
            }
            if local && best <= 0 {
                best = 0;
                source = H_STOP;
            }

            h_cur[j] = best;
            d_cur[j] = del;
            cells[row + j] = source | del_flag | ins_flag;

            if local && best > best_score {
                best_score = best;
                best_cell = (i, j);
            }
        }

        std::mem::swap(&mut h_prev, &mut h_cur);
        std::mem::swap(&mut d_prev, &mut d_cur);
    }

    if !local {
        // After the final swap the last row lives in h_prev
        best_score = h_prev[n];
        best_cell = (m, n);
    }

    TracebackMatrix { cells, cols, best_score, best_cell }
}

impl TracebackMatrix {
    fn traceback(&self) -> AlignmentPath {
        let (end_i, end_j) = self.best_cell;
        let (mut i, mut j) = (end_i, end_j);
        let mut layer = Layer::H;
        let mut steps = Vec::new();

        loop {
            let cell = self.cells[i * self.cols + j];
            match layer {
                Layer::H => {
                    if i == 0 && j == 0 {
                        break;
                    }
                    match cell & H_MASK {
                        H_DIAG => {
                            steps.push(Step::Diagonal);
                            i -= 1;
                            j -= 1;
                        }
                        H_DEL => layer = Layer::D,
                        H_INS => layer = Layer::I,
                        _ => break,
                    }
                }
                Layer::D => {
                    steps.push(Step::Deletion);
                    if cell & DEL_EXTEND == 0 {
                        layer = Layer::H;
                    }
                    i -= 1;
                }
                Layer::I => {
                    steps.push(Step::Insertion);
                    if cell & INS_EXTEND == 0 {
                        layer = Layer::H;
                    }
                    j -= 1;
                }
            }
        }

        steps.reverse();
        checkpoints_from_steps(Checkpoint::new(i, j), &steps)
    }
}

fn checkpoints_from_steps(start: Checkpoint, steps: &[Step]) -> AlignmentPath {
    let mut checkpoints = vec![start];
    let mut current = start;
    let mut previous: Option<Step> = None;

    for &step in steps {
        if previous.is_some_and(|p| p != step) {
            checkpoints.push(current);
        }
        match step {
            Step::Diagonal => {
                current.reference += 1;
                current.sample += 1;
            }
            Step::Deletion => current.reference += 1,
            Step::Insertion => current.sample += 1,
        }
        previous = Some(step);
    }
    if previous.is_some() {
        checkpoints.push(current);
    }

    AlignmentPath { checkpoints }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> Sequence {
        Sequence::new(s).unwrap()
    }

    fn cp(reference: usize, sample: usize) -> Checkpoint {
        Checkpoint::new(reference, sample)
    }

    #[test]
    fn test_global_identical() {
        let s = seq("ACGTACGTAC");
        let aln = align(&s, &s, &ScoringScheme::default(), AlignmentMode::Global).unwrap();
        assert_eq!(aln.score, 50);
        assert_eq!(aln.path.checkpoints(), &[cp(0, 0), cp(10, 10)]);
        assert_eq!(aln.identity(&s, &s), 100.0);
    }

    #[test]
    fn test_global_single_mismatch() {
        let r = seq("AAAACCCCGGGGTTTT");
        let q = seq("AAAACCTCGGGGTTTT");
        let aln = align(&r, &q, &ScoringScheme::default(), AlignmentMode::Global).unwrap();
        assert_eq!(aln.score, 15 * 5 - 4);
        assert_eq!(aln.path.checkpoints(), &[cp(0, 0), cp(16, 16)]);
        assert!((aln.identity(&r, &q) - 93.75).abs() < 1e-9);
    }

    #[test]
    fn test_global_deletion_block() {
        let r = seq("AAAACCCCGGGG");
        let q = seq("AAAAGGGG");
        let aln = align(&r, &q, &ScoringScheme::default(), AlignmentMode::Global).unwrap();
        // 8 matches, one gap of 4
        assert_eq!(aln.score, 40 - 13);
        assert_eq!(aln.path.checkpoints(), &[cp(0, 0), cp(4, 4), cp(8, 4), cp(12, 8)]);
        let blocks = aln.path.aligned_blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[1],
            AlignedBlock { ref_start: 8, ref_end: 12, query_start: 4, query_end: 8 }
        );
    }

    #[test]
    fn test_global_insertion() {
        let r = seq("AAAAGGGG");
        let q = seq("AAAATTGGGG");
        let aln = align(&r, &q, &ScoringScheme::default(), AlignmentMode::Global).unwrap();
        assert_eq!(aln.path.checkpoints(), &[cp(0, 0), cp(4, 4), cp(4, 6), cp(8, 10)]);
        let segments: Vec<Segment> = aln.path.segments().collect();
        assert_eq!(segments[1], Segment::Insertion { reference: 4, sample: 4, len: 2 });
    }

    #[test]
    fn test_global_leading_gap() {
        let r = seq("TTACGT");
        let q = seq("ACGT");
        let aln = align(&r, &q, &ScoringScheme::default(), AlignmentMode::Global).unwrap();
        assert_eq!(aln.path.start(), cp(0, 0));
        assert_eq!(aln.path.end(), cp(6, 4));
        assert_eq!(aln.score, 20 - 9);
    }

    #[test]
    fn test_local_finds_core() {
        let r = seq("TTTTTACGTACGTTTTTT");
        let q = seq("GGACGTACGGG");
        let aln = align(&r, &q, &ScoringScheme::default(), AlignmentMode::Local).unwrap();
        assert_eq!(aln.score, 35);
        assert_eq!(aln.path.start(), cp(5, 2));
        assert_eq!(aln.path.end(), cp(12, 9));
    }

    #[test]
    fn test_local_tie_takes_first_copy() {
        // Two exact copies of the sample score 40 each
        let r = seq("ACGTTGCAGGGGACGTTGCA");
        let q = seq("ACGTTGCA");
        let aln = align(&r, &q, &ScoringScheme::default(), AlignmentMode::Local).unwrap();
        assert_eq!(aln.score, 40);
        assert_eq!(aln.path.start(), cp(0, 0));
        assert_eq!(aln.path.end(), cp(8, 8));
    }

    #[test]
    fn test_local_no_significant_alignment() {
        let r = seq("AAAA");
        let q = seq("CCCC");
        let err = align(&r, &q, &ScoringScheme::default(), AlignmentMode::Local).unwrap_err();
        assert_eq!(err, EngineError::NoSignificantAlignment { best_score: 0 });
    }

    #[test]
    fn test_empty_inputs() {
        let empty = Sequence::from_aligned(Vec::new());
        let s = seq("ACGT");
        let scheme = ScoringScheme::default();
        assert_eq!(
            align(&empty, &s, &scheme, AlignmentMode::Global).unwrap_err(),
            EngineError::empty_input("reference")
        );
        assert_eq!(
            align(&s, &empty, &scheme, AlignmentMode::Local).unwrap_err(),
            EngineError::empty_input("sample")
        );
    }

    #[test]
    fn test_deterministic() {
        let r = seq("ACGTTGCAACGGTACCATGA");
        let q = seq("ACGTGCAACGTACCTTGA");
        let scheme = ScoringScheme::default();
        let first = align(&r, &q, &scheme, AlignmentMode::Global).unwrap();
        for _ in 0..5 {
            assert_eq!(align(&r, &q, &scheme, AlignmentMode::Global).unwrap(), first);
        }
    }

    #[test]
    fn test_path_validation() {
        assert!(AlignmentPath::from_checkpoints(vec![]).is_err());
        assert!(AlignmentPath::from_checkpoints(vec![cp(0, 0), cp(3, 2)]).is_err());
        assert!(AlignmentPath::from_checkpoints(vec![cp(2, 2), cp(1, 3)]).is_err());
        assert!(AlignmentPath::from_checkpoints(vec![cp(0, 0), cp(0, 0)]).is_err());
        let path = AlignmentPath::from_checkpoints(vec![cp(0, 0), cp(3, 3), cp(5, 3)]).unwrap();
        assert_eq!(path.aligned_blocks().len(), 1);
    }

    #[test]
    fn test_aligner_trait() {
        let aligner = AffineAligner::new(ScoringScheme::default(), AlignmentMode::Global);
        assert_eq!(aligner.name(), "needleman-wunsch-gotoh");
        let s = seq("ACGT");
        let summary = aligner.align(&s, &s).unwrap().summary(&s, &s);
        assert_eq!(summary.identity_pct, 100.0);
        assert_eq!(summary.reference_end, 4);
        assert_eq!(summary.sample_len, 4);
    }
}
