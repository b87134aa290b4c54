use crate::sequence::is_canonical;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest absolute value accepted for any single score.
pub const MAX_SCORE_MAGNITUDE: i32 = 1_000;

/// Lower bound for gap scores; matches the aligner's unreachable-cell sentinel.
pub(crate) const SCORE_FLOOR: i32 = i32::MIN / 4;

/// Substitution scores and affine gap penalties.
///
/// A gap of length `L` scores `gap_open + (L - 1) * gap_extend`; both
/// penalties are expected to be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringScheme {
    /// Score for two identical canonical bases
    #[serde(default = "default_match_score")]
    pub match_score: i32,
    /// Score for two different canonical bases
    #[serde(default = "default_mismatch_score")]
    pub mismatch_score: i32,
    /// Score for any pair involving an ambiguity symbol
    #[serde(default = "default_ambiguity_score")]
    pub ambiguity_score: i32,
    /// Score of the first residue of a gap
    #[serde(default = "default_gap_open")]
    pub gap_open: i32,
    /// Score of every further residue of a gap
    #[serde(default = "default_gap_extend")]
    pub gap_extend: i32,
}

fn default_match_score() -> i32 { 5 }
fn default_mismatch_score() -> i32 { -4 }
fn default_ambiguity_score() -> i32 { -1 }
fn default_gap_open() -> i32 { -7 }
fn default_gap_extend() -> i32 { -2 }

impl Default for ScoringScheme {
    fn default() -> Self {
        Self {
            match_score: default_match_score(),
            mismatch_score: default_mismatch_score(),
            ambiguity_score: default_ambiguity_score(),
            gap_open: default_gap_open(),
            gap_extend: default_gap_extend(),
        }
    }
}

impl ScoringScheme {
    /// A scheme where every gap residue costs the same.
    pub fn linear(match_score: i32, mismatch_score: i32, gap: i32) -> Self {
        Self {
            match_score,
            mismatch_score,
            ambiguity_score: mismatch_score.min(0),
            gap_open: gap,
            gap_extend: gap,
        }
    }

    /// Cheap scheme used to rank candidate records against a reference.
    pub fn screening() -> Self {
        Self::linear(1, -1, -1)
    }

    pub fn is_linear(&self) -> bool {
        self.gap_open == self.gap_extend
    }

    /// Symmetric substitution score for a pair of normalized symbols.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        if !is_canonical(a) || !is_canonical(b) {
            self.ambiguity_score
        } else if a == b {
            self.match_score
        } else {
            self.mismatch_score
        }
    }

    /// Score of a gap of `length` residues, saturating at the DP floor.
    pub fn gap_score(&self, length: usize) -> i32 {
        if length == 0 {
            return 0;
        }
        let extensions = i64::try_from(length - 1).unwrap_or(i64::MAX);
        let total = extensions
            .saturating_mul(i64::from(self.gap_extend))
            .saturating_add(i64::from(self.gap_open));
        total.clamp(i64::from(SCORE_FLOOR), i64::from(i32::MAX / 4)) as i32
    }

    /// Check the sign conventions and magnitudes the aligner relies on.
    pub fn validate(&self) -> Result<(), String> {
        let scores = [
            ("match_score", self.match_score),
            ("mismatch_score", self.mismatch_score),
            ("ambiguity_score", self.ambiguity_score),
            ("gap_open", self.gap_open),
            ("gap_extend", self.gap_extend),
        ];
        for (name, value) in scores {
            if value.unsigned_abs() > MAX_SCORE_MAGNITUDE.unsigned_abs() {
                return Err(format!(
                    "{} must lie within +/-{}, got {}",
                    name, MAX_SCORE_MAGNITUDE, value
                ));
            }
        }
        if self.gap_open > 0 || self.gap_extend > 0 {
            return Err(format!(
                "gap penalties must not be positive (gap_open={}, gap_extend={})",
                self.gap_open, self.gap_extend
            ));
        }
        if self.match_score <= 0 {
            return Err(format!("match_score must be positive, got {}", self.match_score));
        }
        if self.mismatch_score >= self.match_score {
            return Err(format!(
                "mismatch_score ({}) must be lower than match_score ({})",
                self.mismatch_score, self.match_score
            ));
        }
        Ok(())
    }
}

/// Which DP boundary conditions to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    /// Smith-Waterman: best-scoring subregion of both sequences
    #[default]
    Local,
    /// Needleman-Wunsch: both sequences end to end
    Global,
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentMode::Local => write!(f, "local"),
            AlignmentMode::Global => write!(f, "global"),
        }
    }
}

impl FromStr for AlignmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(AlignmentMode::Local),
            "global" => Ok(AlignmentMode::Global),
            other => Err(format!("unknown alignment mode '{}' (expected local or global)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheme() {
        let scheme = ScoringScheme::default();
        assert_eq!(scheme.score(b'A', b'A'), 5);
        assert_eq!(scheme.score(b'A', b'C'), -4);
        assert_eq!(scheme.score(b'N', b'N'), -1);
        assert_eq!(scheme.score(b'A', b'R'), -1);
        assert!(scheme.validate().is_ok());
        assert!(!scheme.is_linear());
    }

    #[test]
    fn test_score_is_symmetric() {
        let scheme = ScoringScheme::default();
        let symbols = b"ACGTNRY";
        for &a in symbols {
            for &b in symbols {
                assert_eq!(scheme.score(a, b), scheme.score(b, a));
            }
        }
    }

    #[test]
    fn test_gap_score() {
        let scheme = ScoringScheme::default();
        assert_eq!(scheme.gap_score(0), 0);
        assert_eq!(scheme.gap_score(1), -7);
        assert_eq!(scheme.gap_score(4), -13);

        let linear = ScoringScheme::screening();
        assert!(linear.is_linear());
        assert_eq!(linear.gap_score(3), -3);
    }

    #[test]
    fn test_validation_rejects_positive_gaps() {
        let scheme = ScoringScheme { gap_open: 3, ..ScoringScheme::default() };
        assert!(scheme.validate().is_err());
    }

    #[test]
    fn test_gap_score_saturates_for_huge_penalties() {
        let scheme = ScoringScheme { gap_extend: -1_000_000, ..ScoringScheme::default() };
        assert_eq!(scheme.gap_score(3000), SCORE_FLOOR);
        assert_eq!(scheme.gap_score(usize::MAX), SCORE_FLOOR);
        assert_eq!(scheme.gap_score(2), -1_000_007);
    }

    #[test]
    fn test_validation_bounds_magnitudes() {
        let scheme = ScoringScheme { gap_extend: -1_000_000, ..ScoringScheme::default() };
        assert!(scheme.validate().unwrap_err().contains("gap_extend"));

        let scheme = ScoringScheme { match_score: i32::MAX, ..ScoringScheme::default() };
        assert!(scheme.validate().is_err());

        let scheme = ScoringScheme { mismatch_score: i32::MIN, ..ScoringScheme::default() };
        assert!(scheme.validate().is_err());

        let scheme = ScoringScheme::linear(MAX_SCORE_MAGNITUDE, -MAX_SCORE_MAGNITUDE, -1);
        assert!(scheme.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let scheme: ScoringScheme = serde_json::from_str(r#"{"gap_open": -10}"#).unwrap();
        assert_eq!(scheme.gap_open, -10);
        assert_eq!(scheme.gap_extend, -2);
        assert_eq!(scheme.match_score, 5);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("LOCAL".parse::<AlignmentMode>().unwrap(), AlignmentMode::Local);
        assert_eq!("global".parse::<AlignmentMode>().unwrap(), AlignmentMode::Global);
        assert!("semi".parse::<AlignmentMode>().is_err());
        assert_eq!(AlignmentMode::default(), AlignmentMode::Local);
    }
}
