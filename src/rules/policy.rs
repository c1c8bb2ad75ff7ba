//! Scoring policy: sub-score caps, partial-credit factors, pass threshold
//! and the letter-grade table.

use serde::{Deserialize, Serialize};

/// Maximum total score.
pub const MAX_SCORE: u32 = 100;

/// Minimum total score for a passing verdict.
pub const PASS_THRESHOLD: u32 = 80;

pub const PATTERN_MAX: f64 = 60.0;
/// Credit for removing every vulnerable idiom without showing a secure one.
pub const PATTERN_NO_EVIDENCE_FACTOR: f64 = 0.7;
pub const PATTERN_PENALTY: f64 = 20.0;

pub const STATIC_ANALYSIS_MAX: f64 = 25.0;
pub const STATIC_ANALYSIS_PENALTY: f64 = 5.0;
pub const STATIC_ANALYSIS_PARTIAL_FACTOR: f64 = 0.5;

pub const DEPENDENCY_MAX: f64 = 15.0;
pub const DEPENDENCY_PENALTY: f64 = 3.0;
pub const DEPENDENCY_PARTIAL_FACTOR: f64 = 0.8;

/// `max - penalty * count`, floored at zero.
pub fn penalized(max: f64, penalty: f64, count: usize) -> f64 {
    (max - penalty * count as f64).max(0.0)
}

/// Sum sub-scores into the integer total (rounded half away from zero).
pub fn total_score(sub_scores: &[f64]) -> u32 {
    let sum: f64 = sub_scores.iter().map(|s| s.max(0.0)).sum();
    (sum.round() as u32).min(MAX_SCORE)
}

pub fn is_passing(score: u32) -> bool {
    score >= PASS_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

const GRADE_TABLE: &[(u32, Grade)] = &[
    (95, Grade::APlus),
    (90, Grade::A),
    (85, Grade::AMinus),
    (80, Grade::BPlus),
    (75, Grade::B),
    (70, Grade::BMinus),
    (65, Grade::CPlus),
    (60, Grade::C),
    (55, Grade::CMinus),
];

impl Grade {
    pub fn for_score(score: u32) -> Self {
        GRADE_TABLE
            .iter()
            .find(|(min, _)| score >= *min)
            .map(|(_, grade)| *grade)
            .unwrap_or(Grade::F)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn grade_boundaries() {
        assert_eq!(Grade::for_score(100), Grade::APlus);
        assert_eq!(Grade::for_score(95), Grade::APlus);
        assert_eq!(Grade::for_score(94), Grade::A);
        assert_eq!(Grade::for_score(80), Grade::BPlus);
        assert_eq!(Grade::for_score(79), Grade::B);
        assert_eq!(Grade::for_score(55), Grade::CMinus);
        assert_eq!(Grade::for_score(54), Grade::F);
        assert_eq!(Grade::for_score(0), Grade::F);
    }

    #[test]
    fn grade_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Grade::BPlus).unwrap(), "\"B+\"");
        assert_eq!(Grade::AMinus.to_string(), "A-");
    }

    #[test]
    fn partial_credit_totals_round() {
        // 60 + 12.5 + 15
        assert_eq!(total_score(&[60.0, 12.5, 15.0]), 88);
        assert_eq!(total_score(&[42.0, 12.5, 12.0]), 67);
        assert_eq!(total_score(&[60.0, 25.0, 15.0]), 100);
    }

    #[test]
    fn penalty_floors_at_zero() {
        assert_eq!(penalized(PATTERN_MAX, PATTERN_PENALTY, 2), 20.0);
        assert_eq!(penalized(PATTERN_MAX, PATTERN_PENALTY, 7), 0.0);
        assert_eq!(penalized(DEPENDENCY_MAX, DEPENDENCY_PENALTY, 5), 0.0);
    }

    proptest! {
        #[test]
        fn passed_iff_at_least_eighty(score in 0u32..=100) {
            prop_assert_eq!(is_passing(score), score >= 80);
        }

        #[test]
        fn grade_is_monotonic(a in 0u32..=100, b in 0u32..=100) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Grade::for_score(lo) <= Grade::for_score(hi));
        }

        #[test]
        fn passing_scores_grade_b_plus_or_better(score in 0u32..=100) {
            prop_assert_eq!(Grade::for_score(score) >= Grade::BPlus, is_passing(score));
        }
    }
}
