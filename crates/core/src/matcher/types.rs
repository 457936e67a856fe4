//! Types for matching catalog entries to local titles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogEntry;

/// Ordinal confidence classification of a match.
///
/// Ordering follows declaration order: `None < Uncertain < Low < Medium < High < Exact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    None,
    /// No match recorded for a search.
    Uncertain,
    Low,
    Medium,
    High,
    /// Title matched exactly and the score classified as high.
    Exact,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 6] = [
        ConfidenceLevel::None,
        ConfidenceLevel::Uncertain,
        ConfidenceLevel::Low,
        ConfidenceLevel::Medium,
        ConfidenceLevel::High,
        ConfidenceLevel::Exact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::None => "none",
            ConfidenceLevel::Uncertain => "uncertain",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Exact => "exact",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a score: >= 0.9 high, >= 0.7 medium, >= 0.5 low, otherwise none.
pub fn score_to_confidence(score: f64) -> ConfidenceLevel {
    if score >= 0.9 {
        ConfidenceLevel::High
    } else if score >= 0.7 {
        ConfidenceLevel::Medium
    } else if score >= 0.5 {
        ConfidenceLevel::Low
    } else {
        ConfidenceLevel::None
    }
}

/// A catalog entry bound to a confidence level and score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub entry: CatalogEntry,
    pub confidence: ConfidenceLevel,
    /// Overall score in [0, 1].
    pub score: f64,
    /// Names of the scoring components that contributed.
    #[serde(default)]
    pub criteria: Vec<String>,
    /// Runner-up candidates, best first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Match>,
}

/// Per-component scores behind an overall match score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub title_similarity: f64,
    pub genre_relevance: f64,
    pub year_alignment: f64,
    pub season_alignment: f64,
    /// Weighted sum, clamped to [0, 1] and rounded to 4 decimals.
    pub total: f64,
}

/// Why a match was rejected by validation.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MatchRejection {
    #[error("confidence too low: {confidence}")]
    LowConfidence { confidence: ConfidenceLevel },

    #[error("score {score:.4} below minimum {minimum}")]
    LowScore { score: f64, minimum: f64 },

    #[error("title similarity {similarity:.4} below minimum {minimum}")]
    TitleMismatch { similarity: f64, minimum: f64 },
}

/// Five equal-width score buckets over [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistogram(pub [u64; 5]);

impl ScoreHistogram {
    pub const LABELS: [&'static str; 5] = ["0.0-0.2", "0.2-0.4", "0.4-0.6", "0.6-0.8", "0.8-1.0"];

    /// Bucket index for a score. 1.0 falls into the last bucket.
    pub fn bucket(score: f64) -> usize {
        ((score.clamp(0.0, 1.0) * 5.0) as usize).min(4)
    }

    pub fn record(&mut self, score: f64) {
        self.0[Self::bucket(score)] += 1;
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Label → count map for reports.
    pub fn labelled(&self) -> BTreeMap<String, u64> {
        Self::LABELS
            .iter()
            .zip(self.0.iter())
            .map(|(label, count)| (label.to_string(), *count))
            .collect()
    }
}

/// Summary over a set of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStatistics {
    pub total_matches: usize,
    pub confidence_distribution: BTreeMap<ConfidenceLevel, u64>,
    pub score_distribution: ScoreHistogram,
    pub average_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ordering() {
        assert!(ConfidenceLevel::None < ConfidenceLevel::Uncertain);
        assert!(ConfidenceLevel::Uncertain < ConfidenceLevel::Low);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
        assert!(ConfidenceLevel::High < ConfidenceLevel::Exact);
    }

    #[test]
    fn test_score_to_confidence_monotonic() {
        let mut previous = ConfidenceLevel::None;
        for step in 0..=100 {
            let level = score_to_confidence(step as f64 / 100.0);
            assert!(level >= previous, "regressed at {}", step);
            previous = level;
        }
        assert_eq!(score_to_confidence(0.49), ConfidenceLevel::None);
        assert_eq!(score_to_confidence(0.5), ConfidenceLevel::Low);
        assert_eq!(score_to_confidence(0.7), ConfidenceLevel::Medium);
        assert_eq!(score_to_confidence(0.9), ConfidenceLevel::High);
    }

    #[test]
    fn test_histogram_buckets() {
        let mut hist = ScoreHistogram::default();
        for score in [0.0, 0.19, 0.2, 0.55, 0.79, 0.8, 1.0] {
            hist.record(score);
        }
        assert_eq!(hist.0, [2, 1, 1, 1, 2]);
        assert_eq!(hist.total(), 7);
        assert_eq!(hist.labelled()["0.8-1.0"], 2);
    }

    #[test]
    fn test_rejection_serializes_with_reason() {
        let rejection = MatchRejection::LowConfidence {
            confidence: ConfidenceLevel::None,
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["reason"], "low_confidence");
        assert_eq!(json["confidence"], "none");
    }
}
