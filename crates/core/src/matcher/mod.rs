//! Scoring catalog entries against a local title.
//!
//! The matcher combines title similarity, genre relevance, year alignment and
//! season alignment into one weighted score, classifies it into a
//! [`ConfidenceLevel`] and decides whether the best candidate can be accepted
//! without asking the user.

mod types;

pub use types::*;

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::strategy::text::{
    best_title_similarity, extract_season, extract_year, has_animation_genre,
    strip_year_and_season,
};

/// Matcher weights and thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    pub title_weight: f64,
    pub genre_weight: f64,
    pub year_weight: f64,
    pub season_weight: f64,
    /// Auto mode accepts the best candidate only above this score.
    pub auto_accept_threshold: f64,
    /// Maximum runner-ups attached to an accepted match.
    pub max_alternatives: usize,
    /// Validation floor for the overall score.
    pub min_valid_score: f64,
    /// Validation floor for title similarity.
    pub min_title_similarity: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            title_weight: 0.6,
            genre_weight: 0.2,
            year_weight: 0.1,
            season_weight: 0.1,
            auto_accept_threshold: 0.6,
            max_alternatives: 4,
            min_valid_score: 0.3,
            min_title_similarity: 0.2,
        }
    }
}

/// Scores and classifies catalog entries.
#[derive(Debug, Clone, Default)]
pub struct ResultMatcher {
    config: MatcherConfig,
}

impl ResultMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Overall score of `candidate` for the local title `target`, in [0, 1].
    pub fn compute_score(&self, target: &str, candidate: &CatalogEntry) -> f64 {
        self.score_breakdown(target, candidate).total
    }

    /// Component scores for `candidate`.
    pub fn score_breakdown(&self, target: &str, candidate: &CatalogEntry) -> ScoreBreakdown {
        let title_similarity = title_similarity(target, candidate);
        let genre_relevance = if has_animation_genre(candidate) { 1.0 } else { 0.0 };
        let year_alignment = year_alignment(extract_year(target), candidate.year());
        let season_alignment = season_alignment(extract_season(target), candidate.season_count);

        let weighted = self.config.title_weight * title_similarity
            + self.config.genre_weight * genre_relevance
            + self.config.year_weight * year_alignment
            + self.config.season_weight * season_alignment;

        ScoreBreakdown {
            title_similarity,
            genre_relevance,
            year_alignment,
            season_alignment,
            total: round4(weighted.clamp(0.0, 1.0)),
        }
    }

    /// Pick a match among `candidates`.
    ///
    /// In auto mode the best-scoring candidate is accepted only above the
    /// auto-accept threshold. In manual mode the first candidate is returned
    /// as a suggestion without any gate.
    pub fn match_candidates(
        &self,
        target: &str,
        candidates: &[CatalogEntry],
        auto_match: bool,
    ) -> Option<Match> {
        if candidates.is_empty() {
            return None;
        }

        if !auto_match {
            return Some(self.to_match(target, &candidates[0], Vec::new()));
        }

        let ranked = self.rank(target, candidates);
        let (best, best_score) = ranked.first()?;
        if *best_score <= self.config.auto_accept_threshold {
            debug!(
                target,
                best_score,
                threshold = self.config.auto_accept_threshold,
                "best candidate below auto-accept threshold"
            );
            return None;
        }

        let alternatives = ranked
            .iter()
            .skip(1)
            .take(self.config.max_alternatives)
            .map(|(entry, _)| self.to_match(target, entry, Vec::new()))
            .collect();

        Some(self.to_match(target, best, alternatives))
    }

    /// Top `max_n` candidates with their scores, best first.
    pub fn suggestions(
        &self,
        target: &str,
        candidates: &[CatalogEntry],
        max_n: usize,
    ) -> Vec<(CatalogEntry, f64)> {
        let mut ranked = self.rank(target, candidates);
        ranked.truncate(max_n);
        ranked
    }

    /// Check that a match is good enough to accept.
    pub fn validate(&self, target: &str, candidate: &Match) -> Result<(), MatchRejection> {
        if matches!(
            candidate.confidence,
            ConfidenceLevel::None | ConfidenceLevel::Uncertain
        ) {
            return Err(MatchRejection::LowConfidence {
                confidence: candidate.confidence,
            });
        }

        if candidate.score < self.config.min_valid_score {
            return Err(MatchRejection::LowScore {
                score: candidate.score,
                minimum: self.config.min_valid_score,
            });
        }

        let similarity = title_similarity(target, &candidate.entry);
        if similarity < self.config.min_title_similarity {
            return Err(MatchRejection::TitleMismatch {
                similarity,
                minimum: self.config.min_title_similarity,
            });
        }

        Ok(())
    }

    /// Confidence histogram, score histogram and mean score.
    pub fn statistics(&self, matches: &[Match]) -> MatchStatistics {
        if matches.is_empty() {
            return MatchStatistics::default();
        }

        let mut confidence_distribution = BTreeMap::new();
        let mut score_distribution = ScoreHistogram::default();
        let mut total_score = 0.0;

        for m in matches {
            *confidence_distribution.entry(m.confidence).or_insert(0) += 1;
            score_distribution.record(m.score);
            total_score += m.score;
        }

        MatchStatistics {
            total_matches: matches.len(),
            confidence_distribution,
            score_distribution,
            average_score: total_score / matches.len() as f64,
        }
    }

    /// Adapter from a scored entry to a [`Match`].
    pub fn to_match(&self, target: &str, entry: &CatalogEntry, alternatives: Vec<Match>) -> Match {
        let breakdown = self.score_breakdown(target, entry);
        let mut confidence = score_to_confidence(breakdown.total);
        if confidence == ConfidenceLevel::High && breakdown.title_similarity >= 1.0 {
            confidence = ConfidenceLevel::Exact;
        }

        Match {
            entry: entry.clone(),
            confidence,
            score: breakdown.total,
            criteria: criteria(&breakdown),
            alternatives,
        }
    }

    fn rank(&self, target: &str, candidates: &[CatalogEntry]) -> Vec<(CatalogEntry, f64)> {
        let mut scored: Vec<(CatalogEntry, f64)> = candidates
            .iter()
            .map(|entry| (entry.clone(), self.compute_score(target, entry)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }
}

/// Title similarity of the target with and without its year and season
/// tokens, whichever is higher. Catalog titles may carry those tokens too.
fn title_similarity(target: &str, candidate: &CatalogEntry) -> f64 {
    let full = best_title_similarity(target, candidate);
    let stripped = strip_year_and_season(target);
    if stripped.is_empty() || stripped == target {
        return full;
    }
    full.max(best_title_similarity(&stripped, candidate))
}

fn year_alignment(target: Option<i32>, candidate: Option<i32>) -> f64 {
    match (target, candidate) {
        (Some(t), Some(c)) => match (t - c).abs() {
            0 => 1.0,
            1 => 0.8,
            2..=3 => 0.6,
            4..=5 => 0.4,
            _ => 0.2,
        },
        _ => 0.0,
    }
}

fn season_alignment(target: Option<u32>, season_count: Option<u32>) -> f64 {
    match (target, season_count) {
        (Some(wanted), Some(count)) if wanted <= count => 1.0,
        (Some(_), Some(_)) => 0.5,
        _ => 0.0,
    }
}

fn criteria(breakdown: &ScoreBreakdown) -> Vec<String> {
    [
        ("title_similarity", breakdown.title_similarity),
        ("genre_relevance", breakdown.genre_relevance),
        ("year_alignment", breakdown.year_alignment),
        ("season_alignment", breakdown.season_alignment),
    ]
    .iter()
    .filter(|(_, value)| *value > 0.0)
    .map(|(name, _)| name.to_string())
    .collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{attack_on_titan, movie_entry, tv_entry};

    #[test]
    fn test_scenario_year_in_title() {
        let matcher = ResultMatcher::default();
        let entry = attack_on_titan();

        let breakdown = matcher.score_breakdown("Attack on Titan 2013", &entry);
        assert_eq!(breakdown.title_similarity, 1.0);
        assert_eq!(breakdown.year_alignment, 1.0);
        assert_eq!(breakdown.total, 0.7);

        let m = matcher
            .match_candidates("Attack on Titan 2013", &[entry], true)
            .unwrap();
        assert!(m.confidence >= ConfidenceLevel::Medium);
        assert_eq!(
            m.criteria,
            vec!["title_similarity".to_string(), "year_alignment".to_string()]
        );
    }

    #[test]
    fn test_year_or_season_inside_catalog_title() {
        let matcher = ResultMatcher::default();

        let blade_runner = movie_entry(335984, "Blade Runner 2049", "2017-10-04");
        let breakdown = matcher.score_breakdown("Blade Runner 2049", &blade_runner);
        assert_eq!(breakdown.title_similarity, 1.0);
        assert!(breakdown.total > matcher.config().auto_accept_threshold);
        assert!(matcher
            .match_candidates("Blade Runner 2049", &[blade_runner], true)
            .is_some());

        let odyssey = movie_entry(62, "2001: A Space Odyssey", "1968-04-02");
        let breakdown = matcher.score_breakdown("2001: A Space Odyssey", &odyssey);
        assert_eq!(breakdown.title_similarity, 1.0);

        let season_two = tv_entry(1429, "Attack on Titan Season 2", "", "2017-04-01");
        let breakdown = matcher.score_breakdown("attack on titan season 2", &season_two);
        assert_eq!(breakdown.title_similarity, 1.0);
    }

    #[test]
    fn test_title_equality_gives_full_similarity() {
        let matcher = ResultMatcher::default();
        let entry = attack_on_titan();
        for target in ["attack on titan", "  ATTACK ON   TITAN ", "Shingeki no Kyojin"] {
            assert_eq!(matcher.score_breakdown(target, &entry).title_similarity, 1.0);
        }
    }

    #[test]
    fn test_score_in_range() {
        let matcher = ResultMatcher::default();
        let mut entry = attack_on_titan();
        entry.genre_ids = vec![16, 10759];
        entry.season_count = Some(4);

        for target in [
            "",
            "Attack on Titan Season 2 2013",
            "진격의 거인 3기",
            "completely unrelated words",
            "2013",
        ] {
            let score = matcher.compute_score(target, &entry);
            assert!((0.0..=1.0).contains(&score), "{} out of range", score);
        }
        assert_eq!(matcher.compute_score("Attack on Titan Season 2 2013", &entry), 1.0);
    }

    #[test]
    fn test_exact_upgrade() {
        let matcher = ResultMatcher::default();
        let mut entry = attack_on_titan();
        entry.genre_ids = vec![16];
        entry.season_count = Some(4);

        let m = matcher.to_match("Attack on Titan Season 2 2013", &entry, Vec::new());
        assert_eq!(m.confidence, ConfidenceLevel::Exact);

        let m = matcher.to_match("Titan 2013", &entry, Vec::new());
        assert_eq!(m.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_year_and_season_alignment_ladders() {
        assert_eq!(year_alignment(Some(2013), Some(2013)), 1.0);
        assert_eq!(year_alignment(Some(2013), Some(2012)), 0.8);
        assert_eq!(year_alignment(Some(2013), Some(2016)), 0.6);
        assert_eq!(year_alignment(Some(2013), Some(2018)), 0.4);
        assert_eq!(year_alignment(Some(2013), Some(2000)), 0.2);
        assert_eq!(year_alignment(None, Some(2000)), 0.0);

        assert_eq!(season_alignment(Some(2), Some(4)), 1.0);
        assert_eq!(season_alignment(Some(5), Some(4)), 0.5);
        assert_eq!(season_alignment(Some(5), None), 0.0);
        assert_eq!(season_alignment(None, Some(4)), 0.0);
    }

    #[test]
    fn test_auto_gate_and_manual_mode() {
        let matcher = ResultMatcher::default();
        let weak = tv_entry(9, "Titan Stories", "Titan Stories", "1990-01-01");

        assert!(matcher.match_candidates("Attack on Titan", &[weak.clone()], true).is_none());

        let m = matcher
            .match_candidates("Attack on Titan", &[weak], false)
            .unwrap();
        assert_eq!(m.entry.id, 9);
        assert!(m.alternatives.is_empty());

        assert!(matcher.match_candidates("Attack on Titan", &[], false).is_none());
    }

    #[test]
    fn test_alternatives_ranked_and_capped() {
        let matcher = ResultMatcher::default();
        let mut candidates = vec![attack_on_titan()];
        for id in 10..16 {
            candidates.push(tv_entry(id, "Attack on Titan Side Story", "", "2013-01-01"));
        }
        candidates.reverse();

        // Without the year the best score sits exactly on the threshold
        assert!(matcher.match_candidates("Attack on Titan", &candidates, true).is_none());

        let m = matcher
            .match_candidates("Attack on Titan 2013", &candidates, true)
            .unwrap();
        assert_eq!(m.entry.id, attack_on_titan().id);
        assert_eq!(m.alternatives.len(), 4);
        assert!(m.alternatives.iter().all(|a| a.score <= m.score));
    }

    #[test]
    fn test_suggestions_sorted() {
        let matcher = ResultMatcher::default();
        let candidates = vec![
            tv_entry(1, "Bleach", "BLEACH", "2004-10-05"),
            attack_on_titan(),
            tv_entry(3, "Attack on Titan Junior High", "", "2015-10-04"),
        ];

        let suggestions = matcher.suggestions("Attack on Titan", &candidates, 2);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].0.id, attack_on_titan().id);
        assert!(suggestions[0].1 >= suggestions[1].1);
    }

    #[test]
    fn test_validate() {
        let matcher = ResultMatcher::default();
        let good = matcher.to_match("Attack on Titan 2013", &attack_on_titan(), Vec::new());
        assert!(matcher.validate("Attack on Titan 2013", &good).is_ok());

        let mut uncertain = good.clone();
        uncertain.confidence = ConfidenceLevel::Uncertain;
        assert!(matches!(
            matcher.validate("Attack on Titan 2013", &uncertain),
            Err(MatchRejection::LowConfidence { .. })
        ));

        let mut low_score = good.clone();
        low_score.score = 0.1;
        assert!(matches!(
            matcher.validate("Attack on Titan 2013", &low_score),
            Err(MatchRejection::LowScore { .. })
        ));

        assert!(matches!(
            matcher.validate("Fullmetal Alchemist", &good),
            Err(MatchRejection::TitleMismatch { .. })
        ));
    }

    #[test]
    fn test_statistics() {
        let matcher = ResultMatcher::default();
        assert_eq!(matcher.statistics(&[]).total_matches, 0);

        let a = matcher.to_match("Attack on Titan 2013", &attack_on_titan(), Vec::new());
        let mut b = a.clone();
        b.score = 0.3;
        b.confidence = ConfidenceLevel::None;

        let stats = matcher.statistics(&[a, b]);
        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.confidence_distribution[&ConfidenceLevel::Medium], 1);
        assert_eq!(stats.confidence_distribution[&ConfidenceLevel::None], 1);
        assert_eq!(stats.score_distribution.0, [0, 1, 0, 1, 0]);
        assert!((stats.average_score - 0.5).abs() < 1e-9);
    }
}
