//! Candidate scoring and selection.
//!
//! This module contains:
//! - Title and artist similarity between a query and a provider candidate
//! - Best-candidate selection with a minimum score
//! - Artist-only and tracklist-title helpers for providers that need them

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::MatcherConfig;
use crate::models::{MatchResult, NormalizedQuery, ScoreBreakdown, SearchCandidate};
use crate::normalize::{normalize_text, split_artists, Normalizer, COLLABORATION_SEPARATOR};
use crate::similarity::ratio;

// ============================================================================
// Similarity Measures
// ============================================================================

/// Title similarity over the comparison forms of both titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    ratio(&normalize_text(a), &normalize_text(b))
}

/// All credited names, compared without regard to order.
fn credit_string(query: &NormalizedQuery) -> String {
    let mut names: Vec<String> = query
        .all_artists()
        .into_iter()
        .map(normalize_text)
        .collect::<FxHashSet<_>>()
        .into_iter()
        .collect();
    names.sort();
    names.join(", ")
}

/// Every individual name a candidate is credited with, in comparison form.
/// "Lil Jon & Ludacris", "Lil Jon x Ludacris" and "Lil Jon, Ludacris" all
/// yield both names.
fn credited_names(candidate: &NormalizedQuery) -> Vec<String> {
    split_artists(&candidate.artist)
        .iter()
        .flat_map(|name| COLLABORATION_SEPARATOR.split(name))
        .chain(candidate.additional_artists.iter().map(String::as_str))
        .map(normalize_text)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Artist similarity of a normalized candidate against the query.
///
/// Best of three measures:
/// - primary artist against primary artist
/// - every credited name on both sides, order-insensitive
/// - when `candidate_raw` lacks the query's primary artist but names one of
///   its additional artists, the closest single candidate credit against
///   that artist
///
/// The last one keeps a track credited to a featured guest from being
/// penalized, since platforms attribute collaborations inconsistently.
pub fn artist_similarity(
    query: &NormalizedQuery,
    candidate: &NormalizedQuery,
    candidate_raw: &str,
) -> f64 {
    let query_primary = normalize_text(&query.artist);
    let candidate_primary = normalize_text(&candidate.artist);

    let mut best = ratio(&candidate_primary, &query_primary);
    if best < 1.0 {
        best = best.max(ratio(&credit_string(candidate), &credit_string(query)));
    }

    let raw = normalize_text(candidate_raw);
    if best < 1.0 && (query_primary.is_empty() || !raw.contains(&query_primary)) {
        let credits = credited_names(candidate);
        for additional in &query.additional_artists {
            let additional = normalize_text(additional);
            if additional.is_empty() || !raw.contains(&additional) {
                continue;
            }
            best = best.max(ratio(&candidate_primary, &additional));
            for credit in &credits {
                best = best.max(ratio(credit, &additional));
            }
        }
    }

    best
}

// ============================================================================
// Matcher
// ============================================================================

/// Picks the provider candidate that best fits a normalized query.
///
/// Pure and synchronous; safe to share across threads.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    normalizer: Normalizer,
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self::with_normalizer(Normalizer::default(), config)
    }

    /// Use `normalizer` to clean candidate strings before comparing them.
    pub fn with_normalizer(normalizer: Normalizer, config: MatcherConfig) -> Self {
        Self { normalizer, config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Score one candidate. Featuring clauses in the candidate's own artist
    /// and title are stripped first so they cost nothing.
    pub fn score_candidate(
        &self,
        query: &NormalizedQuery,
        candidate: &SearchCandidate,
    ) -> ScoreBreakdown {
        let cleaned = self
            .normalizer
            .normalize(&candidate.artist, &candidate.title, "");

        let title = title_similarity(&cleaned.title, &query.title);
        let artist = artist_similarity(query, &cleaned, &candidate.artist);

        ScoreBreakdown {
            title,
            artist,
            combined: (title + artist) / 2.0,
        }
    }

    /// Highest-scoring candidate, or `None` when the best combined score is
    /// below `min_score` (or there are no candidates).
    ///
    /// Ties keep the earliest candidate. Candidates under a per-field cutoff
    /// are skipped, and only the first `candidate_limit` are looked at.
    pub fn best_match(
        &self,
        query: &NormalizedQuery,
        candidates: &[SearchCandidate],
    ) -> Option<MatchResult> {
        let limit = self.config.candidate_limit.unwrap_or(candidates.len());
        let mut best: Option<MatchResult> = None;

        for (index, candidate) in candidates.iter().enumerate().take(limit) {
            let breakdown = self.score_candidate(query, candidate);
            debug!(
                index,
                artist = %candidate.artist,
                title = %candidate.title,
                title_score = breakdown.title,
                artist_score = breakdown.artist,
                combined = breakdown.combined,
                "scored candidate"
            );

            if breakdown.title < self.config.title_cutoff
                || breakdown.artist < self.config.artist_cutoff
            {
                continue;
            }

            if best.as_ref().map_or(true, |b| breakdown.combined > b.score) {
                best = Some(MatchResult {
                    candidate: candidate.clone(),
                    index,
                    score: breakdown.combined,
                    breakdown,
                });
            }
        }

        best.filter(|m| m.score >= self.config.min_score)
    }
}

/// Select the best candidate with default settings and the given threshold.
pub fn best_match(
    query: &NormalizedQuery,
    candidates: &[SearchCandidate],
    min_score: f64,
) -> Option<MatchResult> {
    let config = MatcherConfig {
        min_score,
        ..MatcherConfig::default()
    };
    Matcher::new(config).best_match(query, candidates)
}

// ============================================================================
// Single-Field Helpers
// ============================================================================

/// Best entry of a release tracklist for `title`, as `(index, score)`.
/// `None` when nothing reaches `cutoff`.
pub fn best_title_match<S: AsRef<str>>(
    title: &str,
    titles: &[S],
    cutoff: f64,
) -> Option<(usize, f64)> {
    best_by_score(titles.iter().map(|t| title_similarity(title, t.as_ref())), cutoff)
}

/// Best artist-search hit for any of `artists`, as `(index, score)`.
/// `None` when nothing reaches `min_score`.
pub fn best_artist_match<A: AsRef<str>, C: AsRef<str>>(
    artists: &[A],
    candidates: &[C],
    min_score: f64,
) -> Option<(usize, f64)> {
    let wanted: Vec<String> = artists.iter().map(|a| normalize_text(a.as_ref())).collect();
    let scores = candidates.iter().map(|c| {
        let c = normalize_text(c.as_ref());
        wanted.iter().map(|a| ratio(&c, a)).fold(0.0, f64::max)
    });
    best_by_score(scores, min_score)
}

/// First-seen maximum, kept only if it reaches `threshold`.
fn best_by_score(scores: impl Iterator<Item = f64>, threshold: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.enumerate() {
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best.filter(|&(_, score)| score >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn usher_yeah() -> NormalizedQuery {
        normalize("Usher feat. Lil Jon & Ludacris", "Yeah!", "")
    }

    #[test]
    fn test_best_match_prefers_exact_title() {
        let candidates = vec![
            SearchCandidate::new("Usher", "Yeah! (feat. Lil Jon & Ludacris)"),
            SearchCandidate::new("Usher", "Burn"),
        ];
        let result = best_match(&usher_yeah(), &candidates, 0.6).unwrap();
        assert_eq!(result.index, 0);
        assert!((result.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_match_below_threshold() {
        let candidates = vec![
            SearchCandidate::new("Metallica", "One"),
            SearchCandidate::new("Slayer", "Angel of Death"),
        ];
        assert!(best_match(&usher_yeah(), &candidates, 0.6).is_none());
    }

    #[test]
    fn test_best_match_empty() {
        assert!(best_match(&usher_yeah(), &[], 0.0).is_none());
    }

    #[test]
    fn test_best_match_threshold_is_inclusive() {
        let candidates = vec![SearchCandidate::new("Usher", "Yeah!")];
        assert!(best_match(&usher_yeah(), &candidates, 1.0).is_some());
    }

    #[test]
    fn test_best_match_tie_keeps_first() {
        let candidates = vec![
            SearchCandidate::new("Usher", "Yeah!").with_url("first"),
            SearchCandidate::new("Usher", "Yeah!").with_url("second"),
        ];
        let result = best_match(&usher_yeah(), &candidates, 0.6).unwrap();
        assert_eq!(result.index, 0);
        assert_eq!(result.candidate.url, "first");
    }

    #[test]
    fn test_best_match_order_invariant() {
        let mut candidates = vec![
            SearchCandidate::new("Usher", "Yeah! (Remix)"),
            SearchCandidate::new("Usher", "Yeah!"),
            SearchCandidate::new("Usher", "Yeh"),
        ];
        let forward = best_match(&usher_yeah(), &candidates, 0.6).unwrap();
        candidates.reverse();
        let backward = best_match(&usher_yeah(), &candidates, 0.6).unwrap();
        assert_eq!(forward.candidate, backward.candidate);
        assert_eq!(forward.candidate.title, "Yeah!");
    }

    #[test]
    fn test_featured_artist_credit_is_not_penalized() {
        let query = usher_yeah();
        let candidate = SearchCandidate::new("Lil Jon", "Yeah!");
        let breakdown = Matcher::default().score_candidate(&query, &candidate);
        assert_eq!(breakdown.artist, 1.0);
        assert_eq!(breakdown.combined, 1.0);
    }

    #[test]
    fn test_featured_credits_without_primary_are_not_penalized() {
        let query = usher_yeah();
        let matcher = Matcher::default();
        for artist in [
            "Lil Jon & Ludacris",
            "Lil Jon x Ludacris",
            "Lil Jon, Ludacris",
            "Ludacris and Lil Jon",
            "Lil Jon feat. Ludacris",
        ] {
            let candidate = SearchCandidate::new(artist, "Yeah!");
            let breakdown = matcher.score_candidate(&query, &candidate);
            assert_eq!(breakdown.artist, 1.0, "artist score for {:?}", artist);
        }
    }

    #[test]
    fn test_credit_order_does_not_matter() {
        let query = normalize("Usher feat. Lil Jon", "Yeah!", "");
        let cleaned = normalize("Lil Jon feat. Usher", "Yeah!", "");
        assert_eq!(artist_similarity(&query, &cleaned, "Lil Jon feat. Usher"), 1.0);
    }

    #[test]
    fn test_case_and_accents_ignored() {
        let query = normalize("Beyoncé", "Halo", "");
        let candidate = SearchCandidate::new("BEYONCE", "halo");
        let breakdown = Matcher::default().score_candidate(&query, &candidate);
        assert_eq!(breakdown.combined, 1.0);
    }

    #[test]
    fn test_cutoffs_skip_candidates() {
        let config = MatcherConfig {
            min_score: 0.0,
            title_cutoff: 0.9,
            ..MatcherConfig::default()
        };
        let matcher = Matcher::new(config);
        let candidates = vec![
            SearchCandidate::new("Usher", "Burn"),
            SearchCandidate::new("Usher", "Yeah!"),
        ];
        let result = matcher.best_match(&usher_yeah(), &candidates).unwrap();
        assert_eq!(result.index, 1);

        let only_bad = vec![SearchCandidate::new("Usher", "Burn")];
        assert!(matcher.best_match(&usher_yeah(), &only_bad).is_none());
    }

    #[test]
    fn test_candidate_limit() {
        let config = MatcherConfig {
            candidate_limit: Some(1),
            ..MatcherConfig::default()
        };
        let candidates = vec![
            SearchCandidate::new("Metallica", "One"),
            SearchCandidate::new("Usher", "Yeah!"),
        ];
        assert!(Matcher::new(config).best_match(&usher_yeah(), &candidates).is_none());
    }

    #[test]
    fn test_best_title_match() {
        let tracklist = ["Intro", "Yeah! (feat. Lil Jon)", "Burn", "Yeah!"];
        assert_eq!(best_title_match("yeah!", &tracklist, 0.5), Some((3, 1.0)));
        assert_eq!(best_title_match("Superstition", &tracklist, 0.8), None);
        let empty: [&str; 0] = [];
        assert_eq!(best_title_match("Yeah!", &empty, 0.0), None);
    }

    #[test]
    fn test_best_artist_match() {
        let hits = ["Ushers", "Usher", "Usher Raymond"];
        let (index, score) = best_artist_match(&["usher"], &hits, 0.8).unwrap();
        assert_eq!(index, 1);
        assert_eq!(score, 1.0);
        assert!(best_artist_match(&["Nirvana"], &hits, 0.8).is_none());
    }
}
