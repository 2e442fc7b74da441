//! Core data models for track matching and genre resolution.
//!
//! This module contains the struct definitions and type aliases shared by the
//! normalizer, the candidate matcher, the genre resolver and the pipeline.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// Display names from a matched genre up through its ancestors:
/// `[leaf, ..., root]`, or `[leaf, ..., umbrella]` after grouping.
pub type GenreChain = Vec<String>;

// ============================================================================
// Query Models
// ============================================================================

/// Canonical form of a user-supplied (artist, title, subtitle) triple.
/// Built fresh per search and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    /// Leading name of the artist field
    pub artist: String,
    /// Featured artists in order of first mention across artist/title/subtitle
    pub additional_artists: Vec<String>,
    /// Title with featuring clauses and empty bracket shells removed
    pub title: String,
    /// Subtitle with featuring clauses removed (often empty)
    pub subtitle: String,
}

impl NormalizedQuery {
    /// Primary artist followed by every additional artist.
    pub fn all_artists(&self) -> Vec<&str> {
        std::iter::once(self.artist.as_str())
            .chain(self.additional_artists.iter().map(String::as_str))
            .filter(|a| !a.is_empty())
            .collect()
    }
}

// ============================================================================
// Provider Models
// ============================================================================

/// One track returned by a provider search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Free-form tags shipped with the search hit (Discogs genres/styles); may be empty
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SearchCandidate {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            url: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A free-form genre tag, optionally weighted by the provider (Last.fm counts).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreTag {
    pub name: String,
    #[serde(default = "default_tag_weight")]
    pub weight: u32,
}

fn default_tag_weight() -> u32 {
    1
}

impl GenreTag {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

impl From<&str> for GenreTag {
    fn from(name: &str) -> Self {
        Self::new(name, default_tag_weight())
    }
}

impl From<String> for GenreTag {
    fn from(name: String) -> Self {
        Self::new(name, default_tag_weight())
    }
}

// ============================================================================
// Scoring Models
// ============================================================================

/// How a candidate's combined score was reached (all values in 0.0..=1.0).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub title: f64,
    pub artist: f64,
    /// Arithmetic mean of `title` and `artist`
    pub combined: f64,
}

/// The candidate selected by the matcher.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub candidate: SearchCandidate,
    /// Position of the candidate in the input sequence
    pub index: usize,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// A resolved chain plus the summed weight of the tags that produced its leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeightedChain {
    pub genres: GenreChain,
    pub weight: u32,
}

// ============================================================================
// Output Models
// ============================================================================

/// User-facing result for one looked-up track.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackGenres {
    pub title: String,
    pub artists: Vec<String>,
    pub source_url: String,
    pub score: f64,
    /// Raw provider tags, as fetched
    pub tags: Vec<String>,
    /// Canonical genre chains resolved from `tags`
    pub genres: Vec<GenreChain>,
}

/// Why a lookup produced no track.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupOutcome {
    Matched(TrackGenres),
    /// The provider returned nothing for the query
    NoCandidates,
    /// Candidates were returned but none cleared the threshold
    BelowThreshold { candidate_count: usize },
}

impl LookupOutcome {
    pub fn into_match(self) -> Option<TrackGenres> {
        match self {
            LookupOutcome::Matched(track) => Some(track),
            _ => None,
        }
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Counters for a batch run of the lookup pipeline.
#[derive(Default, Debug, Clone, Serialize)]
pub struct BatchStats {
    pub total_records: usize,
    pub matched: usize,
    pub no_candidates: usize,
    pub below_threshold: usize,
    pub provider_errors: usize,

    // Genre coverage among matched records
    pub matched_without_tags: usize,
    pub matched_without_genres: usize,
    pub total_chains: usize,

    pub elapsed_seconds: f64,
}

impl BatchStats {
    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            100.0 * self.matched as f64 / self.total_records as f64
        }
    }

    /// Count one record's outcome
    pub fn record(&mut self, outcome: &LookupOutcome) {
        self.total_records += 1;
        match outcome {
            LookupOutcome::Matched(track) => {
                self.matched += 1;
                if track.tags.is_empty() {
                    self.matched_without_tags += 1;
                }
                if track.genres.is_empty() {
                    self.matched_without_genres += 1;
                }
                self.total_chains += track.genres.len();
            }
            LookupOutcome::NoCandidates => self.no_candidates += 1,
            LookupOutcome::BelowThreshold { .. } => self.below_threshold += 1,
        }
    }

    /// Count a record whose provider calls failed
    pub fn record_error(&mut self) {
        self.total_records += 1;
        self.provider_errors += 1;
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(tags: &[&str], genres: Vec<GenreChain>) -> LookupOutcome {
        LookupOutcome::Matched(TrackGenres {
            title: "Yeah!".to_string(),
            artists: vec!["Usher".to_string()],
            source_url: String::new(),
            score: 0.9,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            genres,
        })
    }

    #[test]
    fn test_all_artists_skips_empty_primary() {
        let query = NormalizedQuery {
            artist: String::new(),
            additional_artists: vec!["Lil Jon".to_string()],
            title: "Yeah!".to_string(),
            subtitle: String::new(),
        };
        assert_eq!(query.all_artists(), vec!["Lil Jon"]);
    }

    #[test]
    fn test_candidate_deserialize_defaults() {
        let c: SearchCandidate =
            serde_json::from_str(r#"{"artist": "Usher", "title": "Yeah!"}"#).unwrap();
        assert_eq!(c, SearchCandidate::new("Usher", "Yeah!"));
    }

    #[test]
    fn test_genre_tag_default_weight() {
        let t: GenreTag = serde_json::from_str(r#"{"name": "crunk"}"#).unwrap();
        assert_eq!(t.weight, 1);
        assert_eq!(GenreTag::from("crunk"), t);
    }

    #[test]
    fn test_batch_stats_record() {
        let mut stats = BatchStats::default();
        stats.record(&matched(&["hip hop"], vec![vec!["Hip Hop".to_string()]]));
        stats.record(&matched(&[], vec![]));
        stats.record(&LookupOutcome::NoCandidates);
        stats.record(&LookupOutcome::BelowThreshold { candidate_count: 3 });
        stats.record_error();

        assert_eq!(stats.total_records, 5);
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.matched_without_tags, 1);
        assert_eq!(stats.matched_without_genres, 1);
        assert_eq!(stats.total_chains, 1);
        assert_eq!(stats.no_candidates, 1);
        assert_eq!(stats.below_threshold, 1);
        assert_eq!(stats.provider_errors, 1);
        assert!((stats.match_rate() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_rate_empty() {
        assert_eq!(BatchStats::default().match_rate(), 0.0);
    }
}
