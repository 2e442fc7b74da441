//! Tunables for the normalizer, matcher and resolver.
//!
//! Every section has working defaults; a JSON file only needs the keys it
//! wants to change:
//!
//! ```json
//! { "matcher": { "min_score": 0.7 }, "resolver": { "min_weight": 10 } }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Minimum combined score to accept a match
pub const DEFAULT_MIN_SCORE: f64 = 0.6;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Also split the artist field on "&", "+", ",", "x" and "vs".
    /// Off by default: it breaks names like "Simon & Garfunkel".
    pub split_collaborations: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Best combined score must be at least this
    pub min_score: f64,
    /// Candidates whose title similarity is below this are skipped
    pub title_cutoff: f64,
    /// Candidates whose artist similarity is below this are skipped
    pub artist_cutoff: f64,
    /// Only the first N provider results are considered
    pub candidate_limit: Option<usize>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            title_cutoff: 0.0,
            artist_cutoff: 0.0,
            candidate_limit: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Weighted tags below this weight are dropped (Last.fm uses 10)
    pub min_weight: u32,
    /// Drop chains whose genres are all contained in another output chain
    pub collapse_subsets: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub normalizer: NormalizerConfig,
    pub matcher: MatcherConfig,
    pub resolver: ResolverConfig,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse config")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_json_str(&json)
    }
}
