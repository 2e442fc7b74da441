//! Fuzzy track matching and genre canonicalization - shared modules for all binaries.

pub mod config;
pub mod error;
pub mod grouping;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod provider;
pub mod resolver;
pub mod safety;
pub mod scoring;
pub mod similarity;
pub mod taxonomy;

pub use config::Config;
pub use error::{ProviderError, TaxonomyLoadError};
pub use grouping::GroupingOverride;
pub use models::{GenreChain, GenreTag, MatchResult, NormalizedQuery, SearchCandidate, TrackGenres};
pub use normalize::{normalize, Normalizer};
pub use provider::{MusicProvider, StaticProvider, TrackGenreLookup};
pub use resolver::GenreResolver;
pub use scoring::{best_match, Matcher};
pub use taxonomy::{GenreId, GenreNode, GenreTaxonomy, TaxonomySource};
