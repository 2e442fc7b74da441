//! Error types.
//!
//! Only taxonomy construction can fail inside the core. Everything per-request
//! (normalize, match, resolve) degrades to an empty or absent result instead.

use thiserror::Error;

/// Structural problems found while building a [`GenreTaxonomy`](crate::taxonomy::GenreTaxonomy).
#[derive(Error, Debug)]
pub enum TaxonomyLoadError {
    /// Following parent links from this genre leads back to it
    #[error("genre '{0}' is part of a parent cycle")]
    Cycle(String),

    /// A genre names a parent that is not defined
    #[error("genre '{genre}' references undefined parent '{parent}'")]
    UnknownParent { genre: String, parent: String },

    /// Two genre records share a canonical name
    #[error("genre '{0}' is defined more than once")]
    DuplicateGenre(String),

    /// One surface form normalizes to the same key for two different genres
    #[error("alias '{alias}' maps to both '{first}' and '{second}'")]
    AmbiguousAlias {
        alias: String,
        first: String,
        second: String,
    },

    /// A genre name or alias is empty after normalization
    #[error("genre name or alias '{0}' is empty after normalization")]
    EmptyName(String),

    /// A grouping lists a member that is not a genre in the taxonomy
    #[error("grouping '{umbrella}' lists unknown genre '{member}'")]
    UnknownGroupingMember { umbrella: String, member: String },

    /// A genre is listed under two different umbrellas
    #[error("genre '{member}' is grouped under both '{first}' and '{second}'")]
    ConflictingGrouping {
        member: String,
        first: String,
        second: String,
    },

    /// The source data does not have the expected shape
    #[error("malformed taxonomy data: {0}")]
    Malformed(String),

    /// Reading the taxonomy file failed
    #[error("failed to read taxonomy data: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed
    #[error("failed to parse taxonomy data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by an external music-data provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider's search call failed
    #[error("search failed for '{artist} - {title}': {message}")]
    Search {
        artist: String,
        title: String,
        message: String,
    },

    /// The provider's tag call failed
    #[error("tag fetch failed for '{url}': {message}")]
    Tags { url: String, message: String },

    /// A provider payload could not be decoded
    #[error("failed to decode provider response: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else a provider implementation wants to report
    #[error("{0}")]
    Other(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
