//! Provider seam and the end-to-end lookup pipeline.
//!
//! A provider is anything that can search for tracks and fetch their tags
//! (Discogs, Last.fm, a fixture file). The pipeline runs:
//! normalize → search → best match → fetch tags → resolve genres.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ProviderResult;
use crate::models::{LookupOutcome, SearchCandidate, TrackGenres};
use crate::normalize::Normalizer;
use crate::resolver::GenreResolver;
use crate::scoring::Matcher;
use crate::taxonomy::GenreTaxonomy;

/// External source of search results and genre tags.
pub trait MusicProvider {
    /// Tracks matching an artist and title. An empty result is not an error.
    fn search(&self, artist: &str, title: &str) -> ProviderResult<Vec<SearchCandidate>>;

    /// Raw tags for a selected candidate. Defaults to the tags the search
    /// hit already carries.
    fn fetch_tags(&self, candidate: &SearchCandidate) -> ProviderResult<Vec<String>> {
        Ok(candidate.tags.clone())
    }
}

impl<P: MusicProvider + ?Sized> MusicProvider for &P {
    fn search(&self, artist: &str, title: &str) -> ProviderResult<Vec<SearchCandidate>> {
        (**self).search(artist, title)
    }

    fn fetch_tags(&self, candidate: &SearchCandidate) -> ProviderResult<Vec<String>> {
        (**self).fetch_tags(candidate)
    }
}

/// In-memory provider: every search returns the same fixed candidates.
#[derive(Clone, Debug, Default)]
pub struct StaticProvider {
    candidates: Vec<SearchCandidate>,
    /// url → tags, overriding a candidate's own tag list
    tags: FxHashMap<String, Vec<String>>,
}

impl StaticProvider {
    pub fn new(candidates: Vec<SearchCandidate>) -> Self {
        Self {
            candidates,
            tags: FxHashMap::default(),
        }
    }

    pub fn with_tags<I, S>(mut self, url: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(url.into(), tags.into_iter().map(Into::into).collect());
        self
    }
}

impl MusicProvider for StaticProvider {
    fn search(&self, _artist: &str, _title: &str) -> ProviderResult<Vec<SearchCandidate>> {
        Ok(self.candidates.clone())
    }

    fn fetch_tags(&self, candidate: &SearchCandidate) -> ProviderResult<Vec<String>> {
        Ok(self
            .tags
            .get(&candidate.url)
            .cloned()
            .unwrap_or_else(|| candidate.tags.clone()))
    }
}

/// Composes normalizer, provider, matcher and resolver for one track at a time.
pub struct TrackGenreLookup<'a, P> {
    provider: P,
    normalizer: Normalizer,
    matcher: Matcher,
    resolver: GenreResolver<'a>,
}

impl<'a, P: MusicProvider> TrackGenreLookup<'a, P> {
    pub fn new(provider: P, taxonomy: &'a GenreTaxonomy) -> Self {
        Self::with_config(provider, taxonomy, &Config::default())
    }

    pub fn with_config(provider: P, taxonomy: &'a GenreTaxonomy, config: &Config) -> Self {
        let normalizer = Normalizer::new(config.normalizer.clone());
        Self {
            provider,
            matcher: Matcher::with_normalizer(normalizer.clone(), config.matcher.clone()),
            normalizer,
            resolver: GenreResolver::with_config(taxonomy, config.resolver.clone()),
        }
    }

    /// Look up a track and its canonical genres.
    /// `Ok(None)` means no candidate was good enough; `Err` means the provider failed.
    pub fn lookup(
        &self,
        artist: &str,
        title: &str,
        subtitle: &str,
    ) -> ProviderResult<Option<TrackGenres>> {
        self.lookup_outcome(artist, title, subtitle)
            .map(LookupOutcome::into_match)
    }

    /// Same as [`lookup`](Self::lookup), but says why nothing matched.
    pub fn lookup_outcome(
        &self,
        artist: &str,
        title: &str,
        subtitle: &str,
    ) -> ProviderResult<LookupOutcome> {
        let query = self.normalizer.normalize(artist, title, subtitle);

        let candidates = match self.provider.search(&query.artist, &query.title) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(artist = %query.artist, title = %query.title, error = %e, "provider search failed");
                return Err(e);
            }
        };
        if candidates.is_empty() {
            debug!(artist = %query.artist, title = %query.title, "no candidates");
            return Ok(LookupOutcome::NoCandidates);
        }

        let Some(best) = self.matcher.best_match(&query, &candidates) else {
            debug!(
                artist = %query.artist,
                title = %query.title,
                candidates = candidates.len(),
                "no candidate above threshold"
            );
            return Ok(LookupOutcome::BelowThreshold {
                candidate_count: candidates.len(),
            });
        };

        let tags = match self.provider.fetch_tags(&best.candidate) {
            Ok(tags) => tags,
            Err(e) => {
                warn!(url = %best.candidate.url, error = %e, "provider tag fetch failed");
                return Err(e);
            }
        };
        let genres = self.resolver.resolve(&tags);

        let credited = self
            .normalizer
            .normalize(&best.candidate.artist, &best.candidate.title, "");
        let artists = credited
            .all_artists()
            .into_iter()
            .map(str::to_string)
            .collect();

        Ok(LookupOutcome::Matched(TrackGenres {
            title: credited.title,
            artists,
            source_url: best.candidate.url,
            score: best.score,
            tags,
            genres,
        }))
    }
}
