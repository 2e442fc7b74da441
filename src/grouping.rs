//! Umbrella grouping: a data-driven rewrite of resolved genre chains.
//!
//! Some genres read better under a broader umbrella than under their
//! taxonomic root ("Happy Hardcore" under "Dance" rather than "Electronic").
//! A grouping table lists umbrellas and their member genres; when a chain
//! contains a member, the part of the chain above it is replaced by the
//! umbrella.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::TaxonomyLoadError;
use crate::models::GenreChain;
use crate::normalize::genre_key;
use crate::taxonomy::GenreTaxonomy;

/// One umbrella and the genres it collects, as written in source data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingRecord {
    pub umbrella: String,
    pub members: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Umbrella {
    name: String,
    key: String,
}

/// Validated grouping table. Each member genre belongs to at most one umbrella.
#[derive(Clone, Debug, Default)]
pub struct GroupingOverride {
    umbrellas: Vec<Umbrella>,
    /// member genre key → index into `umbrellas`
    members: FxHashMap<String, usize>,
}

impl GroupingOverride {
    /// Validate `records` against `taxonomy`.
    ///
    /// Members must name genres of the taxonomy (aliases are accepted). The
    /// umbrella does not have to be a genre; when it is, the genre's display
    /// name is used.
    pub fn build(
        taxonomy: &GenreTaxonomy,
        records: &[GroupingRecord],
    ) -> Result<Self, TaxonomyLoadError> {
        let mut grouping = Self::default();

        for record in records {
            let key = genre_key(&record.umbrella);
            if key.is_empty() {
                return Err(TaxonomyLoadError::EmptyName(record.umbrella.clone()));
            }
            let name = taxonomy
                .lookup(&record.umbrella)
                .map_or_else(|| record.umbrella.trim().to_string(), |n| n.name().to_string());

            let slot = match grouping.umbrellas.iter().position(|u| u.key == key) {
                Some(slot) => slot,
                None => {
                    grouping.umbrellas.push(Umbrella { name, key });
                    grouping.umbrellas.len() - 1
                }
            };

            for member in &record.members {
                let node = taxonomy.lookup(member).ok_or_else(|| {
                    TaxonomyLoadError::UnknownGroupingMember {
                        umbrella: record.umbrella.clone(),
                        member: member.clone(),
                    }
                })?;
                match grouping.members.get(node.key()) {
                    Some(&existing) if existing != slot => {
                        return Err(TaxonomyLoadError::ConflictingGrouping {
                            member: node.name().to_string(),
                            first: grouping.umbrellas[existing].name.clone(),
                            second: grouping.umbrellas[slot].name.clone(),
                        })
                    }
                    Some(_) => {}
                    None => {
                        grouping.members.insert(node.key().to_string(), slot);
                    }
                }
            }
        }

        Ok(grouping)
    }

    /// Number of grouped genres
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Umbrella display name for a genre name or key, if it is grouped.
    pub fn umbrella_for(&self, genre: &str) -> Option<&str> {
        self.members
            .get(&genre_key(genre))
            .map(|&slot| self.umbrellas[slot].name.as_str())
    }

    /// Rewrite `chain` (`[leaf, ..., root]`) under its umbrella.
    ///
    /// The first grouped genre in the chain decides. Everything from it down
    /// is kept; its taxonomic ancestors are replaced by the umbrella, except
    /// that a chain of two or more keeps at least one genre above the leaf
    /// ("Happy Hardcore, Hardcore, Electronic" → "Happy Hardcore, Hardcore, Dance").
    /// A chain that already contains the umbrella is cut just after it, so
    /// applying the rewrite twice changes nothing.
    pub fn apply(&self, chain: &[String]) -> GenreChain {
        let keys: Vec<String> = chain.iter().map(|g| genre_key(g)).collect();

        let Some((pos, slot)) = keys
            .iter()
            .enumerate()
            .find_map(|(i, k)| self.members.get(k).map(|&slot| (i, slot)))
        else {
            return chain.to_vec();
        };

        let umbrella = &self.umbrellas[slot];
        match keys.iter().position(|k| *k == umbrella.key) {
            Some(at) if at >= pos => chain[..=at].to_vec(),
            // Umbrella sits below the member: nothing sensible to rewrite
            Some(_) => chain.to_vec(),
            None => {
                let keep = (pos + 1).max(chain.len().saturating_sub(1));
                let mut grouped: GenreChain = chain[..keep].to_vec();
                grouped.push(umbrella.name.clone());
                grouped
            }
        }
    }
}
