//! Free-form tags → canonical genre chains.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::models::{GenreChain, GenreTag, WeightedChain};
use crate::taxonomy::GenreTaxonomy;

/// Maps provider tags onto a [`GenreTaxonomy`].
///
/// Borrowing the taxonomy keeps the resolver cheap to create per worker
/// thread; it holds no state of its own between calls.
#[derive(Clone, Debug)]
pub struct GenreResolver<'a> {
    taxonomy: &'a GenreTaxonomy,
    config: ResolverConfig,
}

impl<'a> GenreResolver<'a> {
    pub fn new(taxonomy: &'a GenreTaxonomy) -> Self {
        Self::with_config(taxonomy, ResolverConfig::default())
    }

    pub fn with_config(taxonomy: &'a GenreTaxonomy, config: ResolverConfig) -> Self {
        Self { taxonomy, config }
    }

    pub fn taxonomy(&self) -> &'a GenreTaxonomy {
        self.taxonomy
    }

    /// Chain for a single tag, with the umbrella grouping applied.
    /// `None` for tags that normalize to nothing or match no genre.
    pub fn resolve_tag(&self, tag: &str) -> Option<GenreChain> {
        let Some(node) = self.taxonomy.lookup(tag) else {
            debug!(tag, "tag matches no genre");
            return None;
        };
        let chain = self.taxonomy.chain_names(node.id());
        Some(self.taxonomy.grouping().apply(&chain))
    }

    /// Resolve every tag, dropping the unknown ones.
    ///
    /// Output follows the order of first appearance; tags that resolve to an
    /// identical chain (aliases, case variants) produce it once.
    pub fn resolve<S: AsRef<str>>(&self, tags: &[S]) -> Vec<GenreChain> {
        let mut seen: FxHashSet<GenreChain> = FxHashSet::default();
        let mut chains = Vec::new();
        for tag in tags {
            if let Some(chain) = self.resolve_tag(tag.as_ref()) {
                if seen.insert(chain.clone()) {
                    chains.push(chain);
                }
            }
        }

        if self.config.collapse_subsets {
            remove_subsets(&mut chains, |c| c);
        }
        chains
    }

    /// Resolve weighted tags. Tags lighter than `min_weight` are ignored and
    /// the weights of tags landing on the same chain are summed.
    pub fn resolve_tags(&self, tags: &[GenreTag]) -> Vec<WeightedChain> {
        let mut slots: FxHashMap<GenreChain, usize> = FxHashMap::default();
        let mut chains: Vec<WeightedChain> = Vec::new();

        for tag in tags.iter().filter(|t| t.weight >= self.config.min_weight) {
            let Some(chain) = self.resolve_tag(&tag.name) else {
                continue;
            };
            match slots.get(&chain) {
                Some(&slot) => chains[slot].weight += tag.weight,
                None => {
                    slots.insert(chain.clone(), chains.len());
                    chains.push(WeightedChain {
                        genres: chain,
                        weight: tag.weight,
                    });
                }
            }
        }

        if self.config.collapse_subsets {
            remove_subsets(&mut chains, |c| &c.genres);
        }
        chains
    }
}

/// Drop every chain whose genres all appear in some other chain
/// ("House, Dance" next to "Deep House, House, Dance").
fn remove_subsets<T>(items: &mut Vec<T>, genres: impl Fn(&T) -> &GenreChain) {
    let sets: Vec<FxHashSet<&str>> = items
        .iter()
        .map(|item| genres(item).iter().map(String::as_str).collect())
        .collect();

    let keep: Vec<bool> = (0..sets.len())
        .map(|i| {
            !(0..sets.len()).any(|j| {
                j != i && sets[i].len() < sets[j].len() && sets[i].is_subset(&sets[j])
            })
        })
        .collect();
    drop(sets);

    let mut flags = keep.into_iter();
    items.retain(|_| flags.next().unwrap_or(true));
}
