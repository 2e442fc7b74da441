//! Genre taxonomy: an immutable forest of genre nodes.
//!
//! Nodes live in a flat arena and point at their parent by [`GenreId`], so
//! the structure never holds owning cycles. Names and aliases are indexed by
//! [`genre_key`] for O(1) case- and punctuation-insensitive lookup.
//!
//! Two source formats are accepted:
//!
//! - flat records (`TaxonomySource`), the native format:
//!   `{"genres": [{"name": "Hardcore", "parent": "Electronic", "aliases": []}],
//!     "groupings": [{"umbrella": "Dance", "members": ["Happy Hardcore"]}]}`
//! - a nested genre tree plus an alias map (`TaxonomySource::from_tree`),
//!   the layout used by beets' lastgenre plugin.

use std::path::Path;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::TaxonomyLoadError;
use crate::grouping::{GroupingOverride, GroupingRecord};
use crate::models::GenreChain;
use crate::normalize::genre_key;

/// Genre data compiled into the crate
const BUILTIN_JSON: &str = include_str!("../data/genres.json");

static BUILTIN: Lazy<Result<GenreTaxonomy, TaxonomyLoadError>> =
    Lazy::new(|| GenreTaxonomy::from_json_str(BUILTIN_JSON));

// ============================================================================
// Source Data
// ============================================================================

/// One genre as described by the source data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRecord {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl GenreRecord {
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            aliases: Vec::new(),
        }
    }
}

/// Structured taxonomy data, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomySource {
    #[serde(default)]
    pub genres: Vec<GenreRecord>,
    #[serde(default)]
    pub groupings: Vec<GroupingRecord>,
}

impl TaxonomySource {
    /// Convert a nested genre tree into flat records.
    ///
    /// Objects map a genre to its children, arrays list siblings, strings are
    /// leaves and `null` is an empty child list. All-lowercase names are
    /// title-cased for display ("c-pop" → "C-Pop"). `aliases`, when given,
    /// maps a genre name to a list of alternate spellings.
    pub fn from_tree(tree: &Value, aliases: Option<&Value>) -> Result<Self, TaxonomyLoadError> {
        let mut genres = Vec::new();
        collect_tree(tree, None, &mut genres)?;

        if let Some(aliases) = aliases {
            let map = aliases.as_object().ok_or_else(|| {
                TaxonomyLoadError::Malformed("alias data must be an object".to_string())
            })?;
            for (name, spellings) in map {
                let key = genre_key(name);
                let record = genres
                    .iter_mut()
                    .find(|g| genre_key(&g.name) == key)
                    .ok_or_else(|| {
                        TaxonomyLoadError::Malformed(format!(
                            "aliases given for '{}', which is not in the genre tree",
                            name
                        ))
                    })?;
                let spellings = spellings.as_array().ok_or_else(|| {
                    TaxonomyLoadError::Malformed(format!("aliases of '{}' must be a list", name))
                })?;
                for spelling in spellings {
                    let spelling = spelling.as_str().ok_or_else(|| {
                        TaxonomyLoadError::Malformed(format!(
                            "alias of '{}' is not a string: {}",
                            name, spelling
                        ))
                    })?;
                    record.aliases.push(spelling.to_string());
                }
            }
        }

        Ok(Self {
            genres,
            groupings: Vec::new(),
        })
    }
}

fn collect_tree(
    value: &Value,
    parent: Option<&str>,
    out: &mut Vec<GenreRecord>,
) -> Result<(), TaxonomyLoadError> {
    match value {
        Value::Null => {}
        Value::String(name) => out.push(GenreRecord::new(display_name(name), parent)),
        Value::Array(items) => {
            for item in items {
                collect_tree(item, parent, out)?;
            }
        }
        Value::Object(map) => {
            for (name, children) in map {
                let name = display_name(name);
                out.push(GenreRecord::new(name.clone(), parent));
                collect_tree(children, Some(&name), out)?;
            }
        }
        other => {
            return Err(TaxonomyLoadError::Malformed(format!(
                "unexpected value in genre tree: {}",
                other
            )))
        }
    }
    Ok(())
}

/// Title-case names that carry no capitals of their own.
fn display_name(name: &str) -> String {
    let name = name.trim();
    if name.chars().any(char::is_uppercase) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut after_letter = false;
    for c in name.chars() {
        if c.is_alphabetic() && !after_letter {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        after_letter = c.is_alphabetic();
    }
    out
}

// ============================================================================
// Taxonomy
// ============================================================================

/// Index of a node inside its [`GenreTaxonomy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenreId(u32);

impl GenreId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A genre in the taxonomy. The taxonomy owns every node; `parent` is only an index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenreNode {
    id: GenreId,
    name: String,
    key: String,
    parent: Option<GenreId>,
    aliases: Vec<String>,
}

impl GenreNode {
    pub fn id(&self) -> GenreId {
        self.id
    }

    /// Display form, as written in the source data
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lookup key of the canonical name
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn parent(&self) -> Option<GenreId> {
        self.parent
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Immutable genre forest with alias lookup and an umbrella grouping table.
///
/// Built once and only read afterwards, so a shared reference can be used
/// from any number of threads.
#[derive(Clone, Debug)]
pub struct GenreTaxonomy {
    nodes: Vec<GenreNode>,
    /// genre_key(name or alias) → node
    index: FxHashMap<String, GenreId>,
    grouping: GroupingOverride,
}

impl GenreTaxonomy {
    /// Validate `source` and build the taxonomy.
    ///
    /// Fails on duplicate genres, parents that are not defined, parent cycles,
    /// aliases that collide across genres, names that normalize to nothing,
    /// and groupings that reference unknown genres.
    pub fn load(source: &TaxonomySource) -> Result<Self, TaxonomyLoadError> {
        let mut taxonomy = Self::build_nodes(&source.genres)?;
        taxonomy.grouping = GroupingOverride::build(&taxonomy, &source.groupings)?;

        info!(
            genres = taxonomy.nodes.len(),
            keys = taxonomy.index.len(),
            grouped = taxonomy.grouping.len(),
            "loaded genre taxonomy"
        );
        Ok(taxonomy)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TaxonomyLoadError> {
        let source: TaxonomySource = serde_json::from_str(json)?;
        Self::load(&source)
    }

    pub fn from_path(path: &Path) -> Result<Self, TaxonomyLoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The taxonomy compiled into the crate, built on first use.
    pub fn builtin() -> Result<&'static GenreTaxonomy, &'static TaxonomyLoadError> {
        Lazy::force(&BUILTIN).as_ref()
    }

    /// Replace the grouping table, keeping the genre forest.
    pub fn with_grouping(mut self, records: &[GroupingRecord]) -> Result<Self, TaxonomyLoadError> {
        self.grouping = GroupingOverride::build(&self, records)?;
        Ok(self)
    }

    fn build_nodes(records: &[GenreRecord]) -> Result<Self, TaxonomyLoadError> {
        let mut nodes: Vec<GenreNode> = Vec::with_capacity(records.len());
        let mut index: FxHashMap<String, GenreId> = FxHashMap::default();

        // Pass 1: canonical names
        for (i, record) in records.iter().enumerate() {
            let key = genre_key(&record.name);
            if key.is_empty() {
                return Err(TaxonomyLoadError::EmptyName(record.name.clone()));
            }
            if index.contains_key(&key) {
                return Err(TaxonomyLoadError::DuplicateGenre(record.name.clone()));
            }
            let id = GenreId(i as u32);
            index.insert(key.clone(), id);
            nodes.push(GenreNode {
                id,
                name: record.name.trim().to_string(),
                key,
                parent: None,
                aliases: Vec::new(),
            });
        }

        // Pass 2: parents, by canonical name only
        for (node, record) in nodes.iter_mut().zip(records) {
            if let Some(parent) = &record.parent {
                let parent_id = index.get(&genre_key(parent)).copied().ok_or_else(|| {
                    TaxonomyLoadError::UnknownParent {
                        genre: record.name.clone(),
                        parent: parent.clone(),
                    }
                })?;
                node.parent = Some(parent_id);
            }
        }

        // Pass 3: aliases; a key may only ever point at one node
        for (i, record) in records.iter().enumerate() {
            for alias in &record.aliases {
                let key = genre_key(alias);
                if key.is_empty() {
                    return Err(TaxonomyLoadError::EmptyName(alias.clone()));
                }
                match index.get(&key) {
                    Some(existing) if existing.index() == i => continue,
                    Some(existing) => {
                        return Err(TaxonomyLoadError::AmbiguousAlias {
                            alias: alias.clone(),
                            first: nodes[existing.index()].name.clone(),
                            second: record.name.clone(),
                        })
                    }
                    None => {
                        index.insert(key, GenreId(i as u32));
                        nodes[i].aliases.push(alias.trim().to_string());
                    }
                }
            }
        }

        // Acyclicity: no walk may take more steps than there are nodes
        for node in &nodes {
            let mut current = node.parent;
            let mut steps = 0;
            while let Some(id) = current {
                steps += 1;
                if id == node.id || steps > nodes.len() {
                    return Err(TaxonomyLoadError::Cycle(node.name.clone()));
                }
                current = nodes[id.index()].parent;
            }
        }

        debug!(genres = nodes.len(), "genre forest validated");
        Ok(Self {
            nodes,
            index,
            grouping: GroupingOverride::default(),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: GenreId) -> Option<&GenreNode> {
        self.nodes.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenreNode> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &GenreNode> {
        self.nodes.iter().filter(|n| n.is_root())
    }

    pub fn grouping(&self) -> &GroupingOverride {
        &self.grouping
    }

    /// Find the genre whose canonical name or alias matches `name`,
    /// ignoring case, accents, punctuation and spacing.
    pub fn lookup(&self, name: &str) -> Option<&GenreNode> {
        self.lookup_id(name).and_then(|id| self.get(id))
    }

    pub fn lookup_id(&self, name: &str) -> Option<GenreId> {
        let key = genre_key(name);
        if key.is_empty() {
            return None;
        }
        self.index.get(&key).copied()
    }

    /// Ids from `id` up to its root: `[id, parent, ..., root]`.
    pub fn chain(&self, id: GenreId) -> Vec<GenreId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|n| n.id);
        while let Some(id) = current {
            chain.push(id);
            current = self.nodes[id.index()].parent;
        }
        chain
    }

    /// Display names from `id` up to its root.
    pub fn chain_names(&self, id: GenreId) -> GenreChain {
        self.chain(id)
            .into_iter()
            .map(|id| self.nodes[id.index()].name.clone())
            .collect()
    }

    /// Number of ancestors above `id` (0 for a root).
    pub fn depth(&self, id: GenreId) -> usize {
        self.chain(id).len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;
    use serde_json::json;

    fn record(name: &str, parent: Option<&str>, aliases: &[&str]) -> GenreRecord {
        GenreRecord {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn source(genres: Vec<GenreRecord>) -> TaxonomySource {
        TaxonomySource {
            genres,
            groupings: Vec::new(),
        }
    }

    fn small() -> GenreTaxonomy {
        GenreTaxonomy::load(&source(vec![
            record("Electronic", None, &["electronica"]),
            record("Hardcore", Some("Electronic"), &[]),
            record("Happy Hardcore", Some("Hardcore"), &[]),
            record("Drum And Bass", Some("Electronic"), &["dnb"]),
        ]))
        .unwrap()
    }

    #[test]
    fn test_lookup_ignores_case_and_punctuation() {
        let taxonomy = small();
        let a = taxonomy.lookup("Happy Hardcore").map(|n| n.id());
        let b = taxonomy.lookup("happy-hardcore").map(|n| n.id());
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(taxonomy.lookup("  HAPPY_HARDCORE ").map(|n| n.id()), a);
    }

    #[test]
    fn test_lookup_aliases_and_and_variants() {
        let taxonomy = small();
        assert_eq!(taxonomy.lookup("Electronica").unwrap().name(), "Electronic");
        assert_eq!(taxonomy.lookup("DnB").unwrap().name(), "Drum And Bass");
        assert_eq!(taxonomy.lookup("drum 'n' bass").unwrap().name(), "Drum And Bass");
        assert_eq!(taxonomy.lookup("Drum & Bass").unwrap().name(), "Drum And Bass");
    }

    #[test]
    fn test_lookup_misses() {
        let taxonomy = small();
        assert!(taxonomy.lookup("not-a-real-genre").is_none());
        assert!(taxonomy.lookup("").is_none());
        assert!(taxonomy.lookup(" !! ").is_none());
    }

    #[test]
    fn test_chain_and_depth() {
        let taxonomy = small();
        let id = taxonomy.lookup_id("happy hardcore").unwrap();
        assert_eq!(
            taxonomy.chain_names(id),
            vec!["Happy Hardcore", "Hardcore", "Electronic"]
        );
        assert_eq!(taxonomy.depth(id), 2);

        let root = taxonomy.lookup_id("electronic").unwrap();
        assert_eq!(taxonomy.chain_names(root), vec!["Electronic"]);
        assert_eq!(taxonomy.depth(root), 0);
        assert_eq!(taxonomy.roots().count(), 1);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let err = GenreTaxonomy::load(&source(vec![record("Hardcore", Some("Electronic"), &[])]))
            .unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::UnknownParent { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = GenreTaxonomy::load(&source(vec![
            record("A", Some("C"), &[]),
            record("B", Some("A"), &[]),
            record("C", Some("B"), &[]),
        ]))
        .unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::Cycle(_)));

        let err = GenreTaxonomy::load(&source(vec![record("Self", Some("self"), &[])])).unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::Cycle(_)));
    }

    #[test]
    fn test_duplicate_genre_rejected() {
        let err = GenreTaxonomy::load(&source(vec![
            record("Hip Hop", None, &[]),
            record("hip-hop", None, &[]),
        ]))
        .unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::DuplicateGenre(_)));
    }

    #[test]
    fn test_ambiguous_alias_rejected() {
        let err = GenreTaxonomy::load(&source(vec![
            record("Rock", None, &["guitar music"]),
            record("Indie", None, &["Guitar-Music"]),
        ]))
        .unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::AmbiguousAlias { .. }));

        // An alias colliding with another genre's canonical name
        let err = GenreTaxonomy::load(&source(vec![
            record("Rock", None, &[]),
            record("Metal", None, &["rock"]),
        ]))
        .unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::AmbiguousAlias { .. }));
    }

    #[test]
    fn test_alias_repeating_own_name_is_harmless() {
        let taxonomy =
            GenreTaxonomy::load(&source(vec![record("Hip Hop", None, &["hip-hop", "hiphop"])]))
                .unwrap();
        let node = taxonomy.lookup("hiphop").unwrap();
        assert_eq!(node.aliases(), &["hiphop".to_string()]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = GenreTaxonomy::load(&source(vec![record("???", None, &[])])).unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::EmptyName(_)));
    }

    #[test]
    fn test_from_json_str() {
        let taxonomy = GenreTaxonomy::from_json_str(
            r#"{"genres": [
                {"name": "Electronic"},
                {"name": "Hardcore", "parent": "Electronic"},
                {"name": "Happy Hardcore", "parent": "Hardcore"}
            ],
            "groupings": [{"umbrella": "Dance", "members": ["Happy Hardcore"]}]}"#,
        )
        .unwrap();
        assert_eq!(taxonomy.len(), 3);
        assert_eq!(taxonomy.grouping().umbrella_for("happy hardcore"), Some("Dance"));
    }

    #[test]
    fn test_from_json_str_malformed() {
        let err = GenreTaxonomy::from_json_str(r#"{"genres": [{"parent": "x"}]}"#).unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::Json(_)));
    }

    #[test]
    fn test_from_tree() {
        let tree = json!([
            {"electronic": [
                {"hardcore": ["happy hardcore", "gabber"]},
                "c-pop"
            ]},
            {"rock": null}
        ]);
        let aliases = json!({"gabber": ["gabba"]});
        let source = TaxonomySource::from_tree(&tree, Some(&aliases)).unwrap();
        let taxonomy = GenreTaxonomy::load(&source).unwrap();

        let id = taxonomy.lookup_id("gabba").unwrap();
        assert_eq!(taxonomy.chain_names(id), vec!["Gabber", "Hardcore", "Electronic"]);
        assert_eq!(taxonomy.lookup("cpop"), None);
        assert_eq!(taxonomy.lookup("c pop").unwrap().name(), "C-Pop");
        assert!(taxonomy.lookup("rock").unwrap().is_root());
    }

    #[test]
    fn test_from_tree_rejects_unknown_alias_target() {
        let tree = json!(["rock"]);
        let aliases = json!({"jazz": ["bebop"]});
        let err = TaxonomySource::from_tree(&tree, Some(&aliases)).unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::Malformed(_)));
    }

    #[test]
    fn test_from_tree_rejects_numbers() {
        let err = TaxonomySource::from_tree(&json!([1, 2]), None).unwrap_err();
        assert!(matches!(err, TaxonomyLoadError::Malformed(_)));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("drum and bass"), "Drum And Bass");
        assert_eq!(display_name("c-pop"), "C-Pop");
        assert_eq!(display_name("r&b"), "R&B");
        assert_eq!(display_name("IDM"), "IDM");
    }

    // --- builtin dataset sanity checks ---

    #[test]
    fn test_builtin_loads() {
        let taxonomy = GenreTaxonomy::builtin().unwrap();
        assert!(taxonomy.len() > 50);
        assert!(!taxonomy.grouping().is_empty());
    }

    #[test]
    fn test_builtin_names_unique() {
        let source: TaxonomySource = serde_json::from_str(BUILTIN_JSON).unwrap();
        let mut seen = FxHashSet::default();
        for genre in &source.genres {
            assert!(seen.insert(genre_key(&genre.name)), "duplicate genre {}", genre.name);
        }
    }

    #[test]
    fn test_builtin_aliases_unique_and_not_genres() {
        let source: TaxonomySource = serde_json::from_str(BUILTIN_JSON).unwrap();
        let names: FxHashSet<String> = source.genres.iter().map(|g| genre_key(&g.name)).collect();
        let mut seen = FxHashSet::default();
        for genre in &source.genres {
            for alias in &genre.aliases {
                let key = genre_key(alias);
                assert!(!names.contains(&key), "alias {} shadows a genre", alias);
                assert!(seen.insert(key), "duplicate alias {}", alias);
            }
        }
    }

    #[test]
    fn test_builtin_lookups() {
        let taxonomy = GenreTaxonomy::builtin().unwrap();
        assert_eq!(taxonomy.lookup("dubstep").unwrap().name(), "Dubstep");
        assert_eq!(taxonomy.lookup("c-pop").unwrap().name(), "C-Pop");
        assert_eq!(taxonomy.lookup("drum 'n' bass").unwrap().name(), "Drum And Bass");
        assert_eq!(taxonomy.lookup("R&B").unwrap().name(), "Rhythm And Blues");
    }
}
