//! Resolve genre tags against a taxonomy, or validate taxonomy data.
//!
//! Usage:
//!   resolve-genres resolve "happy hardcore" dnb "seen live"
//!   echo "c-pop" | resolve-genres resolve --json
//!   resolve-genres --taxonomy my-genres.json check
//!   resolve-genres --tree genres-tree.json --aliases aliases.json check

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::Value;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use fuzzytrackmatch::config::ResolverConfig;
use fuzzytrackmatch::grouping::GroupingRecord;
use fuzzytrackmatch::progress::{init_tracing, DEFAULT_LOG_FILTER};
use fuzzytrackmatch::resolver::GenreResolver;
use fuzzytrackmatch::taxonomy::{GenreTaxonomy, TaxonomySource};

#[derive(Parser)]
#[command(name = "resolve-genres")]
#[command(about = "Map free-form genre tags onto canonical genre chains")]
struct Args {
    #[command(flatten)]
    source: TaxonomyArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs)]
struct TaxonomyArgs {
    /// Flat JSON taxonomy (defaults to the builtin dataset)
    #[arg(long, global = true, conflicts_with = "tree")]
    taxonomy: Option<PathBuf>,

    /// Nested JSON genre tree
    #[arg(long, global = true)]
    tree: Option<PathBuf>,

    /// JSON object of genre → aliases, used with --tree
    #[arg(long, global = true, requires = "tree")]
    aliases: Option<PathBuf>,

    /// JSON array of {umbrella, members} replacing the grouping table
    #[arg(long, global = true)]
    groupings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve tags (arguments, or one per stdin line) into genre chains
    Resolve {
        tags: Vec<String>,

        /// Drop chains contained in another output chain
        #[arg(long)]
        collapse_subsets: bool,

        /// Print a JSON array instead of "Leaf > Parent > Root" lines
        #[arg(long)]
        json: bool,
    },
    /// Validate taxonomy data and print a summary
    Check,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))
}

fn load_taxonomy(args: &TaxonomyArgs) -> Result<GenreTaxonomy> {
    let taxonomy = match (&args.taxonomy, &args.tree) {
        (Some(path), _) => GenreTaxonomy::from_path(path)
            .with_context(|| format!("Invalid taxonomy {:?}", path))?,
        (None, Some(tree_path)) => {
            let tree: Value = read_json(tree_path)?;
            let aliases: Option<Value> = args.aliases.as_deref().map(read_json::<Value>).transpose()?;
            let source = TaxonomySource::from_tree(&tree, aliases.as_ref())
                .with_context(|| format!("Invalid genre tree {:?}", tree_path))?;
            GenreTaxonomy::load(&source)
                .with_context(|| format!("Invalid genre tree {:?}", tree_path))?
        }
        (None, None) => GenreTaxonomy::builtin()
            .map_err(|e| anyhow!("Builtin taxonomy is invalid: {}", e))?
            .clone(),
    };

    match &args.groupings {
        Some(path) => {
            let records: Vec<GroupingRecord> = read_json(path)?;
            taxonomy
                .with_grouping(&records)
                .with_context(|| format!("Invalid groupings {:?}", path))
        }
        None => Ok(taxonomy),
    }
}

fn read_stdin_tags() -> Result<Vec<String>> {
    let mut tags = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if !line.trim().is_empty() {
            tags.push(line);
        }
    }
    Ok(tags)
}

fn run_resolve(
    taxonomy: &GenreTaxonomy,
    tags: Vec<String>,
    collapse_subsets: bool,
    json: bool,
) -> Result<()> {
    let tags = if tags.is_empty() { read_stdin_tags()? } else { tags };

    let config = ResolverConfig {
        collapse_subsets,
        ..ResolverConfig::default()
    };
    let chains = GenreResolver::with_config(taxonomy, config).resolve(&tags);

    if json {
        println!("{}", serde_json::to_string_pretty(&chains)?);
    } else {
        for chain in &chains {
            println!("{}", chain.join(" > "));
        }
    }
    Ok(())
}

fn run_check(taxonomy: &GenreTaxonomy) {
    let aliases: usize = taxonomy.iter().map(|n| n.aliases().len()).sum();
    let max_depth = taxonomy
        .iter()
        .map(|n| taxonomy.depth(n.id()))
        .max()
        .unwrap_or(0);

    println!("Taxonomy OK");
    println!("  Genres: {}", taxonomy.len());
    println!("  Roots: {}", taxonomy.roots().count());
    println!("  Aliases: {}", aliases);
    println!("  Max depth: {}", max_depth);
    println!("  Grouped genres: {}", taxonomy.grouping().len());
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(DEFAULT_LOG_FILTER);

    let taxonomy = load_taxonomy(&args.source)?;

    match args.command {
        Command::Resolve {
            tags,
            collapse_subsets,
            json,
        } => run_resolve(&taxonomy, tags, collapse_subsets, json)?,
        Command::Check => run_check(&taxonomy),
    }

    Ok(())
}
