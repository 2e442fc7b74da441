use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

use fuzzytrackmatch::config::Config;
use fuzzytrackmatch::error::ProviderResult;
use fuzzytrackmatch::models::{BatchStats, LookupOutcome, SearchCandidate, TrackGenres};
use fuzzytrackmatch::progress::{
    create_progress_bar, create_spinner, format_duration, init_tracing, log_progress,
    set_log_only, DEFAULT_LOG_FILTER,
};
use fuzzytrackmatch::provider::{StaticProvider, TrackGenreLookup};
use fuzzytrackmatch::safety::validate_output_path;
use fuzzytrackmatch::taxonomy::GenreTaxonomy;

#[derive(Parser)]
#[command(name = "fuzzytrack-match")]
#[command(about = "Match tracks against provider search results and canonicalize their genres")]
struct Args {
    /// JSON array of records: {artist, title, subtitle?, candidates: [...]}
    input: PathBuf,

    /// Where to write the matched tracks (one entry or null per record)
    output: PathBuf,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// JSON config file (normalizer, matcher, resolver sections)
    #[arg(long, env = "FUZZYTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Flat JSON taxonomy to use instead of the builtin one
    #[arg(long, env = "FUZZYTRACK_TAXONOMY")]
    taxonomy: Option<PathBuf>,

    /// Override matcher.min_score
    #[arg(long)]
    min_score: Option<f64>,

    /// Override matcher.candidate_limit
    #[arg(long)]
    candidate_limit: Option<usize>,

    /// Override resolver.min_weight
    #[arg(long)]
    min_weight: Option<u32>,

    /// Drop genre chains contained in another chain of the same track
    #[arg(long)]
    collapse_subsets: bool,

    /// Also split the artist field on "&", "+", ",", "x" and "vs"
    #[arg(long)]
    split_collaborations: bool,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars and print periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

const PROGRESS_INTERVAL: u64 = 1_000;

#[derive(Debug, Deserialize)]
struct BatchRecord {
    artist: String,
    title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    candidates: Vec<SearchCandidate>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    if let Some(min_score) = args.min_score {
        config.matcher.min_score = min_score;
    }
    if let Some(limit) = args.candidate_limit {
        config.matcher.candidate_limit = Some(limit);
    }
    if let Some(min_weight) = args.min_weight {
        config.resolver.min_weight = min_weight;
    }
    if args.collapse_subsets {
        config.resolver.collapse_subsets = true;
    }
    if args.split_collaborations {
        config.normalizer.split_collaborations = true;
    }
    Ok(config)
}

fn read_records(path: &Path) -> Result<Vec<BatchRecord>> {
    let spinner = create_spinner("Phase 1: Reading records");
    let file = File::open(path).with_context(|| format!("Failed to open input {:?}", path))?;
    let records: Vec<BatchRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse records from {:?}", path))?;
    spinner.finish_with_message(format!("Phase 1: Read {} records", records.len()));
    Ok(records)
}

fn process_records(
    records: &[BatchRecord],
    taxonomy: &GenreTaxonomy,
    config: &Config,
) -> Vec<ProviderResult<LookupOutcome>> {
    let total = records.len() as u64;
    let pb = create_progress_bar(total, "Phase 2: Matching");
    let done = AtomicU64::new(0);

    let outcomes: Vec<_> = records
        .par_iter()
        .map(|record| {
            let provider = StaticProvider::new(record.candidates.clone());
            let lookup = TrackGenreLookup::with_config(provider, taxonomy, config);
            let outcome = lookup.lookup_outcome(&record.artist, &record.title, &record.subtitle);

            pb.inc(1);
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            log_progress("match", current, total, PROGRESS_INTERVAL);
            outcome
        })
        .collect();

    pb.finish_with_message(format!("Phase 2: Matched {} records", outcomes.len()));
    outcomes
}

fn write_output(path: &Path, tracks: &[Option<TrackGenres>]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create output {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), tracks)
        .context("Failed to write output JSON")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(DEFAULT_LOG_FILTER);
    set_log_only(args.log_only);

    let mut sources: Vec<&Path> = vec![args.input.as_path()];
    sources.extend(args.config.as_deref());
    sources.extend(args.taxonomy.as_deref());
    validate_output_path(&args.output, &sources)?;

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();
    let config = load_config(&args)?;

    let loaded;
    let taxonomy: &GenreTaxonomy = match &args.taxonomy {
        Some(path) => {
            loaded = GenreTaxonomy::from_path(path)
                .with_context(|| format!("Failed to load taxonomy {:?}", path))?;
            &loaded
        }
        None => GenreTaxonomy::builtin()
            .map_err(|e| anyhow!("Builtin taxonomy is invalid: {}", e))?,
    };
    info!(genres = taxonomy.len(), min_score = config.matcher.min_score, "ready");

    let records = read_records(&args.input)?;
    let outcomes = process_records(&records, taxonomy, &config);

    let mut stats = BatchStats::default();
    let tracks: Vec<Option<TrackGenres>> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(outcome) => {
                stats.record(&outcome);
                outcome.into_match()
            }
            Err(_) => {
                stats.record_error();
                None
            }
        })
        .collect();

    write_output(&args.output, &tracks)?;

    let elapsed = start.elapsed();
    stats.elapsed_seconds = elapsed.as_secs_f64();

    println!("\n{:=<60}", "");
    println!("Matching complete!");
    println!("  Records: {}", stats.total_records);
    println!("  Matched: {} ({:.1}%)", stats.matched, stats.match_rate());
    println!("  No candidates: {}", stats.no_candidates);
    println!("  Below threshold: {}", stats.below_threshold);
    println!("  Provider errors: {}", stats.provider_errors);
    println!("  Matched without genres: {}", stats.matched_without_genres);
    println!("  Genre chains: {}", stats.total_chains);
    println!("  Elapsed: {}", format_duration(elapsed));
    println!("{:=<60}", "");

    if args.log_only {
        stats.log_phase("match");
    }
    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats {:?}", path))?;
    }

    Ok(())
}
