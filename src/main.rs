//! CLI entrypoint for `leakmatch`.
//!
//! Indexes every JSON source in the data directory, looks up the requested
//! identities, optionally recovers hashed passwords from the wordlist
//! directory, prints a terminal summary (or JSON), and optionally writes
//! JSON/CSV exports when an output directory is provided.
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{LevelFilter, error, warn};
use leakmatch::{
    config::FinderConfig,
    export::{save_cracked_csv, save_results_json},
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    report::{render_index_summary, render_search_results},
    search::{Finder, SearchResult},
    targets::parse_identities,
};

#[derive(Parser, Debug)]
#[command(
    name = "leakmatch-rs",
    version,
    about = "Identity correlation and wordlist hash recovery (Rust)"
)]
struct Args {
    /// Directory of JSON data sources
    #[arg(short = 'D', long = "data-dir", default_value = "data")]
    data_dir: PathBuf,

    /// Directory of wordlists
    #[arg(short = 'W', long = "wordlists-dir", default_value = "wordlists")]
    wordlists_dir: PathBuf,

    /// Identity to look up (repeatable)
    #[arg(short = 'u', long = "identity")]
    identities: Vec<String>,

    /// File with one identity per line
    #[arg(short = 'i', long = "identities-file")]
    identities_files: Vec<PathBuf>,

    /// Skip password recovery
    #[arg(long = "no-crack")]
    no_crack: bool,

    /// Query the premium-status collaborator
    #[arg(long = "check-premium")]
    check_premium: bool,

    /// Path to the output directory
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Load sources and scan wordlists in parallel
    #[arg(long = "parallel")]
    parallel: bool,

    /// Log counts of parsed/recovered/skipped entries encountered during ingestion
    #[arg(long = "log-parse-stats")]
    log_parse_stats: bool,

    /// Limit number of entries in "Records per Source"
    #[arg(long = "top", default_value_t = 10)]
    top_limit: usize,

    /// Print results as JSON instead of the terminal summary
    #[arg(long = "json")]
    json: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress summary output (still writes exports if -o is provided)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

const ASCII_TITLE: &str = r#"
 _                _    __  __       _       _
| |    ___  __ _| | _|  \/  | __ _| |_ ___| |__
| |   / _ \/ _` | |/ / |\/| |/ _` | __/ __| '_ \
| |__|  __/ (_| |   <| |  | | (_| | || (__| | | |
|_____\___|\__,_|_|\_\_|  |_|\__,_|\__\___|_| |_|
"#;

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

/// Gather identities from flags and files. Missing identity files are
/// warned about; an empty final list is an invocation error.
fn collect_identities(args: &Args) -> Result<Vec<String>> {
    let mut out: Vec<String> = args
        .identities
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    for p in &args.identities_files {
        match fs::read_to_string(p) {
            Ok(contents) => out.extend(parse_identities(&contents)),
            Err(e) => warn!("identities file {}: {} (continuing)", p.display(), e),
        }
    }
    if out.is_empty() {
        bail!("no identities provided (-u/--identity or -i/--identities-file)");
    }
    Ok(out)
}

fn verify_inputs(args: &Args) {
    if !args.data_dir.is_dir() {
        warn!(
            "data directory not found: {} (continuing with an empty index)",
            args.data_dir.display()
        );
    }
    if !args.no_crack && !args.wordlists_dir.is_dir() {
        warn!(
            "wordlist directory not found: {} (passwords will not be recovered)",
            args.wordlists_dir.display()
        );
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    let identities = match collect_identities(&args) {
        Ok(ids) => ids,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    verify_inputs(&args);

    let config = FinderConfig {
        data_dir: args.data_dir.clone(),
        wordlists_dir: args.wordlists_dir.clone(),
        mmap_threshold_bytes: FinderConfig::threshold_from_arg(args.mmap_threshold),
        parallel_crack: args.parallel,
        parallel_ingest: args.parallel,
    };
    let finder = Finder::from_config(&config);

    let results: Vec<SearchResult> = identities
        .iter()
        .map(|id| finder.search(id, args.check_premium, !args.no_crack))
        .collect();

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(s) => println!("{}", s),
            Err(e) => error!("failed to serialize results: {}", e),
        }
    } else if !args.quiet {
        // Print banner and summary
        println!("{}", ASCII_TITLE.bold().red());
        println!("{}", render_index_summary(finder.identities(), args.top_limit));
        println!("{}", render_search_results(&results));
    }

    if let Some(outdir) = args.output {
        if let Err(e) = fs::create_dir_all(&outdir) {
            error!(
                "failed to create output directory {}: {}",
                outdir.display(),
                e
            );
            std::process::exit(3);
        }
        let ts = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S");
        let json = outdir.join(format!("leakmatch_results_{}.json", ts));
        let csv = outdir.join(format!("leakmatch_cracked_{}.csv", ts));
        if let Err(e) = save_results_json(&results, &json) {
            error!("failed to write {}: {}", json.display(), e);
            std::process::exit(4);
        }
        if let Err(e) = save_cracked_csv(&results, &csv) {
            error!("failed to write {}: {}", csv.display(), e);
            std::process::exit(5);
        }
    }

    if args.log_parse_stats {
        let stats = finder.identities().parse_stats();
        log::info!(
            "parse stats: sources={}, parsed={}, recovered={}, skipped={}, malformed_sources={}, unrecoverable_lines={}",
            stats.sources,
            stats.parsed,
            stats.recovered,
            stats.skipped,
            stats.malformed_sources,
            stats.unrecoverable_lines
        );
    }
}
