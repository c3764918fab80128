use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use ipball::benchmark::mean_recall;
use ipball::io::{load_matrix, save_results, write_results, OutputFormat};
use ipball::{compute_top_k_naive, compute_top_k_with, MipsParams, TopKLists};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    BallTree,
    Naive,
}

#[derive(Debug, Parser)]
#[command(name = "ipball")]
#[command(about = "Top-k maximum inner product search", long_about = None)]
struct Args {
    /// User (query) matrix, one vector per line.
    #[arg(long)]
    users: PathBuf,
    /// Item matrix, one vector per line.
    #[arg(long)]
    items: PathBuf,
    #[arg(short, long, default_value_t = 10)]
    k: usize,
    #[arg(long, value_enum, default_value_t = Algorithm::BallTree)]
    algorithm: Algorithm,
    /// JSON file with `MipsParams`; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    leaf_capacity: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Write ranked lists here (`-` for stdout). Nothing is written without it.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value = "text")]
    format: OutputFormat,
    /// Also run brute force and report recall against it.
    #[arg(long)]
    verify: bool,
}

fn init_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_params(args: &Args) -> anyhow::Result<MipsParams> {
    let mut params = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => MipsParams::default(),
    };
    if let Some(leaf_capacity) = args.leaf_capacity {
        params.tree.leaf_capacity = leaf_capacity;
    }
    if let Some(seed) = args.seed {
        params.tree.seed = Some(seed);
    }
    params.validate()?;
    Ok(params)
}

fn ids_per_user(results: &TopKLists) -> Vec<Vec<u32>> {
    (0..results.len())
        .map(|u| results.ids(u).unwrap_or_default())
        .collect()
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    if args.k == 0 {
        anyhow::bail!("-k must be > 0");
    }
    let params = load_params(&args)?;

    let users = load_matrix(&args.users)
        .with_context(|| format!("loading users from {}", args.users.display()))?;
    let items = load_matrix(&args.items)
        .with_context(|| format!("loading items from {}", args.items.display()))?;
    info!(
        users = users.num_rows(),
        items = items.num_rows(),
        dimension = items.dimension(),
        k = args.k,
        algorithm = ?args.algorithm,
        "loaded inputs"
    );

    let results = match args.algorithm {
        Algorithm::BallTree => compute_top_k_with(args.k, &users, &items, &params)?,
        Algorithm::Naive => compute_top_k_naive(args.k, &users, &items)?,
    };
    let total = results.timings.map
        + results.timings.build
        + results.timings.search
        + results.timings.recover;
    info!(
        secs = total.as_secs_f64(),
        failed_rows = results.num_failed(),
        points_scored = results.search_stats.points_scored,
        "top-k complete"
    );

    if args.verify && args.algorithm == Algorithm::BallTree {
        let truth = compute_top_k_naive(args.k, &users, &items)?;
        let recall = mean_recall(&ids_per_user(&truth), &ids_per_user(&results), args.k);
        if recall < 1.0 {
            warn!(recall, "ball tree disagrees with brute force");
        } else {
            info!(recall, "ball tree matches brute force");
        }
    }

    match args.output.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            write_results(io::stdout().lock(), &results, args.format)?;
        }
        Some(path) => {
            save_results(path, &results, args.format)
                .with_context(|| format!("writing results to {}", path.display()))?;
            info!(path = %path.display(), "wrote results");
        }
        None => {}
    }

    Ok(())
}
