use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use gitnet_diff::Granularity;
use gitnet_miner::MineOptions;

/// Extracts commit and co-editing data from git repositories.
#[derive(Parser)]
#[command(name = "gitnet", version)]
struct Cli {
    /// Path to the repository to be parsed
    repo: PathBuf,

    /// Path to the SQLite database file storing results
    outfile: PathBuf,

    /// File listing path prefixes to exclude, one per line
    #[arg(long, value_name = "file")]
    exclude: Option<PathBuf>,

    /// Number of worker processes; defaults to the number of CPU cores
    #[arg(long, default_value_t = num_cpus::get())]
    numprocesses: usize,

    /// Number of commits handed to a worker per dispatch
    #[arg(long, default_value_t = 1)]
    chunksize: usize,

    /// Compare added and deleted blocks of code rather than lines
    #[arg(long)]
    use_blocks: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("fatal: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let exclude_paths = match &cli.exclude {
        Some(path) => read_exclude_file(path)?,
        None => Vec::new(),
    };

    let options = MineOptions {
        granularity: if cli.use_blocks { Granularity::Blocks } else { Granularity::Lines },
        exclude_paths,
        num_processes: cli.numprocesses,
        chunk_size: cli.chunksize,
    };

    gitnet_miner::mine(&cli.repo, &cli.outfile, &options)?;
    Ok(())
}

fn read_exclude_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read exclude file '{}'", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
