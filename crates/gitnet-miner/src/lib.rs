//! Mining orchestration: walks a repository's history, extracts line-level
//! edits per commit, and persists the results.
//!
//! Workers are stateless; each opens its own repository handle per task and
//! returns typed rows through a channel to the single-writer sink.

pub mod processor;
pub mod scheduler;

pub use processor::{process_commit, CommitResult};
pub use scheduler::mine;

use gitnet_diff::Granularity;

pub type Result<T> = std::result::Result<T, MineError>;

/// Errors from a mining run.
#[derive(Debug, thiserror::Error)]
pub enum MineError {
    #[error(transparent)]
    Repo(#[from] gitnet_repo::RepoError),

    #[error(transparent)]
    Store(#[from] gitnet_store::StoreError),

    #[error("store contains commits that are not in the repository; provide a clean database")]
    StaleStore,

    #[error("blame output for {file} at {commit} has no line {line}")]
    BlameLine { file: String, commit: String, line: u32 },
}

/// Options controlling a mining run.
#[derive(Debug, Clone)]
pub struct MineOptions {
    /// Segmentation granularity; also recorded in store metadata.
    pub granularity: Granularity,
    /// Path prefixes whose modifications are skipped.
    pub exclude_paths: Vec<String>,
    /// Worker count; `1` processes commits serially.
    pub num_processes: usize,
    /// Commits handed to a worker per dispatch.
    pub chunk_size: usize,
}

impl Default for MineOptions {
    fn default() -> Self {
        MineOptions {
            granularity: Granularity::Lines,
            exclude_paths: Vec::new(),
            num_processes: num_cpus::get(),
            chunk_size: 1,
        }
    }
}
