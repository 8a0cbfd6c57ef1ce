//! Commit scheduling and result persistence.
//!
//! Tasks are dispatched in commit-enumeration order and completed
//! unordered; the sink is the single writer and appends each commit's rows
//! as one unit, so a terminated run leaves a consistent partial store.

use std::collections::HashSet;
use std::path::Path;

use crossbeam::channel;
use gitnet_repo::Repository;
use gitnet_store::Store;
use tracing::info;

use crate::processor::{process_commit, CommitResult};
use crate::{MineError, MineOptions, Result};

/// Mine the repository at `repo_path` into the store at `db_path`.
///
/// Resumable: commits already present in the store are skipped. Fails
/// before any work when the store was created with different settings or
/// contains commits the repository no longer has.
pub fn mine(repo_path: &Path, db_path: &Path, options: &MineOptions) -> Result<()> {
    let repo = Repository::open(repo_path)?;
    let repository = repo_path.to_string_lossy().into_owned();
    let mut store = Store::open(db_path, &repository, options.granularity.as_str())?;

    let persisted = store.persisted_commits()?;
    let hashes = repo.commit_hashes()?;
    let known: HashSet<&str> = hashes.iter().map(String::as_str).collect();
    if !persisted.iter().all(|hash| known.contains(hash.as_str())) {
        return Err(MineError::StaleStore);
    }

    let tasks: Vec<String> = hashes
        .iter()
        .filter(|hash| !persisted.contains(*hash))
        .cloned()
        .collect();
    if tasks.is_empty() {
        info!("store is already complete");
        return Ok(());
    }
    if !persisted.is_empty() {
        info!(
            skipped = persisted.len(),
            remaining = tasks.len(),
            total = hashes.len(),
            "resuming from existing store"
        );
    }

    if options.num_processes <= 1 {
        process_serial(repo_path, &mut store, &tasks, options)
    } else {
        process_parallel(repo_path, &mut store, &tasks, options)
    }
}

fn process_serial(
    repo_path: &Path,
    store: &mut Store,
    tasks: &[String],
    options: &MineOptions,
) -> Result<()> {
    for hash in tasks {
        let result = process_commit(repo_path, hash, options)?;
        append(store, &result)?;
    }
    Ok(())
}

/// Fan tasks out to a pool of stateless workers over a job channel and
/// drain their results, unordered, into the store.
fn process_parallel(
    repo_path: &Path,
    store: &mut Store,
    tasks: &[String],
    options: &MineOptions,
) -> Result<()> {
    let chunk_size = options.chunk_size.max(1);
    let (job_tx, job_rx) = channel::unbounded::<Vec<String>>();
    for chunk in tasks.chunks(chunk_size) {
        job_tx.send(chunk.to_vec()).expect("job channel open");
    }
    drop(job_tx);

    let (result_tx, result_rx) = channel::unbounded::<Result<CommitResult>>();

    std::thread::scope(|scope| {
        for _ in 0..options.num_processes {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for chunk in job_rx.iter() {
                    for hash in chunk {
                        let result = process_commit(repo_path, &hash, options);
                        let failed = result.is_err();
                        // a closed result channel means the sink gave up
                        if result_tx.send(result).is_err() || failed {
                            return;
                        }
                    }
                }
            });
        }
        drop(result_tx);

        // Dropping the receiver on an early return hangs up the workers.
        let result_rx = result_rx;
        for result in result_rx.iter() {
            append(store, &result?)?;
        }
        Ok(())
    })
}

fn append(store: &mut Store, result: &CommitResult) -> Result<()> {
    store.append(&result.commit, &result.edits)?;
    Ok(())
}
