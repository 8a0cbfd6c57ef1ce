//! Per-commit processing: modification filtering, edit extraction, blame
//! attribution, and row assembly.

use std::path::Path;

use gitnet_diff::{align, edit_stats, Granularity};
use gitnet_repo::{Commit, Modification, RepoError, Repository};
use gitnet_store::{CommitRow, EditRow};
use tracing::debug;

use crate::{MineError, MineOptions, Result};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One worker's output for a single commit: the commit row and the edit
/// rows of its non-excluded modifications.
#[derive(Debug, Clone)]
pub struct CommitResult {
    pub commit: CommitRow,
    pub edits: Vec<EditRow>,
}

/// Process one commit by hash.
///
/// Workers are stateless: the repository is re-opened per task.
pub fn process_commit(
    repo_path: &Path,
    hash: &str,
    options: &MineOptions,
) -> Result<CommitResult> {
    let repo = Repository::open(repo_path)?;
    let commit = repo.get_commit(hash)?;

    let mut edits = Vec::new();
    for modification in &commit.modifications {
        if is_excluded(modification, &options.exclude_paths) {
            continue;
        }
        edits.extend(extract_edits(&repo, &commit, modification, options.granularity)?);
    }

    Ok(CommitResult {
        commit: commit_row(&repo, &commit),
        edits,
    })
}

/// A path is excluded when it starts with a listed prefix followed by a
/// path separator: prefix `src` excludes `src/a.c` but not `srcs/a.c`, and
/// a prefix naming a file exactly excludes nothing.
fn is_excluded(modification: &Modification, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        let dir = format!("{prefix}/");
        let matches = |path: Option<&str>| path.is_some_and(|p| p.starts_with(&dir));
        matches(modification.new_path.as_deref()) || matches(modification.old_path.as_deref())
    })
}

/// Extract the edit rows of one modification.
///
/// The parent revision is annotated once per modification; if the
/// annotation fails (the path is unknown at the parent, e.g. after a
/// double rename, a newly added file, or a root commit), the whole
/// modification is skipped and the commit row is still written.
fn extract_edits(
    repo: &Repository,
    commit: &Commit,
    modification: &Modification,
    granularity: Granularity,
) -> Result<Vec<EditRow>> {
    let alignment = align(
        &modification.deleted_lines,
        &modification.added_lines,
        granularity,
    );
    if alignment.edits.is_empty() {
        return Ok(Vec::new());
    }

    let Some(path) = modification.new_path.as_deref() else {
        debug!(
            file = %modification.filename,
            commit = %commit.hash,
            "no post-image path to annotate, skipping modification"
        );
        return Ok(Vec::new());
    };
    let parent_rev = format!("{}^", commit.hash);
    let blame = match repo.blame(&parent_rev, path) {
        Ok(blame) => blame,
        Err(RepoError::Command { .. }) => {
            debug!(
                file = %modification.filename,
                commit = %commit.hash,
                "could not find file in the parent revision, probably a double rename; \
                 skipping modification"
            );
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut rows = Vec::with_capacity(alignment.edits.len());
    for edit in &alignment.edits {
        let stats = edit_stats(edit, &modification.deleted_lines, &modification.added_lines);
        let pre_commit = if edit.num_deleted == 0 {
            None
        } else {
            let annotated = blame.commit_for_line(edit.pre_start).ok_or_else(|| {
                MineError::BlameLine {
                    file: modification.filename.clone(),
                    commit: commit.hash.clone(),
                    line: edit.pre_start,
                }
            })?;
            Some(annotated)
        };
        rows.push(EditRow {
            mod_filename: modification.filename.clone(),
            mod_new_path: modification.new_path.clone(),
            mod_old_path: modification.old_path.clone(),
            post_commit: commit.hash.clone(),
            mod_added: i64::from(modification.added),
            mod_removed: i64::from(modification.removed),
            mod_cyclomatic_complexity: modification.cyclomatic_complexity,
            mod_loc: modification.loc,
            mod_token_count: modification.token_count,
            pre_starting_line_num: i64::from(edit.pre_start),
            pre_len_in_lines: stats.pre_len_in_lines.map(i64::from),
            pre_len_in_chars: stats.pre_len_in_chars.map(|n| n as i64),
            pre_entropy: stats.pre_entropy,
            pre_commit,
            post_starting_line_num: i64::from(edit.post_start),
            post_len_in_lines: stats.post_len_in_lines.map(i64::from),
            post_len_in_chars: stats.post_len_in_chars.map(|n| n as i64),
            post_entropy: stats.post_entropy,
            levenshtein_dist: stats.levenshtein_dist.map(|n| n as i64),
        });
    }
    Ok(rows)
}

fn commit_row(repo: &Repository, commit: &Commit) -> CommitRow {
    CommitRow {
        hash: commit.hash.clone(),
        author_email: commit.author.email.clone(),
        author_name: commit.author.name.clone(),
        committer_email: commit.committer.email.clone(),
        committer_name: commit.committer.name.clone(),
        author_date: commit.author_date.format(DATE_FORMAT).to_string(),
        committer_date: commit.committer_date.format(DATE_FORMAT).to_string(),
        committer_timezone: commit.committer_timezone(),
        modifications: commit.modifications.len() as i64,
        msg_len: commit.message.chars().count() as i64,
        project_name: repo.project_name().to_string(),
        parents: commit.parents.join(","),
        merge: commit.is_merge(),
        in_main_branch: commit.in_main_branch,
        branches: commit.branches.join(","),
    }
}
