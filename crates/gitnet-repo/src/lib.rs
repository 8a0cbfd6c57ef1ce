//! Repository collaborator: commit enumeration, metadata, parsed diffs, and
//! line annotation, all obtained from the `git` binary.
//!
//! The mining engine consumes commits, diffs, and blames as inputs; this
//! crate is the boundary that produces them. Handles are cheap to open, so
//! stateless workers open one per task.

pub mod blame;
pub mod commit;
pub mod diff_parse;
pub mod subprocess;

use std::path::{Path, PathBuf};

pub use blame::Blame;
pub use commit::{Commit, Modification, Signature};
pub use diff_parse::{parse_patch, FilePatch};
pub use subprocess::GitCommand;

pub type Result<T> = std::result::Result<T, RepoError>;

/// Hash of the empty tree, used to diff root commits.
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Errors from repository queries.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a git repository: {}", path.display())]
    NotARepository { path: PathBuf },

    #[error("failed to spawn git: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git command failed: {command}: {stderr}")]
    Command { command: String, stderr: String },

    #[error("malformed git output: {0}")]
    Parse(String),
}

/// An open handle on a git repository.
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
    project_name: String,
}

impl Repository {
    /// Open the repository at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match GitCommand::new(&path).args(["rev-parse", "--git-dir"]).output() {
            Ok(_) => {}
            Err(RepoError::Command { .. }) => return Err(RepoError::NotARepository { path }),
            Err(err) => return Err(err),
        }
        let project_name = path
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Repository { path, project_name })
    }

    /// Directory name of the repository, used as the project identifier.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// All commit hashes reachable from `HEAD`, oldest first.
    pub fn commit_hashes(&self) -> Result<Vec<String>> {
        let out = self.git().args(["rev-list", "--reverse", "HEAD"]).output_utf8()?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Fetch a commit's metadata and modifications.
    pub fn get_commit(&self, hash: &str) -> Result<Commit> {
        let format = "%H%x1f%an%x1f%ae%x1f%cn%x1f%ce%x1f%ad%x1f%cd%x1f%P%x1f%B";
        let out = self
            .git()
            .args(["log", "-1", "--date=raw"])
            .arg(format!("--format={format}"))
            .arg(hash)
            .output_utf8()?;
        let fields: Vec<&str> = out.splitn(9, '\u{1f}').collect();
        if fields.len() != 9 {
            return Err(RepoError::Parse(format!(
                "expected 9 metadata fields for {hash}, got {}",
                fields.len()
            )));
        }

        let parents: Vec<String> = fields[7].split_whitespace().map(str::to_string).collect();
        let branches = self.branches_containing(hash)?;
        let in_main_branch = match self.head_branch()? {
            Some(head) => branches.contains(&head),
            None => false,
        };

        let commit = Commit {
            hash: fields[0].to_string(),
            author: Signature {
                name: fields[1].to_string(),
                email: fields[2].to_string(),
            },
            committer: Signature {
                name: fields[3].to_string(),
                email: fields[4].to_string(),
            },
            author_date: commit::parse_raw_date(fields[5])?,
            committer_date: commit::parse_raw_date(fields[6])?,
            message: fields[8].trim().to_string(),
            parents,
            branches,
            in_main_branch,
            modifications: Vec::new(),
        };

        let modifications = self.modifications_of(&commit)?;
        Ok(Commit { modifications, ..commit })
    }

    /// Parse the commit's diff against its first parent (or the empty tree
    /// for root commits) into per-file modifications.
    fn modifications_of(&self, commit: &Commit) -> Result<Vec<Modification>> {
        let base = commit.first_parent().unwrap_or(EMPTY_TREE);
        let patch = self
            .git()
            .args(["-c", "core.quotepath=false", "diff", "--no-color", "-M"])
            .arg(base)
            .arg(&commit.hash)
            .output()?;

        let mut modifications = Vec::new();
        for file in parse_patch(&patch) {
            let source = match &file.new_path {
                Some(path) if !file.is_binary => self.file_bytes(&commit.hash, path).ok(),
                _ => None,
            };
            modifications.push(Modification::from_patch(file, source.as_deref()));
        }
        Ok(modifications)
    }

    /// Raw content of `path` at revision `rev`.
    pub fn file_bytes(&self, rev: &str, path: &str) -> Result<Vec<u8>> {
        self.git().arg("show").arg(format!("{rev}:{path}")).output()
    }

    /// Local branches whose history contains `hash`.
    fn branches_containing(&self, hash: &str) -> Result<Vec<String>> {
        let out = self
            .git()
            .args(["branch", "--contains", hash, "--format=%(refname:short)"])
            .output_utf8()?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// The branch `HEAD` points at, or `None` when detached.
    fn head_branch(&self) -> Result<Option<String>> {
        let out = self
            .git()
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .output_utf8()?;
        let name = out.trim();
        if name.is_empty() || name == "HEAD" {
            Ok(None)
        } else {
            Ok(Some(name.to_string()))
        }
    }

    pub(crate) fn git(&self) -> GitCommand {
        GitCommand::new(&self.path)
    }
}
