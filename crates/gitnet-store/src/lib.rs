//! SQLite-backed relational store for mined commits and edits.
//!
//! The store holds three tables: `commits`, `edits`, and `_metadata`. The
//! metadata row is written once at initialisation and validated on every
//! reopen, so a paused run can only be resumed against the same repository
//! and segmentation method. The store has a single writer; each commit's
//! rows are appended in one transaction.

pub mod network;
pub mod rows;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

pub use network::{AuthorDag, BipartiteEdge, CoeditingEdge, DagEdge, TimeWindow};
pub use rows::{CommitRow, EditRow};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Version tag recorded in the metadata row.
pub const CREATED_WITH: &str = concat!("gitnet ", env!("CARGO_PKG_VERSION"));

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(
        "file at '{}' was not created by gitnet; provide a path to no database \
         or to one from a previously paused run",
        path.display()
    )]
    Unrecognised { path: PathBuf },

    #[error("store was created with method '{found}' but this run uses '{expected}'")]
    MethodMismatch { found: String, expected: String },

    #[error("store was created from repository '{found}' but this run mines '{expected}'")]
    RepositoryMismatch { found: String, expected: String },

    #[error("malformed timestamp in store: {0:?}")]
    Timestamp(String),

    #[error("author graph contains a cycle")]
    Cycle,
}

/// Contents of the `_metadata` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMetadata {
    pub created_with: String,
    pub repository: String,
    pub date: String,
    pub method: String,
}

/// An open store.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

const SCHEMA: &str = "\
CREATE TABLE _metadata (
    created_with TEXT,
    repository TEXT,
    date TEXT,
    method TEXT
);
CREATE TABLE commits (
    hash TEXT,
    author_email TEXT,
    author_name TEXT,
    committer_email TEXT,
    committer_name TEXT,
    author_date TEXT,
    committer_date TEXT,
    committer_timezone INTEGER,
    modifications INTEGER,
    msg_len INTEGER,
    project_name TEXT,
    parents TEXT,
    merge INTEGER,
    in_main_branch INTEGER,
    branches TEXT
);
CREATE TABLE edits (
    mod_filename TEXT,
    mod_new_path TEXT,
    mod_old_path TEXT,
    post_commit TEXT,
    mod_added INTEGER,
    mod_removed INTEGER,
    mod_cyclomatic_complexity REAL,
    mod_loc INTEGER,
    mod_token_count INTEGER,
    pre_starting_line_num INTEGER,
    pre_len_in_lines INTEGER,
    pre_len_in_chars INTEGER,
    pre_entropy REAL,
    pre_commit TEXT,
    post_starting_line_num INTEGER,
    post_len_in_lines INTEGER,
    post_len_in_chars INTEGER,
    post_entropy REAL,
    levenshtein_dist INTEGER
);
";

impl Store {
    /// Open or create the store at `path`, validating compatibility with
    /// this run's repository and segmentation method.
    pub fn open(path: impl AsRef<Path>, repository: &str, method: &str) -> Result<Store> {
        let path = path.as_ref();
        let existed = path.exists();
        let conn = Connection::open(path)?;
        let store = Store { conn };
        if existed {
            if !store.has_table("_metadata")? {
                return Err(StoreError::Unrecognised { path: path.to_path_buf() });
            }
            let meta = store.metadata()?;
            if meta.method != method {
                return Err(StoreError::MethodMismatch {
                    found: meta.method,
                    expected: method.to_string(),
                });
            }
            if meta.repository != repository {
                return Err(StoreError::RepositoryMismatch {
                    found: meta.repository,
                    expected: repository.to_string(),
                });
            }
        } else {
            store.initialise(repository, method)?;
        }
        Ok(store)
    }

    fn initialise(&self, repository: &str, method: &str) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute(
            "INSERT INTO _metadata (created_with, repository, date, method) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                CREATED_WITH,
                repository,
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                method,
            ],
        )?;
        Ok(())
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// The metadata row written at initialisation.
    pub fn metadata(&self) -> Result<StoreMetadata> {
        let meta = self.conn.query_row(
            "SELECT created_with, repository, date, method FROM _metadata",
            [],
            |row| {
                Ok(StoreMetadata {
                    created_with: row.get(0)?,
                    repository: row.get(1)?,
                    date: row.get(2)?,
                    method: row.get(3)?,
                })
            },
        )?;
        Ok(meta)
    }

    /// Hashes of all commits already persisted.
    pub fn persisted_commits(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT hash FROM commits")?;
        let hashes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(hashes)
    }

    /// Append one commit's results as a single unit.
    pub fn append(&mut self, commit: &CommitRow, edits: &[EditRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO commits (hash, author_email, author_name, committer_email, \
             committer_name, author_date, committer_date, committer_timezone, \
             modifications, msg_len, project_name, parents, merge, in_main_branch, branches) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                commit.hash,
                commit.author_email,
                commit.author_name,
                commit.committer_email,
                commit.committer_name,
                commit.author_date,
                commit.committer_date,
                commit.committer_timezone,
                commit.modifications,
                commit.msg_len,
                commit.project_name,
                commit.parents,
                commit.merge,
                commit.in_main_branch,
                commit.branches,
            ],
        )?;
        if !edits.is_empty() {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO edits (mod_filename, mod_new_path, mod_old_path, post_commit, \
                 mod_added, mod_removed, mod_cyclomatic_complexity, mod_loc, mod_token_count, \
                 pre_starting_line_num, pre_len_in_lines, pre_len_in_chars, pre_entropy, \
                 pre_commit, post_starting_line_num, post_len_in_lines, post_len_in_chars, \
                 post_entropy, levenshtein_dist) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                 ?16, ?17, ?18, ?19)",
            )?;
            for edit in edits {
                stmt.execute(params![
                    edit.mod_filename,
                    edit.mod_new_path,
                    edit.mod_old_path,
                    edit.post_commit,
                    edit.mod_added,
                    edit.mod_removed,
                    edit.mod_cyclomatic_complexity,
                    edit.mod_loc,
                    edit.mod_token_count,
                    edit.pre_starting_line_num,
                    edit.pre_len_in_lines,
                    edit.pre_len_in_chars,
                    edit.pre_entropy,
                    edit.pre_commit,
                    edit.post_starting_line_num,
                    edit.post_len_in_lines,
                    edit.post_len_in_chars,
                    edit.post_entropy,
                    edit.levenshtein_dist,
                ])?;
            }
            drop(stmt);
        }
        tx.commit()?;
        Ok(())
    }

    /// All persisted commit rows, in insertion order.
    pub fn commit_rows(&self) -> Result<Vec<CommitRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash, author_email, author_name, committer_email, committer_name, \
             author_date, committer_date, committer_timezone, modifications, msg_len, \
             project_name, parents, merge, in_main_branch, branches FROM commits",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CommitRow {
                    hash: row.get(0)?,
                    author_email: row.get(1)?,
                    author_name: row.get(2)?,
                    committer_email: row.get(3)?,
                    committer_name: row.get(4)?,
                    author_date: row.get(5)?,
                    committer_date: row.get(6)?,
                    committer_timezone: row.get(7)?,
                    modifications: row.get(8)?,
                    msg_len: row.get(9)?,
                    project_name: row.get(10)?,
                    parents: row.get(11)?,
                    merge: row.get(12)?,
                    in_main_branch: row.get(13)?,
                    branches: row.get(14)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All persisted edit rows, in insertion order.
    pub fn edit_rows(&self) -> Result<Vec<EditRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT mod_filename, mod_new_path, mod_old_path, post_commit, mod_added, \
             mod_removed, mod_cyclomatic_complexity, mod_loc, mod_token_count, \
             pre_starting_line_num, pre_len_in_lines, pre_len_in_chars, pre_entropy, \
             pre_commit, post_starting_line_num, post_len_in_lines, post_len_in_chars, \
             post_entropy, levenshtein_dist FROM edits",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EditRow {
                    mod_filename: row.get(0)?,
                    mod_new_path: row.get(1)?,
                    mod_old_path: row.get(2)?,
                    post_commit: row.get(3)?,
                    mod_added: row.get(4)?,
                    mod_removed: row.get(5)?,
                    mod_cyclomatic_complexity: row.get(6)?,
                    mod_loc: row.get(7)?,
                    mod_token_count: row.get(8)?,
                    pre_starting_line_num: row.get(9)?,
                    pre_len_in_lines: row.get(10)?,
                    pre_len_in_chars: row.get(11)?,
                    pre_entropy: row.get(12)?,
                    pre_commit: row.get(13)?,
                    post_starting_line_num: row.get(14)?,
                    post_len_in_lines: row.get(15)?,
                    post_len_in_chars: row.get(16)?,
                    post_entropy: row.get(17)?,
                    levenshtein_dist: row.get(18)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
