//! Typed records persisted to the `commits` and `edits` tables.
//!
//! Workers emit these; the sink buffers and bulk-inserts them. Nothing is
//! mutated after insertion.

/// One row of the `commits` table.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRow {
    /// Full commit hash.
    pub hash: String,
    pub author_email: String,
    pub author_name: String,
    pub committer_email: String,
    pub committer_name: String,
    /// Rendered `YYYY-MM-DD HH:MM:SS` in the commit's recorded timezone.
    pub author_date: String,
    /// Rendered `YYYY-MM-DD HH:MM:SS` in the commit's recorded timezone.
    pub committer_date: String,
    /// Seconds west of UTC.
    pub committer_timezone: i32,
    /// Count of all modifications, including excluded ones.
    pub modifications: i64,
    /// Character count of the trimmed commit message.
    pub msg_len: i64,
    pub project_name: String,
    /// Parent hashes, comma-joined.
    pub parents: String,
    pub merge: bool,
    pub in_main_branch: bool,
    /// Containing branches, comma-joined.
    pub branches: String,
}

/// One row of the `edits` table: a contiguous edit within a modification.
///
/// `pre_*` length/entropy/commit fields are null exactly for pure
/// insertions; `post_*` length/entropy fields are null exactly for pure
/// deletions; `levenshtein_dist` is null unless both sides are non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRow {
    pub mod_filename: String,
    pub mod_new_path: Option<String>,
    pub mod_old_path: Option<String>,
    /// Hash of the commit that introduced the edit.
    pub post_commit: String,
    pub mod_added: i64,
    pub mod_removed: i64,
    pub mod_cyclomatic_complexity: Option<f64>,
    pub mod_loc: Option<i64>,
    pub mod_token_count: Option<i64>,
    pub pre_starting_line_num: i64,
    pub pre_len_in_lines: Option<i64>,
    pub pre_len_in_chars: Option<i64>,
    pub pre_entropy: Option<f64>,
    /// Commit that last authored the deleted lines, as reported by blame.
    pub pre_commit: Option<String>,
    pub post_starting_line_num: i64,
    pub post_len_in_lines: Option<i64>,
    pub post_len_in_chars: Option<i64>,
    pub post_entropy: Option<f64>,
    pub levenshtein_dist: Option<i64>,
}
