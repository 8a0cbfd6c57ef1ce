//! Commit metadata and per-file modifications.

use bstr::ByteSlice;
use chrono::{DateTime, FixedOffset};
use gitnet_diff::LineMap;

use crate::diff_parse::FilePatch;
use crate::{RepoError, Result};

/// An author or committer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

/// An immutable snapshot of one commit with its metadata and modifications.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Full commit hash.
    pub hash: String,
    pub author: Signature,
    pub committer: Signature,
    pub author_date: DateTime<FixedOffset>,
    pub committer_date: DateTime<FixedOffset>,
    /// Commit message, trimmed of surrounding whitespace.
    pub message: String,
    /// Parent hashes in recorded order.
    pub parents: Vec<String>,
    /// Local branches whose history contains this commit.
    pub branches: Vec<String>,
    /// Whether the branch `HEAD` points at contains this commit.
    pub in_main_branch: bool,
    /// File modifications relative to the first parent.
    pub modifications: Vec<Modification>,
}

impl Commit {
    /// True when the commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// First parent hash, if any.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// Committer timezone as seconds west of UTC.
    pub fn committer_timezone(&self) -> i32 {
        -self.committer_date.offset().local_minus_utc()
    }
}

/// A single file's pre/post pair within a commit, with its parsed diff.
#[derive(Debug, Clone)]
pub struct Modification {
    /// Base name of the file (the new path when present, else the old).
    pub filename: String,
    /// Path before the commit; `None` for added files.
    pub old_path: Option<String>,
    /// Path after the commit; `None` for deleted files.
    pub new_path: Option<String>,
    /// Number of added lines in the diff.
    pub added: u32,
    /// Number of removed lines in the diff.
    pub removed: u32,
    /// Non-blank lines of the post-image source; `None` when absent or binary.
    pub loc: Option<i64>,
    /// Whitespace-separated tokens of the post-image source; `None` when
    /// absent or binary.
    pub token_count: Option<i64>,
    /// Cyclomatic complexity of the post-image source. Requires a source
    /// analyser; always `None` in this implementation.
    pub cyclomatic_complexity: Option<f64>,
    /// Deleted lines keyed by pre-image line number.
    pub deleted_lines: LineMap,
    /// Added lines keyed by post-image line number.
    pub added_lines: LineMap,
}

impl Modification {
    /// Build a modification from a parsed file patch and the post-image
    /// source, when one exists.
    pub fn from_patch(patch: FilePatch, source: Option<&[u8]>) -> Self {
        let filename = patch
            .new_path
            .as_deref()
            .or(patch.old_path.as_deref())
            .map(basename)
            .unwrap_or_default();
        Modification {
            filename,
            added: patch.added.len() as u32,
            removed: patch.deleted.len() as u32,
            loc: source.map(count_loc),
            token_count: source.map(count_tokens),
            cyclomatic_complexity: None,
            old_path: patch.old_path,
            new_path: patch.new_path,
            deleted_lines: patch.deleted,
            added_lines: patch.added,
        }
    }
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Count non-blank lines.
fn count_loc(source: &[u8]) -> i64 {
    source.lines().filter(|line| !line.trim().is_empty()).count() as i64
}

/// Count whitespace-separated tokens.
fn count_tokens(source: &[u8]) -> i64 {
    source.fields().count() as i64
}

/// Parse a git `--date=raw` value, e.g. `1234567890 +0530`, keeping the
/// recorded timezone.
pub(crate) fn parse_raw_date(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let (timestamp, zone) = raw
        .split_once(' ')
        .ok_or_else(|| RepoError::Parse(format!("bad raw date: {raw:?}")))?;
    let timestamp: i64 = timestamp
        .parse()
        .map_err(|_| RepoError::Parse(format!("bad raw timestamp: {raw:?}")))?;
    let offset = parse_zone_offset(zone)?;
    let utc = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| RepoError::Parse(format!("timestamp out of range: {raw:?}")))?;
    Ok(utc.with_timezone(&offset))
}

/// Parse a `+HHMM`/`-HHMM` zone suffix into a fixed offset.
fn parse_zone_offset(zone: &str) -> Result<FixedOffset> {
    let malformed = || RepoError::Parse(format!("bad timezone offset: {zone:?}"));
    if zone.len() != 5 {
        return Err(malformed());
    }
    let sign = match zone.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(malformed()),
    };
    let hours: i32 = zone[1..3].parse().map_err(|_| malformed())?;
    let minutes: i32 = zone[3..5].parse().map_err(|_| malformed())?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_date_renders_in_recorded_zone() {
        let date = parse_raw_date("1234567890 +0100").unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M:%S").to_string(), "2009-02-14 00:31:30");
    }

    #[test]
    fn raw_date_negative_offset() {
        let date = parse_raw_date("1234567890 -0500").unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M:%S").to_string(), "2009-02-13 18:31:30");
        assert_eq!(date.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn rejects_malformed_raw_dates() {
        assert!(parse_raw_date("nonsense").is_err());
        assert!(parse_raw_date("123 0100").is_err());
        assert!(parse_raw_date("123 +01").is_err());
    }

    #[test]
    fn committer_timezone_is_seconds_west() {
        let commit = Commit {
            hash: "a".repeat(40),
            author: Signature { name: "a".into(), email: "a@x".into() },
            committer: Signature { name: "c".into(), email: "c@x".into() },
            author_date: parse_raw_date("1234567890 +0200").unwrap(),
            committer_date: parse_raw_date("1234567890 +0200").unwrap(),
            message: String::new(),
            parents: vec![],
            branches: vec![],
            in_main_branch: false,
            modifications: vec![],
        };
        assert_eq!(commit.committer_timezone(), -7200);
    }

    #[test]
    fn loc_and_tokens() {
        let source = b"fn main() {\n\n    let x = 1;\n}\n";
        assert_eq!(count_loc(source), 3);
        assert_eq!(count_tokens(source), 8);
    }

    #[test]
    fn merge_detection() {
        let mut commit = Commit {
            hash: "a".repeat(40),
            author: Signature { name: "a".into(), email: "a@x".into() },
            committer: Signature { name: "c".into(), email: "c@x".into() },
            author_date: parse_raw_date("1 +0000").unwrap(),
            committer_date: parse_raw_date("1 +0000").unwrap(),
            message: String::new(),
            parents: vec!["p1".into()],
            branches: vec![],
            in_main_branch: false,
            modifications: vec![],
        };
        assert!(!commit.is_merge());
        assert_eq!(commit.first_parent(), Some("p1"));
        commit.parents.push("p2".into());
        assert!(commit.is_merge());
    }
}
