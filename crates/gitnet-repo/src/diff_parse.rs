//! Parses `git diff` patch output into per-file sparse line maps.
//!
//! The parser tracks the remaining line counts of the current hunk, so
//! content lines that happen to look like file headers (`--- `, `+++ `) are
//! never misread: header lines only occur between hunks.

use bstr::ByteSlice;
use gitnet_diff::LineMap;

/// One file's parsed patch: paths and the two sparse line maps.
#[derive(Debug, Clone, Default)]
pub struct FilePatch {
    /// Path before the commit; `None` for added files.
    pub old_path: Option<String>,
    /// Path after the commit; `None` for deleted files.
    pub new_path: Option<String>,
    /// True when git reported the file as binary (no line maps).
    pub is_binary: bool,
    /// Deleted lines keyed by pre-image line number.
    pub deleted: LineMap,
    /// Added lines keyed by post-image line number.
    pub added: LineMap,
}

/// Parse a whole-commit patch into its per-file components.
pub fn parse_patch(patch: &[u8]) -> Vec<FilePatch> {
    let mut files: Vec<FilePatch> = Vec::new();
    let mut current: Option<FilePatch> = None;

    // Cursors and remaining counts of the hunk being consumed.
    let mut pre_line = 0u32;
    let mut post_line = 0u32;
    let mut remaining_pre = 0u32;
    let mut remaining_post = 0u32;

    for line in patch.lines() {
        let in_hunk = remaining_pre > 0 || remaining_post > 0;

        if in_hunk {
            let file = current.as_mut().expect("hunk outside a file header");
            match line.first() {
                Some(b'-') => {
                    file.deleted.insert(pre_line, text_of(line));
                    pre_line += 1;
                    remaining_pre -= 1;
                }
                Some(b'+') => {
                    file.added.insert(post_line, text_of(line));
                    post_line += 1;
                    remaining_post -= 1;
                }
                // "\ No newline at end of file" consumes no line on either side.
                Some(b'\\') => {}
                _ => {
                    pre_line += 1;
                    post_line += 1;
                    remaining_pre = remaining_pre.saturating_sub(1);
                    remaining_post = remaining_post.saturating_sub(1);
                }
            }
            continue;
        }

        if line.starts_with(b"diff --git ") {
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = Some(file_from_header(&line[b"diff --git ".len()..]));
            continue;
        }

        let Some(file) = current.as_mut() else { continue };

        if line.starts_with(b"@@ ") {
            if let Some((pre_start, pre_count, post_start, post_count)) = parse_hunk_header(line) {
                pre_line = pre_start;
                post_line = post_start;
                remaining_pre = pre_count;
                remaining_post = post_count;
            }
        } else if let Some(path) = line.strip_prefix(b"--- ") {
            file.old_path = header_path(path, b"a/");
        } else if let Some(path) = line.strip_prefix(b"+++ ") {
            file.new_path = header_path(path, b"b/");
        } else if let Some(path) = line.strip_prefix(b"rename from ") {
            file.old_path = Some(path.to_str_lossy().into_owned());
        } else if let Some(path) = line.strip_prefix(b"rename to ") {
            file.new_path = Some(path.to_str_lossy().into_owned());
        } else if line.starts_with(b"Binary files ") || line.starts_with(b"GIT binary patch") {
            file.is_binary = true;
        } else if line.starts_with(b"new file mode") {
            file.old_path = None;
        } else if line.starts_with(b"deleted file mode") {
            file.new_path = None;
        }
    }

    if let Some(file) = current.take() {
        files.push(file);
    }
    files
}

/// Content of a hunk line with its marker character removed.
fn text_of(line: &[u8]) -> String {
    line[1..].to_str_lossy().into_owned()
}

/// Best-effort paths from a `diff --git a/<old> b/<new>` header; the later
/// `---`/`+++`/`rename` lines overwrite these when present.
fn file_from_header(rest: &[u8]) -> FilePatch {
    let rest = rest.to_str_lossy();
    let (old_path, new_path) = match rest.strip_prefix("a/").and_then(|r| r.split_once(" b/")) {
        Some((old, new)) => (Some(old.to_string()), Some(new.to_string())),
        None => (None, None),
    };
    FilePatch { old_path, new_path, ..FilePatch::default() }
}

/// A `---`/`+++` header path: `/dev/null` means the side is absent; the
/// `a/`/`b/` prefix and any surrounding quotes are stripped.
fn header_path(path: &[u8], prefix: &[u8]) -> Option<String> {
    let path = path.strip_prefix(b"\"").unwrap_or(path);
    let path = path.strip_suffix(b"\"").unwrap_or(path);
    if path == b"/dev/null" {
        return None;
    }
    let path = path.strip_prefix(prefix).unwrap_or(path);
    Some(path.to_str_lossy().into_owned())
}

/// Parse `@@ -<start>[,<count>] +<start>[,<count>] @@ ...`.
fn parse_hunk_header(line: &[u8]) -> Option<(u32, u32, u32, u32)> {
    let text = line.to_str().ok()?;
    let mut parts = text.split_whitespace();
    parts.next()?; // "@@"
    let (pre_start, pre_count) = parse_hunk_range(parts.next()?.strip_prefix('-')?)?;
    let (post_start, post_count) = parse_hunk_range(parts.next()?.strip_prefix('+')?)?;
    Some((pre_start, pre_count, post_start, post_count))
}

fn parse_hunk_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}
