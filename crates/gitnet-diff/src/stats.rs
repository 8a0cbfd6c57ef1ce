//! Textual descriptors for edit content.
//!
//! Each side of an edit is flattened into a blob (its lines joined by single
//! spaces) and described by length in lines, length in characters, Shannon
//! entropy of the byte histogram, and, when both sides are non-empty, the
//! Levenshtein distance between the two blobs.

use crate::{EditRecord, LineMap};

/// Descriptors computed for one edit record.
///
/// A side's length and entropy fields are `None` exactly when that side is
/// empty; `levenshtein_dist` is `None` unless both sides are non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EditStats {
    pub pre_len_in_lines: Option<u32>,
    pub pre_len_in_chars: Option<usize>,
    pub pre_entropy: Option<f64>,
    pub post_len_in_lines: Option<u32>,
    pub post_len_in_chars: Option<usize>,
    pub post_entropy: Option<f64>,
    pub levenshtein_dist: Option<usize>,
}

/// Characterise one edit against the line maps it was segmented from.
///
/// Panics if a line the edit covers is missing from its map; the aligner
/// only emits ranges it has seen, so a gap is a programmer error.
pub fn edit_stats(edit: &EditRecord, deleted: &LineMap, added: &LineMap) -> EditStats {
    let del_blob = edit_blob(deleted, edit.pre_start, edit.num_deleted);
    let add_blob = edit_blob(added, edit.post_start, edit.num_added);

    let (pre_len_in_lines, pre_len_in_chars, pre_entropy) = if edit.num_deleted == 0 {
        (None, None, None)
    } else {
        (
            Some(edit.num_deleted),
            Some(del_blob.chars().count()),
            Some(shannon_entropy(del_blob.as_bytes())),
        )
    };

    let (post_len_in_lines, post_len_in_chars, post_entropy) = if edit.num_added == 0 {
        (None, None, None)
    } else {
        (
            Some(edit.num_added),
            Some(add_blob.chars().count()),
            Some(shannon_entropy(add_blob.as_bytes())),
        )
    };

    let levenshtein_dist = if del_blob.is_empty() || add_blob.is_empty() {
        None
    } else {
        Some(levenshtein(&del_blob, &add_blob))
    };

    EditStats {
        pre_len_in_lines,
        pre_len_in_chars,
        pre_entropy,
        post_len_in_lines,
        post_len_in_chars,
        post_entropy,
        levenshtein_dist,
    }
}

/// Join `count` lines starting at `start` with single spaces.
fn edit_blob(lines: &LineMap, start: u32, count: u32) -> String {
    let mut blob = String::new();
    for line in start..start + count {
        if line > start {
            blob.push(' ');
        }
        blob.push_str(&lines[&line]);
    }
    blob
}

/// Base-2 Shannon entropy of the byte histogram of `bytes`.
///
/// A byte-level statistic over the raw encoding, not code points. Zero for
/// empty input; bounded by 8 for any input.
pub fn shannon_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &byte in bytes {
        counts[byte as usize] += 1;
    }
    let total = bytes.len() as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Classical unit-cost Levenshtein distance between two strings, measured
/// over characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitute.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
