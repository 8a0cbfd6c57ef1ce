//! Line-number alignment between the pre- and post-image of a modification.
//!
//! The aligner walks a pre-image cursor and a post-image cursor in lockstep
//! over the two sparse line maps, emitting one [`EditRecord`] per changed
//! line (line granularity) or per maximal run of changed lines (block
//! granularity), and recording the fate of every pre-image line it passes.

use std::collections::BTreeMap;

use crate::{EditRecord, Granularity, LineMap};

/// Fate of a pre-image line under an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFate {
    /// The line survives at the given post-image line number.
    Survives(u32),
    /// The line was removed by the modification.
    Removed,
}

/// Result of aligning the two images of a modification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// Partial mapping from pre-image line numbers to their fate.
    ///
    /// Monotone non-decreasing on its surviving domain.
    pub pre_to_post: BTreeMap<u32, LineFate>,
    /// Edits in ascending `pre_start` order, ties broken by `post_start`.
    pub edits: Vec<EditRecord>,
}

/// Number of consecutive keys in `lines` starting at `k`, provided `k` is a
/// block start (`k - 1` absent); zero otherwise.
pub fn block_length(lines: &LineMap, k: u32) -> u32 {
    if k > 1 && lines.contains_key(&(k - 1)) {
        return 0;
    }
    let mut len = 0u32;
    for &line in lines.range(k..).map(|(line, _)| line) {
        if line != k + len {
            break;
        }
        len += 1;
    }
    len
}

/// Align the deleted and added line maps of one modification.
///
/// Returns the pre-to-post line mapping and the edit sequence. Total on
/// well-formed inputs; panics if either map contains a line number of zero
/// (line numbers are 1-based).
pub fn align(deleted: &LineMap, added: &LineMap, granularity: Granularity) -> Alignment {
    assert!(
        !deleted.contains_key(&0) && !added.contains_key(&0),
        "line numbers are 1-based"
    );

    let max_deleted = deleted.keys().next_back().copied();
    let max_added = added.keys().next_back().copied();

    // Lines before the first addition or deletion keep their numbers.
    let start = match deleted
        .keys()
        .next()
        .into_iter()
        .chain(added.keys().next())
        .min()
    {
        Some(&line) => line,
        None => return Alignment::default(),
    };

    let mut alignment = Alignment::default();
    let mut pre = start;
    let mut post = start;

    // Counters matching pre and post line numbers across uneven segments.
    let mut both_inc = 0u32;
    let mut no_post_inc = 0u32;
    let mut no_pre_inc = 0u32;

    let live = |cursor: u32, max: Option<u32>| max.is_some_and(|m| cursor <= m);

    // Lines after the last addition or deletion do not matter for edits.
    while live(pre, max_deleted) || live(post, max_added) {
        match granularity {
            Granularity::Blocks => {
                let num_deleted = block_length(deleted, pre);
                let num_added = block_length(added, post);
                if num_deleted > 0 || num_added > 0 {
                    alignment.edits.push(EditRecord {
                        pre_start: pre,
                        num_deleted,
                        post_start: post,
                        num_added,
                    });
                    both_inc = num_deleted.min(num_added);
                    no_post_inc = num_deleted.saturating_sub(num_added);
                    no_pre_inc = num_added.saturating_sub(num_deleted);
                }
            }
            Granularity::Lines => {
                let in_deleted = deleted.contains_key(&pre);
                let in_added = added.contains_key(&post);
                if in_deleted || in_added {
                    alignment.edits.push(EditRecord {
                        pre_start: pre,
                        num_deleted: u32::from(in_deleted),
                        post_start: post,
                        num_added: u32::from(in_added),
                    });
                }
                if in_deleted && !in_added {
                    no_post_inc += 1;
                }
                if in_added && !in_deleted {
                    no_pre_inc += 1;
                }
            }
        }

        if both_inc > 0 {
            both_inc -= 1;
            alignment.pre_to_post.insert(pre, LineFate::Survives(post));
            pre += 1;
            post += 1;
        } else if no_post_inc > 0 {
            no_post_inc -= 1;
            alignment.pre_to_post.insert(pre, LineFate::Removed);
            pre += 1;
        } else if no_pre_inc > 0 {
            no_pre_inc -= 1;
            post += 1;
        } else {
            // An unchanged surviving line.
            alignment.pre_to_post.insert(pre, LineFate::Survives(post));
            pre += 1;
            post += 1;
        }
    }

    alignment
}
