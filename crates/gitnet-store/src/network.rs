//! Collaboration networks projected from the store.
//!
//! The co-editing and author-DAG projections share one join shape: each
//! edit with provenance is joined to the commit rows of its `pre_commit`
//! and `post_commit`, matching hashes by 8-character prefix (blame reports
//! abbreviated hashes). The projections differ only in how they key their
//! nodes.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::NaiveDateTime;

use crate::{Result, Store, StoreError};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inclusive time window restricting projected edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindow {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl TimeWindow {
    /// Window covering all times.
    pub fn all() -> Self {
        TimeWindow::default()
    }

    fn contains(&self, time: NaiveDateTime) -> bool {
        self.from.map_or(true, |from| time >= from) && self.to.map_or(true, |to| time <= to)
    }
}

/// Directed temporal edge from the author of a removed line to the author
/// of the commit that removed or replaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CoeditingEdge {
    /// Email of the author whose line was removed.
    pub source: String,
    /// Email of the author who removed it.
    pub target: String,
    pub time: NaiveDateTime,
    pub levenshtein_dist: Option<i64>,
}

/// Edge between an author and a file they modified.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BipartiteEdge {
    /// Author name.
    pub source: String,
    /// File name.
    pub target: String,
    pub time: NaiveDateTime,
}

/// Edge of the author DAG; nodes are `"{author},{hash8}"` pairs, so an
/// author's successive incarnations across commits stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DagEdge {
    pub source: String,
    pub target: String,
    pub time: NaiveDateTime,
}

/// Result of the shared edit-to-authors join.
struct EditAuthorRow {
    pre_author: String,
    pre_commit: String,
    post_author: String,
    post_commit: String,
    time: NaiveDateTime,
    levenshtein_dist: Option<i64>,
}

impl Store {
    fn edit_author_rows(&self) -> Result<Vec<EditAuthorRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT c_pre.author_email, \
                    substr(edits.pre_commit, 1, 8), \
                    c_post.author_email, \
                    substr(edits.post_commit, 1, 8), \
                    c_post.committer_date, \
                    edits.levenshtein_dist \
             FROM edits \
             JOIN commits AS c_pre \
               ON substr(c_pre.hash, 1, 8) = substr(edits.pre_commit, 1, 8) \
             JOIN commits AS c_post \
               ON substr(c_post.hash, 1, 8) = substr(edits.post_commit, 1, 8) \
             WHERE edits.pre_commit IS NOT NULL",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(pre_author, pre_commit, post_author, post_commit, time, levenshtein_dist)| {
                Ok(EditAuthorRow {
                    pre_author,
                    pre_commit,
                    post_author,
                    post_commit,
                    time: parse_time(&time)?,
                    levenshtein_dist,
                })
            })
            .collect()
    }

    /// Temporal co-editing edges between author emails.
    ///
    /// Self-edges (an author removing their own line) are dropped.
    pub fn coediting_edges(&self, window: TimeWindow) -> Result<Vec<CoeditingEdge>> {
        Ok(self
            .edit_author_rows()?
            .into_iter()
            .filter(|row| row.pre_author != row.post_author && window.contains(row.time))
            .map(|row| CoeditingEdge {
                source: row.pre_author,
                target: row.post_author,
                time: row.time,
                levenshtein_dist: row.levenshtein_dist,
            })
            .collect())
    }

    /// Distinct author-name-to-file edges.
    pub fn bipartite_edges(&self, window: TimeWindow) -> Result<Vec<BipartiteEdge>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT commits.author_name, edits.mod_filename, commits.committer_date \
             FROM edits \
             JOIN commits ON edits.post_commit = commits.hash",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut edges = Vec::new();
        for (source, target, time) in raw {
            let time = parse_time(&time)?;
            if window.contains(time) {
                edges.push(BipartiteEdge { source, target, time });
            }
        }
        Ok(edges)
    }

    /// Distinct author-DAG edges keyed by `"{author},{hash8}"`.
    pub fn dag_edges(&self, window: TimeWindow) -> Result<Vec<DagEdge>> {
        let mut distinct = BTreeSet::new();
        for row in self.edit_author_rows()? {
            if row.pre_author == row.post_author || !window.contains(row.time) {
                continue;
            }
            distinct.insert(DagEdge {
                source: format!("{},{}", row.pre_author, row.pre_commit),
                target: format!("{},{}", row.post_author, row.post_commit),
                time: row.time,
            });
        }
        Ok(distinct.into_iter().collect())
    }

    /// The author DAG, topologically sorted after load.
    pub fn author_dag(&self, window: TimeWindow) -> Result<AuthorDag> {
        AuthorDag::from_edges(self.dag_edges(window)?)
    }
}

/// Influence graph among commit-author pairs.
#[derive(Debug, Clone)]
pub struct AuthorDag {
    edges: Vec<DagEdge>,
    order: Vec<String>,
}

impl AuthorDag {
    /// Build the graph and compute its topological order; fails if the
    /// edges contain a cycle.
    pub fn from_edges(edges: Vec<DagEdge>) -> Result<AuthorDag> {
        let order = topological_order(&edges)?;
        Ok(AuthorDag { edges, order })
    }

    pub fn edges(&self) -> &[DagEdge] {
        &self.edges
    }

    /// Nodes in a topological order (ties resolved lexicographically).
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

fn topological_order(edges: &[DagEdge]) -> Result<Vec<String>> {
    let mut successors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in edges {
        indegree.entry(edge.source.as_str()).or_insert(0);
        *indegree.entry(edge.target.as_str()).or_insert(0) += 1;
        successors.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
    }

    let mut ready: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&node, _)| node)
        .collect();
    let mut order = Vec::with_capacity(indegree.len());

    while let Some(node) = ready.pop_front() {
        order.push(node.to_string());
        for &next in successors.get(node).into_iter().flatten() {
            let degree = indegree.get_mut(next).expect("target seen in indegree map");
            *degree -= 1;
            if *degree == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() != indegree.len() {
        return Err(StoreError::Cycle);
    }
    Ok(order)
}

fn parse_time(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| StoreError::Timestamp(text.to_string()))
}
