//! Bulk-matching strategies for default-constraint routes.
//!
//! Routes whose symbols all keep the default constraint and whose pattern is
//! anchored can be looked up in bulk instead of scanned linearly. The
//! strategy is pluggable: [`BulkMatcher`] is the contract, and the router
//! ships a prefix-partitioned implementation plus a plain scan. Both return
//! route back-references (memos) read off the patterns' terminal nodes, and
//! both confirm with the route's own compiled regex, so the two strategies
//! are interchangeable for correctness — only lookup cost differs.

use std::collections::HashMap;

use regex::Regex;

use crate::nodes::Node;
use crate::route::pattern::Ast;
use crate::route::Route;

/// Bulk prefix matcher over the default-constraint, anchored routes.
pub trait BulkMatcher: Send + Sync {
    /// Route memos whose pattern matches `path`.
    fn memos(&self, path: &str) -> Vec<usize>;
}

/// Partitions routes by their leading literal path segment.
///
/// Lookup hashes the request path's first segment to a bucket and only
/// confirms the regexes in that bucket; routes that do not start with a
/// plain literal segment (e.g. `/:id`, `/*path`) live in a fallback list
/// checked on every lookup.
#[derive(Debug, Default)]
pub struct PrefixPartition {
    buckets: HashMap<String, Vec<(usize, Regex)>>,
    fallback: Vec<(usize, Regex)>,
}

impl PrefixPartition {
    /// Builds the partition from every default-constraint, anchored route.
    pub fn build(routes: &[Route]) -> Self {
        let mut partition = PrefixPartition::default();

        for route in routes {
            if !eligible(route) {
                continue;
            }
            let Some(memo) = route.pattern().ast().memo() else {
                continue;
            };
            let entry = (memo, route.pattern().regex().clone());
            match leading_literal(route.pattern().ast()) {
                Some(segment) => partition.buckets.entry(segment).or_default().push(entry),
                None => partition.fallback.push(entry),
            }
        }

        tracing::debug!(
            buckets = partition.buckets.len(),
            fallback = partition.fallback.len(),
            "built prefix partition"
        );
        partition
    }
}

impl BulkMatcher for PrefixPartition {
    fn memos(&self, path: &str) -> Vec<usize> {
        let segment = first_segment(path);
        let mut memos = Vec::new();
        if let Some(bucket) = self.buckets.get(segment) {
            for (memo, regex) in bucket {
                if regex.is_match(path) {
                    memos.push(*memo);
                }
            }
        }
        for (memo, regex) in &self.fallback {
            if regex.is_match(path) {
                memos.push(*memo);
            }
        }
        memos
    }
}

/// Degenerate strategy: confirm every eligible route on every lookup.
///
/// Exists as the reference implementation the partition must agree with,
/// and as a sane choice for tiny route sets.
#[derive(Debug, Default)]
pub struct LinearScan {
    entries: Vec<(usize, Regex)>,
}

impl LinearScan {
    pub fn build(routes: &[Route]) -> Self {
        let entries = routes
            .iter()
            .filter(|r| eligible(r))
            .filter_map(|r| {
                r.pattern()
                    .ast()
                    .memo()
                    .map(|memo| (memo, r.pattern().regex().clone()))
            })
            .collect();
        LinearScan { entries }
    }
}

impl BulkMatcher for LinearScan {
    fn memos(&self, path: &str) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|(_, regex)| regex.is_match(path))
            .map(|(memo, _)| *memo)
            .collect()
    }
}

/// Whether a route belongs to the bulk channel rather than the custom scan.
///
/// Besides being anchored and all-default, the route must have a terminal
/// carrying its back-reference; a pattern with no terminals (empty pattern)
/// has nothing a bulk lookup could return, so it stays on the scan.
pub(crate) fn eligible(route: &Route) -> bool {
    route.pattern().anchored()
        && route.pattern().ast().all_default_regexp()
        && route.pattern().ast().memo().is_some()
}

/// The leading literal segment of a pattern, read off the tree.
///
/// `/users/:id` partitions under `users`; `/:id` and `/*path` have none.
/// Only the one unambiguous shape gets a bucket: a root concatenation whose
/// left is `/` and whose right begins with a literal. Anything else — a root
/// alternation in particular, where no single segment covers every branch —
/// goes to the fallback list.
fn leading_literal(ast: &Ast) -> Option<String> {
    let arena = ast.arena();
    let Node::Cat { left, right } = arena.get(ast.root()) else {
        return None;
    };
    if !matches!(arena.get(*left), Node::Slash { .. }) {
        return None;
    }
    let first = match arena.get(*right) {
        Node::Cat { left, .. } => *left,
        _ => *right,
    };
    match arena.get(first) {
        // Literal tokens never contain `/`, `.` or `(`, so the text is
        // already a whole segment.
        Node::Literal { text, .. } => Some(text.clone()),
        _ => None,
    }
}

/// First segment of a request path, cut at the `/` and `.` boundaries a
/// bucketed pattern's literal cannot cross.
fn first_segment(path: &str) -> &str {
    let rest = path.strip_prefix('/').unwrap_or(path);
    let end = rest
        .find(|c| matches!(c, '/' | '.'))
        .unwrap_or(rest.len());
    &rest[..end]
}
