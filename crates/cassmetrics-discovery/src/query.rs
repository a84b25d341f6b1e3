//! Namespace query engine
//!
//! Patterns are resolved depth-first against the discovery tree, one segment
//! per level. A branch only produces a match when the pattern runs out
//! exactly on a leaf; shorter or longer patterns simply do not match there.

use cassmetrics_common::AttributeRef;

use crate::path::{parse_pattern, Segment, NODE, PLUGIN, PREFIX_LEN, VENDOR};
use crate::tree::{DiscoveryNode, DiscoveryTree};

/// Minimum number of tree segments a namespace must carry after its prefix
pub const MIN_TREE_SEGMENTS: usize = 5;

/// One resolved leaf
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryMatch<'a> {
    /// Concrete tree path (domain first)
    pub path: Vec<String>,
    /// Attribute to fetch for this leaf
    pub target: &'a AttributeRef,
}

/// Resolve a parsed pattern against the tree.
///
/// Results come back in the order branches are discovered, which follows the
/// tree's child insertion order.
#[must_use]
pub fn query<'a>(tree: &'a DiscoveryTree, pattern: &[Segment]) -> Vec<QueryMatch<'a>> {
    let mut matches = Vec::new();
    if pattern.is_empty() {
        return matches;
    }
    let mut path = Vec::with_capacity(pattern.len());
    walk(tree.root(), pattern, &mut path, &mut matches);
    matches
}

fn walk<'a>(
    node: &'a DiscoveryNode,
    pattern: &[Segment],
    path: &mut Vec<String>,
    matches: &mut Vec<QueryMatch<'a>>,
) {
    let Some((segment, rest)) = pattern.split_first() else {
        return;
    };

    for child in node.descend(segment) {
        path.push(child.key().to_string());
        if rest.is_empty() {
            if let Some(target) = child.leaf() {
                matches.push(QueryMatch {
                    path: path.clone(),
                    target,
                });
            }
        } else {
            walk(child, rest, path, matches);
        }
        path.pop();
    }
}

/// Resolve a decoded caller namespace for the given node identity.
///
/// The namespace must start with `intel/cassandra/node/<host>`, where the host
/// segment may also be `*` or an alternation naming this host. Anything else,
/// including namespaces too short to reach a leaf, yields no matches.
#[must_use]
pub fn query_namespace<'a, S: AsRef<str>>(
    tree: &'a DiscoveryTree,
    host: &str,
    segments: &[S],
) -> Vec<QueryMatch<'a>> {
    if segments.len() < PREFIX_LEN + MIN_TREE_SEGMENTS {
        return Vec::new();
    }

    let (prefix, rest) = segments.split_at(PREFIX_LEN);
    let prefix_ok = prefix[0].as_ref() == VENDOR
        && prefix[1].as_ref() == PLUGIN
        && prefix[2].as_ref() == NODE
        && Segment::parse(prefix[3].as_ref()).matches(host);
    if !prefix_ok {
        return Vec::new();
    }

    query(tree, &parse_pattern(rest))
}
