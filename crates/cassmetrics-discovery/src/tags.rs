//! Tag extraction
//!
//! A resolved namespace has the fixed shape
//! `[intel, cassandra, node, <host>, <domain>, type, <T>, k1, v1, ..., <attribute>]`.
//! Positional pairs become tags and the namespace collapses to five segments:
//! both identity segments, the `type` pair and the attribute.

use cassmetrics_common::Tags;

/// Shortest resolved namespace `extract` accepts
pub const MIN_RESOLVED_LEN: usize = 8;

const NODE_KEY: usize = 2;
const NODE_VALUE: usize = 3;
const TYPE_KEY: usize = 5;
const TYPE_VALUE: usize = 6;
const FIRST_TAG: usize = 7;

/// Split a full resolved namespace into its collapsed namespace and tags.
///
/// Caller tags are merged last and win on key collisions. A trailing key
/// without a value before the attribute is dropped. Expects the full resolved
/// path, not a namespace previously returned by this function; returns `None`
/// for paths shorter than [`MIN_RESOLVED_LEN`].
#[must_use]
pub fn extract<S: AsRef<str>>(resolved: &[S], caller_tags: &Tags) -> Option<(Vec<String>, Tags)> {
    if resolved.len() < MIN_RESOLVED_LEN {
        return None;
    }
    let segment = |i: usize| resolved[i].as_ref().to_string();
    let last = resolved.len() - 1;

    let mut tags = Tags::new();
    tags.insert(segment(NODE_KEY), segment(NODE_VALUE));

    let mut i = FIRST_TAG;
    while i + 1 < last {
        tags.insert(segment(i), segment(i + 1));
        i += 2;
    }

    for (key, value) in caller_tags {
        tags.insert(key.clone(), value.clone());
    }

    let namespace = vec![
        segment(0),
        segment(1),
        segment(TYPE_KEY),
        segment(TYPE_VALUE),
        segment(last),
    ];
    Some((namespace, tags))
}
