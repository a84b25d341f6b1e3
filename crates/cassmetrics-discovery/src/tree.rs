//! Discovery tree
//!
//! Mirrors the managed server's bean hierarchy: domain, `type` and its value,
//! the remaining key property pairs, then one leaf per attribute. Children
//! keep insertion order so enumeration and query results are deterministic.

use cassmetrics_common::AttributeRef;
use serde::{Deserialize, Serialize};

use crate::path::Segment;

/// One level of the bean hierarchy
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryNode {
    key: String,
    children: Vec<DiscoveryNode>,
    leaf: Option<AttributeRef>,
}

impl DiscoveryNode {
    /// Create an empty inner node
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            children: Vec::new(),
            leaf: None,
        }
    }

    /// Literal key at this level
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this node is an addressable attribute
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    /// Attribute carried by a leaf
    #[must_use]
    pub const fn leaf(&self) -> Option<&AttributeRef> {
        self.leaf.as_ref()
    }

    /// Children in insertion order
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Child with the given key
    #[must_use]
    pub fn child(&self, key: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.key == key)
    }

    /// Children matched by one pattern segment, in child order
    #[must_use]
    pub fn descend(&self, segment: &Segment) -> Vec<&Self> {
        match segment {
            Segment::Literal(key) => self.child(key).into_iter().collect(),
            Segment::Wildcard => self.children.iter().collect(),
            Segment::Alternation(_) => self
                .children
                .iter()
                .filter(|c| segment.matches(&c.key))
                .collect(),
        }
    }

    fn child_entry(&mut self, key: &str) -> &mut Self {
        let idx = if let Some(idx) = self.children.iter().position(|c| c.key == key) {
            idx
        } else {
            self.children.push(Self::new(key));
            self.children.len() - 1
        };
        &mut self.children[idx]
    }

    fn collect_leaves<'a>(
        &'a self,
        path: &mut Vec<String>,
        out: &mut Vec<(Vec<String>, &'a AttributeRef)>,
    ) {
        for child in &self.children {
            path.push(child.key.clone());
            if let Some(leaf) = &child.leaf {
                out.push((path.clone(), leaf));
            }
            child.collect_leaves(path, out);
            path.pop();
        }
    }
}

/// Outcome of inserting an attribute path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new leaf was created
    Inserted,
    /// The same path already exists as a leaf
    Duplicate,
    /// The path would turn a leaf into an inner node or vice versa
    Conflict,
    /// The path was empty
    Empty,
}

/// Tree of every discoverable metric on one managed server
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryTree {
    root: DiscoveryNode,
    leaf_count: usize,
}

impl DiscoveryTree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node (its key is empty)
    #[must_use]
    pub const fn root(&self) -> &DiscoveryNode {
        &self.root
    }

    /// Number of leaves
    #[must_use]
    pub const fn len(&self) -> usize {
        self.leaf_count
    }

    /// Whether the tree has no leaves
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Insert an attribute path as a leaf, creating intermediate nodes.
    ///
    /// Nothing is modified unless the outcome is [`InsertOutcome::Inserted`].
    pub fn insert<S: AsRef<str>>(&mut self, path: &[S], target: AttributeRef) -> InsertOutcome {
        let outcome = self.check_insert(path);
        if outcome != InsertOutcome::Inserted {
            return outcome;
        }

        let mut node = &mut self.root;
        for key in path {
            node = node.child_entry(key.as_ref());
        }
        node.leaf = Some(target);
        self.leaf_count += 1;
        InsertOutcome::Inserted
    }

    fn check_insert<S: AsRef<str>>(&self, path: &[S]) -> InsertOutcome {
        if path.is_empty() {
            return InsertOutcome::Empty;
        }

        let mut node = &self.root;
        for (i, key) in path.iter().enumerate() {
            let Some(child) = node.child(key.as_ref()) else {
                return InsertOutcome::Inserted;
            };
            let last = i + 1 == path.len();
            if last {
                return if child.is_leaf() {
                    InsertOutcome::Duplicate
                } else {
                    InsertOutcome::Conflict
                };
            }
            if child.is_leaf() {
                return InsertOutcome::Conflict;
            }
            node = child;
        }
        InsertOutcome::Conflict
    }

    /// Leaf at an exact literal path
    #[must_use]
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&AttributeRef> {
        let mut node = &self.root;
        for key in path {
            node = node.child(key.as_ref())?;
        }
        node.leaf()
    }

    /// Every leaf with its path, depth-first in insertion order
    #[must_use]
    pub fn leaves(&self) -> Vec<(Vec<String>, &AttributeRef)> {
        let mut out = Vec::with_capacity(self.leaf_count);
        self.root.collect_leaves(&mut Vec::new(), &mut out);
        out
    }
}
