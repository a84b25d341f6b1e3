//! cassmetrics discovery - metric tree and namespace queries
//!
//! This crate mirrors the managed server's bean hierarchy as a
//! [`DiscoveryTree`], resolves caller namespace patterns against it and turns
//! resolved paths into tagged, collapsed namespaces.

pub mod builder;
pub mod cache;
pub mod path;
pub mod query;
pub mod tags;
pub mod tree;

#[cfg(test)]
mod testutil;

pub use builder::{bean_path, TreeBuilder};
pub use cache::{FileTreeCache, MemoryTreeCache, NoCache, TreeCache};
pub use path::Segment;
pub use query::{query, query_namespace, QueryMatch};
pub use tags::extract;
pub use tree::{DiscoveryNode, DiscoveryTree, InsertOutcome};
