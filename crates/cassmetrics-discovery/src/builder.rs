//! Discovery tree construction
//!
//! The builder asks the managed server for every bean under the configured
//! domains and inserts one leaf per attribute. Beans become paths of the form
//! `[domain, "type", T, k1, v1, ..., "name", N, attribute]`: `type` is hoisted
//! to the front and `name` moved to the end so every branch reads the same way
//! regardless of the order the bridge reports properties in.

use std::sync::Arc;
use std::time::Instant;

use cassmetrics_common::{AttributeRef, MetricSource, ObjectName, Result};
use tracing::{debug, info, warn};

use crate::cache::TreeCache;
use crate::path::SEPARATOR;
use crate::tree::{DiscoveryTree, InsertOutcome};

const TYPE_KEY: &str = "type";
const NAME_KEY: &str = "name";

/// Tree path for one bean attribute.
///
/// Returns `None` for beans without a `type` property and for keys or values
/// that are empty or contain the namespace separator.
#[must_use]
pub fn bean_path(name: &ObjectName, attribute: &str) -> Option<Vec<String>> {
    let addressable = |s: &str| !s.is_empty() && !s.contains(SEPARATOR);

    let type_value = name.property(TYPE_KEY)?;
    let mut path = vec![
        name.domain.clone(),
        TYPE_KEY.to_string(),
        type_value.to_string(),
    ];

    for (key, value) in &name.properties {
        if key == TYPE_KEY || key == NAME_KEY {
            continue;
        }
        path.push(key.clone());
        path.push(value.clone());
    }

    if let Some(metric) = name.property(NAME_KEY) {
        path.push(NAME_KEY.to_string());
        path.push(metric.to_string());
    }
    path.push(attribute.to_string());

    path.iter().all(|s| addressable(s)).then_some(path)
}

/// Builds discovery trees from a metric source
pub struct TreeBuilder {
    source: Arc<dyn MetricSource>,
    domains: Vec<String>,
}

impl TreeBuilder {
    /// Create a builder enumerating the given domains
    pub fn new(source: Arc<dyn MetricSource>, domains: Vec<String>) -> Self {
        Self { source, domains }
    }

    /// Enumerate the managed server and build a fresh tree
    pub async fn build(&self) -> Result<DiscoveryTree> {
        let started = Instant::now();
        let mut tree = DiscoveryTree::new();
        let mut skipped = 0usize;

        for domain in &self.domains {
            let beans = self.source.list(domain).await?;
            debug!(domain = %domain, beans = beans.len(), "Enumerated domain");

            for bean in beans {
                let mbean = bean.name.to_string();
                for attribute in bean.attributes {
                    let Some(path) = bean_path(&bean.name, &attribute.name) else {
                        debug!(mbean = %mbean, attribute = %attribute.name, "Skipping unaddressable attribute");
                        skipped += 1;
                        continue;
                    };

                    let mut target = AttributeRef::new(mbean.clone(), attribute.name);
                    if let Some(java_type) = attribute.java_type {
                        target = target.with_java_type(java_type);
                    }

                    match tree.insert(&path, target) {
                        InsertOutcome::Inserted => {}
                        outcome => {
                            warn!(mbean = %mbean, ?outcome, "Attribute path rejected by discovery tree");
                            skipped += 1;
                        }
                    }
                }
            }
        }

        info!(
            source = self.source.name(),
            leaves = tree.len(),
            skipped,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Built discovery tree"
        );
        Ok(tree)
    }

    /// Reuse a cached tree when one is valid, otherwise build and store one.
    ///
    /// Cache failures never fail the call: an unreadable snapshot means a
    /// rebuild and an unwritable one only costs a rebuild next time.
    pub async fn load_or_build(&self, cache: &dyn TreeCache) -> Result<DiscoveryTree> {
        match cache.load() {
            Ok(Some(tree)) if !tree.is_empty() => {
                info!(leaves = tree.len(), "Loaded discovery tree from cache");
                return Ok(tree);
            }
            Ok(_) => debug!("No cached discovery tree"),
            Err(e) => warn!("Ignoring unusable tree cache: {}", e),
        }

        let tree = self.build().await?;
        if tree.is_empty() {
            warn!("Managed server exposed no metrics; not caching empty tree");
        } else if let Err(e) = cache.save(&tree) {
            warn!("Failed to cache discovery tree: {}", e);
        }
        Ok(tree)
    }
}
