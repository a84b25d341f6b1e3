//! Connected client for one managed server

use std::sync::Arc;

use cassmetrics_common::{
    AttributeRef, ConnectionConfig, MetricDescriptor, MetricRequest, MetricSource, Result,
    ResultRecord,
};
use cassmetrics_discovery::path::{self, DOMAIN_INDEX};
use cassmetrics_discovery::{extract, query_namespace, DiscoveryTree, TreeBuilder, TreeCache};
use chrono::Utc;
use tracing::{debug, warn};

/// A managed server together with its discovery tree
pub struct CassClient {
    config: ConnectionConfig,
    source: Arc<dyn MetricSource>,
    tree: Arc<DiscoveryTree>,
}

impl CassClient {
    /// Load the tree from `cache` or enumerate the server to build it
    pub async fn connect(
        config: ConnectionConfig,
        source: Arc<dyn MetricSource>,
        cache: &dyn TreeCache,
    ) -> Result<Self> {
        let builder = TreeBuilder::new(Arc::clone(&source), config.domains.clone());
        let tree = builder.load_or_build(cache).await?;
        Ok(Self {
            config,
            source,
            tree: Arc::new(tree),
        })
    }

    /// Resolve one request and read every matched attribute
    pub async fn fetch(&self, request: &MetricRequest) -> Result<Vec<ResultRecord>> {
        let segments = path::decode(&request.namespace);
        let matches = query_namespace(&self.tree, &self.config.hostname, &segments);
        debug!(namespace = %request.namespace, matches = matches.len(), "Resolved namespace");
        if matches.is_empty() {
            return Ok(Vec::new());
        }

        let targets: Vec<AttributeRef> = matches.iter().map(|m| m.target.clone()).collect();
        let values = self.source.read(&targets).await?;
        let timestamp = Utc::now();
        let prefix = path::prefix(&self.config.hostname);

        let mut records = Vec::with_capacity(matches.len());
        for (matched, value) in matches.iter().zip(values) {
            let Some(value) = value else {
                warn!(
                    mbean = %matched.target.mbean,
                    attribute = %matched.target.attribute,
                    "Skipping unreadable attribute"
                );
                continue;
            };

            let resolved: Vec<&str> = prefix
                .iter()
                .chain(&matched.path)
                .map(String::as_str)
                .collect();
            let Some((namespace, tags)) = extract(&resolved, &request.tags) else {
                debug!(path = ?matched.path, "Path too short to tag");
                continue;
            };

            records.push(ResultRecord {
                namespace,
                tags,
                unit: value.type_name().to_string(),
                value,
                timestamp,
            });
        }
        Ok(records)
    }

    /// Every discoverable metric in external namespace form
    #[must_use]
    pub fn metric_types(&self) -> Vec<MetricDescriptor> {
        let prefix = path::prefix(&self.config.hostname);
        self.tree
            .leaves()
            .into_iter()
            .map(|(leaf_path, target)| {
                let mut namespace = prefix.clone();
                namespace.extend(leaf_path);
                if let Some(domain) = namespace.get_mut(DOMAIN_INDEX) {
                    *domain = path::to_external_name(domain);
                }
                MetricDescriptor {
                    namespace,
                    java_type: target.java_type.clone(),
                }
            })
            .collect()
    }
}
