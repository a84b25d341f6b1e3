//! Metric collector
//!
//! The collector is the entry point the host talks to. It validates the
//! option map, builds the client for the managed server once and then
//! serves every collection and discovery call from the same tree.

use std::sync::Arc;

use cassmetrics_client::JolokiaClient;
use cassmetrics_common::config::{config_policy, ConfigRule};
use cassmetrics_common::{
    ConfigMap, ConnectionConfig, MetricDescriptor, MetricRequest, MetricSource, Result,
    ResultRecord,
};
use cassmetrics_discovery::{FileTreeCache, NoCache, TreeCache};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::client::CassClient;

/// Creates the metric source for a validated connection
pub type SourceFactory =
    Box<dyn Fn(&ConnectionConfig) -> Result<Arc<dyn MetricSource>> + Send + Sync>;

/// Cassandra metric collector
pub struct Collector {
    client: OnceCell<CassClient>,
    source_factory: SourceFactory,
    cache: Option<Arc<dyn TreeCache>>,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    /// Collector talking to the managed server over Jolokia
    #[must_use]
    pub fn new() -> Self {
        Self::with_source_factory(|config| {
            let client = JolokiaClient::new(config)?;
            Ok(Arc::new(client) as Arc<dyn MetricSource>)
        })
    }

    /// Collector using a custom metric source
    pub fn with_source_factory<F>(factory: F) -> Self
    where
        F: Fn(&ConnectionConfig) -> Result<Arc<dyn MetricSource>> + Send + Sync + 'static,
    {
        Self {
            client: OnceCell::new(),
            source_factory: Box::new(factory),
            cache: None,
        }
    }

    /// Use an explicit tree cache instead of the one derived from `cache_dir`
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn TreeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn cache_for(&self, config: &ConnectionConfig) -> Arc<dyn TreeCache> {
        if let Some(cache) = &self.cache {
            return Arc::clone(cache);
        }
        match &config.cache_dir {
            Some(dir) => Arc::new(FileTreeCache::for_server(dir, &config.cache_key())),
            None => Arc::new(NoCache),
        }
    }

    /// Client for the managed server, built on first use.
    ///
    /// Options are only read by the call that builds the client. A failed
    /// build leaves nothing behind, so the next call tries again.
    async fn client(&self, options: &ConfigMap) -> Result<&CassClient> {
        self.client
            .get_or_try_init(|| async {
                let config = ConnectionConfig::from_options(options)?;
                info!(
                    endpoint = %config.endpoint,
                    hostname = %config.hostname,
                    "Initializing Cassandra client"
                );
                let source = (self.source_factory)(&config)?;
                let cache = self.cache_for(&config);
                CassClient::connect(config, source, cache.as_ref()).await
            })
            .await
    }

    /// Collect every requested metric.
    ///
    /// Patterns that resolve to nothing contribute no records. Configuration
    /// and connectivity errors fail the whole call.
    pub async fn collect_metrics(
        &self,
        requests: &[MetricRequest],
        options: &ConfigMap,
    ) -> Result<Vec<ResultRecord>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client(options).await?;

        let mut records = Vec::new();
        for request in requests {
            records.extend(client.fetch(request).await?);
        }
        debug!(requests = requests.len(), records = records.len(), "Collected metrics");
        Ok(records)
    }

    /// Every metric the managed server exposes
    pub async fn get_metric_types(&self, options: &ConfigMap) -> Result<Vec<MetricDescriptor>> {
        let client = self.client(options).await?;
        Ok(client.metric_types())
    }

    /// Options accepted by [`collect_metrics`](Self::collect_metrics)
    #[must_use]
    pub fn get_config_policy(&self) -> Vec<ConfigRule> {
        config_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cassmetrics_common::{
        AttributeInfo, AttributeRef, BeanInfo, Error, MetricValue, ObjectName, Tags,
    };
    use cassmetrics_discovery::MemoryTreeCache;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::tempdir;

    const DOMAIN: &str = "org.apache.cassandra.metrics";

    const BEANS: &[(&str, &[&str])] = &[
        ("type=ThreadPools,path=internal,scope=ValidationExecutor,name=MaxPoolSize", &["Value"]),
        ("type=Cache,scope=KeyCache,name=Hits", &["FiveMinuteRate", "FifteenMinuteRate", "OneMinuteRate"]),
        ("type=Cache,scope=RowCache,name=Hits", &["FiveMinuteRate", "FifteenMinuteRate"]),
        ("type=Cache,scope=CounterCache,name=Hits", &["FiveMinuteRate"]),
        ("type=Keyspace,keyspace=system_auth,name=ReadLatency", &["90thPercentile", "Histogram"]),
    ];

    #[derive(Default)]
    struct FakeSource {
        lists: AtomicUsize,
        reads: AtomicUsize,
        fail_list: AtomicBool,
    }

    #[async_trait]
    impl MetricSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn list(&self, domain: &str) -> Result<Vec<BeanInfo>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(Error::connection_failed("connection refused"));
            }
            Ok(BEANS
                .iter()
                .map(|(props, attributes)| BeanInfo {
                    name: ObjectName::from_key_properties(domain, props).unwrap(),
                    attributes: attributes
                        .iter()
                        .map(|a| AttributeInfo {
                            name: (*a).to_string(),
                            java_type: Some("double".to_string()),
                        })
                        .collect(),
                })
                .collect())
        }

        async fn read(&self, targets: &[AttributeRef]) -> Result<Vec<Option<MetricValue>>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(targets
                .iter()
                .map(|t| match t.attribute.as_str() {
                    "Value" => Some(MetricValue::Int(32)),
                    "Histogram" => None,
                    _ => Some(MetricValue::Float(0.5)),
                })
                .collect())
        }
    }

    fn collector_with(source: &Arc<FakeSource>) -> Collector {
        let source = Arc::clone(source);
        Collector::with_source_factory(move |_| Ok(Arc::clone(&source) as Arc<dyn MetricSource>))
    }

    fn options() -> ConfigMap {
        let mut options = ConfigMap::new();
        options.insert("url".into(), "cass-1".into());
        options.insert("hostname".into(), "h1".into());
        options.insert("port".into(), 8778_i64.into());
        options
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_collect_thread_pool_metric() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source);
        let requests = [MetricRequest::new(
            "/intel/cassandra/node/h1/org_apache_cassandra_metrics/type/ThreadPools/path/internal/scope/ValidationExecutor/name/MaxPoolSize/Value",
        )];

        let records = collector.collect_metrics(&requests, &options()).await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.namespace, vec!["intel", "cassandra", "type", "ThreadPools", "Value"]);
        assert_eq!(
            record.tags,
            tags(&[
                ("node", "h1"),
                ("path", "internal"),
                ("scope", "ValidationExecutor"),
                ("name", "MaxPoolSize"),
            ])
        );
        assert_eq!(record.value, MetricValue::Int(32));
        assert_eq!(record.unit, "i64");
    }

    #[tokio::test]
    async fn test_collect_wildcard_and_alternation() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source);
        let requests = [MetricRequest::new(
            "/intel/cassandra/node/h1/org_apache_cassandra_metrics/type/*/scope/KeyCache|RowCache/name/*/FiveMinuteRate|FifteenMinuteRate",
        )];

        let records = collector.collect_metrics(&requests, &options()).await.unwrap();
        let found: Vec<(String, String)> = records
            .iter()
            .map(|r| (r.tags["scope"].clone(), r.namespace[4].clone()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("KeyCache".to_string(), "FiveMinuteRate".to_string()),
                ("KeyCache".to_string(), "FifteenMinuteRate".to_string()),
                ("RowCache".to_string(), "FiveMinuteRate".to_string()),
                ("RowCache".to_string(), "FifteenMinuteRate".to_string()),
            ]
        );
        assert!(records.iter().all(|r| r.namespace[..4] == ["intel", "cassandra", "type", "Cache"]));
        assert!(records.iter().all(|r| r.unit == "f64"));
    }

    #[tokio::test]
    async fn test_builds_tree_once() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source);
        let requests = [MetricRequest::new(
            "/intel/cassandra/node/h1/org_apache_cassandra_metrics/type/Cache/scope/*/name/Hits/OneMinuteRate",
        )];

        let opts = options();
        let (a, b) = tokio::join!(
            collector.collect_metrics(&requests, &opts),
            collector.collect_metrics(&requests, &opts),
        );
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        collector.collect_metrics(&requests, &options()).await.unwrap();
        collector.get_metric_types(&options()).await.unwrap();

        assert_eq!(source.lists.load(Ordering::SeqCst), 1);
        assert_eq!(source.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_configuration_error_before_any_request() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source);
        let requests = [MetricRequest::new("/intel/cassandra/node/h1/x")];

        let mut missing_host = options();
        missing_host.remove("hostname");
        let err = collector.collect_metrics(&requests, &missing_host).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let mut bad_url = options();
        bad_url.insert("url".into(), "ftp://cass-1".into());
        let err = collector.get_metric_types(&bad_url).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        assert_eq!(source.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_build_is_retried() {
        let source = Arc::new(FakeSource::default());
        source.fail_list.store(true, Ordering::SeqCst);
        let collector = collector_with(&source);

        let err = collector.get_metric_types(&options()).await.unwrap_err();
        assert!(err.is_retryable());

        source.fail_list.store(false, Ordering::SeqCst);
        let types = collector.get_metric_types(&options()).await.unwrap();
        assert_eq!(types.len(), 9);
        assert_eq!(source.lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unmatched_namespaces_are_empty() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source);
        let requests = [
            MetricRequest::new(""),
            MetricRequest::new("/intel/cassandra/node/h2/org_apache_cassandra_metrics/type/ThreadPools/path/internal/scope/ValidationExecutor/name/MaxPoolSize/Value"),
            MetricRequest::new("/intel/cassandra/node/h1/org_apache_cassandra_metrics/type1/Keyspace/keyspace/system_auth/name/ReadLatency/90thPercentile"),
            MetricRequest::new("/intel/cassandra/node/h1/org_apache_cassandra_metrics/type/abc"),
        ];

        let records = collector.collect_metrics(&requests, &options()).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);

        assert!(collector.collect_metrics(&[], &options()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_pattern_leaves_others_intact() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source);
        let requests = [
            MetricRequest::new(
                "/intel/cassandra/node/h1/org_apache_cassandra_metrics/type/ThreadPools/path/internal/scope/ValidationExecutor/name/MaxPoolSize/Value",
            ),
            MetricRequest::new("/bad"),
            MetricRequest::new(
                "/intel/cassandra/node/h1/org_apache_cassandra_metrics/type/Cache/scope/*/name/Hits/FifteenMinuteRate",
            ),
        ];

        let records = collector.collect_metrics(&requests, &options()).await.unwrap();
        let found: Vec<String> = records
            .iter()
            .map(|r| format!("{}:{}", r.namespace[3], r.namespace[4]))
            .collect();
        assert_eq!(
            found,
            vec![
                "ThreadPools:Value",
                "Cache:FifteenMinuteRate",
                "Cache:FifteenMinuteRate",
            ]
        );
        assert_eq!(records[1].tags["scope"], "KeyCache");
        assert_eq!(records[2].tags["scope"], "RowCache");
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreadable_leaf_skipped_and_caller_tags_win() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source);
        let requests = [MetricRequest::new(
            "/intel/cassandra/node/*/org_apache_cassandra_metrics/type/Keyspace/keyspace/system_auth/name/ReadLatency/*",
        )
        .with_tag("keyspace", "override")
        .with_tag("dc", "east")];

        let records = collector.collect_metrics(&requests, &options()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].namespace[4], "90thPercentile");
        assert_eq!(records[0].tags["keyspace"], "override");
        assert_eq!(records[0].tags["dc"], "east");
        assert_eq!(records[0].tags["node"], "h1");
    }

    #[tokio::test]
    async fn test_metric_types_use_external_names() {
        let source = Arc::new(FakeSource::default());
        let collector = collector_with(&source).with_cache(Arc::new(MemoryTreeCache::new()));

        let types = collector.get_metric_types(&options()).await.unwrap();
        assert_eq!(types.len(), 9);
        assert_eq!(
            types[0].namespace.join("/"),
            "intel/cassandra/node/h1/org_apache_cassandra_metrics/type/ThreadPools/path/internal/scope/ValidationExecutor/name/MaxPoolSize/Value"
        );
        assert_eq!(types[0].java_type.as_deref(), Some("double"));
        assert!(types.iter().any(|t| t.namespace.contains(&"system_auth".to_string())));
    }

    #[tokio::test]
    async fn test_file_cache_serves_later_collectors() {
        let dir = tempdir().unwrap();
        let mut opts = options();
        opts.insert("cache_dir".into(), dir.path().to_string_lossy().into_owned().into());

        let source = Arc::new(FakeSource::default());
        let first = collector_with(&source);
        first.get_metric_types(&opts).await.unwrap();
        assert!(dir.path().join("cass-1_8778.tree").exists());

        let offline = Arc::new(FakeSource::default());
        offline.fail_list.store(true, Ordering::SeqCst);
        let second = collector_with(&offline);
        assert_eq!(second.get_metric_types(&opts).await.unwrap().len(), 9);
        assert_eq!(offline.lists.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_config_policy() {
        let policy = Collector::new().get_config_policy();
        let required: Vec<_> = policy.iter().filter(|r| r.required).map(|r| r.key).collect();
        assert_eq!(required, vec!["url", "hostname", "port"]);
    }
}
