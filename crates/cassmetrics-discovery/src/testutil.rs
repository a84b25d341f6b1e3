//! Shared test fixtures

use cassmetrics_common::{AttributeRef, ObjectName};

use crate::builder::bean_path;
use crate::tree::DiscoveryTree;

pub const DOMAIN: &str = "org.apache.cassandra.metrics";

/// Key property lists and attributes of a small Cassandra node
pub const SAMPLE_BEANS: &[(&str, &[&str])] = &[
    ("type=ThreadPools,path=internal,scope=ValidationExecutor,name=MaxPoolSize", &["Value"]),
    ("type=ThreadPools,path=request,scope=ReadStage,name=ActiveTasks", &["Value"]),
    ("type=Keyspace,keyspace=system,name=TombstoneScannedHistogram", &["Max"]),
    ("type=Keyspace,keyspace=system,name=ReadLatency", &["50thPercentile"]),
    ("type=Keyspace,keyspace=system_auth,name=ReadLatency", &["50thPercentile"]),
    ("type=Cache,scope=KeyCache,name=Hits", &["FiveMinuteRate", "FifteenMinuteRate"]),
    ("type=Cache,scope=KeyCache,name=Capacity", &["Value"]),
    ("type=Cache,scope=RowCache,name=Requests", &["FiveMinuteRate"]),
    ("type=Cache,scope=ChunkCache,name=Misses", &["FiveMinuteRate"]),
    ("type=ColumnFamily,keyspace=system,scope=local,name=ReadLatency", &["50thPercentile"]),
    ("type=Storage,name=Load", &["Count"]),
];

/// Tree built from [`SAMPLE_BEANS`]
pub fn sample_tree() -> DiscoveryTree {
    let mut tree = DiscoveryTree::new();
    for (props, attributes) in SAMPLE_BEANS {
        let name = ObjectName::from_key_properties(DOMAIN, props).unwrap();
        for attribute in *attributes {
            let path = bean_path(&name, attribute).unwrap();
            tree.insert(&path, AttributeRef::new(name.to_string(), *attribute));
        }
    }
    tree
}
