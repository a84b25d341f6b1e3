//! Core types for cassmetrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Caller-supplied tag map
pub type Tags = BTreeMap<String, String>;

/// JMX object name: a domain plus ordered key properties
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectName {
    /// Domain (e.g. "org.apache.cassandra.metrics")
    pub domain: String,
    /// Key properties in registration order
    pub properties: Vec<(String, String)>,
}

impl ObjectName {
    /// Create an object name from a domain and a key property list string
    /// such as `type=Cache,scope=KeyCache,name=Hits`.
    ///
    /// Quoted values may contain commas. Returns `None` when the list is empty
    /// or a property has no `=`.
    #[must_use]
    pub fn from_key_properties(domain: &str, key_properties: &str) -> Option<Self> {
        let mut properties = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut escaped = false;

        for c in key_properties.chars() {
            match c {
                _ if escaped => {
                    current.push(c);
                    escaped = false;
                }
                '\\' if in_quotes => {
                    current.push(c);
                    escaped = true;
                }
                '"' => {
                    current.push(c);
                    in_quotes = !in_quotes;
                }
                ',' if !in_quotes => {
                    properties.push(split_property(&current)?);
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        if !current.is_empty() {
            properties.push(split_property(&current)?);
        }

        if properties.is_empty() {
            return None;
        }

        Some(Self {
            domain: domain.to_string(),
            properties,
        })
    }

    /// Parse a full `domain:key=value,...` object name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let (domain, props) = name.split_once(':')?;
        Self::from_key_properties(domain, props)
    }

    /// Value of a key property
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn split_property(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (k, v)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Address of one fetchable attribute on the managed server
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    /// Full object name of the bean
    pub mbean: String,
    /// Attribute name
    pub attribute: String,
    /// Java type reported during discovery
    pub java_type: Option<String>,
}

impl AttributeRef {
    /// Create a new attribute reference
    pub fn new(mbean: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            mbean: mbean.into(),
            attribute: attribute.into(),
            java_type: None,
        }
    }

    /// Attach the Java type reported by the bridge
    #[must_use]
    pub fn with_java_type(mut self, java_type: impl Into<String>) -> Self {
        self.java_type = Some(java_type.into());
        self
    }
}

/// Runtime-typed attribute value
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl MetricValue {
    /// Type name reported as the unit of a result
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "i64",
            Self::Float(_) => "f64",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// One metric requested by the caller
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRequest {
    /// Namespace pattern in external form
    pub namespace: String,
    /// Tags merged into every result of this request
    #[serde(default)]
    pub tags: Tags,
}

impl MetricRequest {
    /// Create a request without caller tags
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            tags: Tags::new(),
        }
    }

    /// Add a caller tag
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// A collected metric
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRecord {
    /// Collapsed namespace with tag segments removed
    pub namespace: Vec<String>,
    /// Derived and caller-supplied tags
    pub tags: Tags,
    /// Attribute value
    pub value: MetricValue,
    /// Collection time
    pub timestamp: DateTime<Utc>,
    /// Type name of `value`
    pub unit: String,
}

/// A discoverable metric, without value
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricDescriptor {
    /// Namespace in external form
    pub namespace: Vec<String>,
    /// Java type reported by the bridge
    pub java_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_parse() {
        let name = ObjectName::parse(
            "org.apache.cassandra.metrics:type=ThreadPools,path=internal,scope=ValidationExecutor,name=MaxPoolSize",
        )
        .unwrap();
        assert_eq!(name.domain, "org.apache.cassandra.metrics");
        assert_eq!(name.properties.len(), 4);
        assert_eq!(name.property("scope"), Some("ValidationExecutor"));
        assert_eq!(name.property("keyspace"), None);
        assert_eq!(
            name.to_string(),
            "org.apache.cassandra.metrics:type=ThreadPools,path=internal,scope=ValidationExecutor,name=MaxPoolSize"
        );
    }

    #[test]
    fn test_object_name_quoted_value() {
        let name = ObjectName::from_key_properties("d", r#"type=X,scope="a,b",name=N"#).unwrap();
        assert_eq!(name.property("scope"), Some(r#""a,b""#));
        assert_eq!(name.property("name"), Some("N"));
    }

    #[test]
    fn test_object_name_invalid() {
        assert!(ObjectName::parse("no-colon").is_none());
        assert!(ObjectName::from_key_properties("d", "").is_none());
        assert!(ObjectName::from_key_properties("d", "type").is_none());
        assert!(ObjectName::from_key_properties("d", "=x").is_none());
    }

    #[test]
    fn test_metric_value_type_name() {
        assert_eq!(MetricValue::Int(3).type_name(), "i64");
        assert_eq!(MetricValue::Float(0.5).type_name(), "f64");
        assert_eq!(MetricValue::Bool(true).type_name(), "bool");
        assert_eq!(MetricValue::Str("x".into()).type_name(), "string");
        assert_eq!(MetricValue::Float(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_metric_request_builder() {
        let req = MetricRequest::new("/intel/cassandra").with_tag("dc", "east");
        assert_eq!(req.tags.get("dc").map(String::as_str), Some("east"));
    }
}
