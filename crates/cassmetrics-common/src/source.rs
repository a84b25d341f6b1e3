//! Managed server access trait
//!
//! The discovery tree only needs two things from the managed server: an
//! enumeration of beans and attributes, and a way to read attribute values.
//! Transports implement [`MetricSource`]; tests use in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AttributeRef, MetricValue, ObjectName};

/// One attribute exposed by a bean
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Attribute name
    pub name: String,
    /// Java type, when the bridge reports it
    pub java_type: Option<String>,
}

impl AttributeInfo {
    /// Create attribute info without a type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            java_type: None,
        }
    }
}

/// One enumerated bean
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeanInfo {
    /// Object name of the bean
    pub name: ObjectName,
    /// Readable attributes in bridge order
    pub attributes: Vec<AttributeInfo>,
}

/// Source of metric beans and values
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Enumerate every bean and attribute under a JMX domain
    async fn list(&self, domain: &str) -> Result<Vec<BeanInfo>>;

    /// Read a batch of attributes.
    ///
    /// The returned vector is aligned with `targets`. An entry is `None` when
    /// that single attribute could not be read; the batch as a whole only
    /// fails on connectivity or malformed responses.
    async fn read(&self, targets: &[AttributeRef]) -> Result<Vec<Option<MetricValue>>>;
}
