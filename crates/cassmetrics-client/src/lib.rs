//! cassmetrics client - managed server access over Jolokia
//!
//! [`JolokiaClient`] implements [`MetricSource`](cassmetrics_common::MetricSource)
//! on top of the Jolokia HTTP/JSON agent that ships beside Cassandra.

pub mod jolokia;
mod protocol;

pub use jolokia::{escape_path, JolokiaClient};
pub use protocol::metric_value;
