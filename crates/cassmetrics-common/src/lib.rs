//! cassmetrics common - shared types and utilities
//!
//! This crate provides the error taxonomy, connection configuration, the
//! managed-server access trait and the value types used across cassmetrics.

pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::{ConfigMap, ConfigValue, ConnectionConfig};
pub use error::{Error, Result};
pub use source::{AttributeInfo, BeanInfo, MetricSource};
pub use types::*;
