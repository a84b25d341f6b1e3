//! cassmetrics collector
//!
//! Ties configuration, the Jolokia source and the discovery tree together.
//! A [`Collector`] resolves caller namespace patterns, reads the matching
//! attributes and returns tagged [`ResultRecord`](cassmetrics_common::ResultRecord)s.

pub mod client;
pub mod collector;

pub use client::CassClient;
pub use collector::{Collector, SourceFactory};
