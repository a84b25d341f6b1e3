//! Jolokia metric source
//!
//! Cassandra exposes its metrics as JMX beans. The Jolokia agent publishes
//! them over HTTP/JSON: `list` enumerates the beans of a domain together
//! with their attribute descriptions and a bulk `read` fetches many
//! attribute values in one round trip.

use async_trait::async_trait;
use cassmetrics_common::{
    AttributeRef, BeanInfo, ConnectionConfig, Error, MetricSource, MetricValue, Result,
};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::protocol::{parse_list, parse_read, Envelope, ReadRequest};

/// Escape a value for use inside a Jolokia GET path
#[must_use]
pub fn escape_path(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '!' => out.push_str("!!"),
            '/' => out.push_str("!/"),
            '"' => out.push_str("!\""),
            _ => out.push(c),
        }
    }
    out
}

/// Metric source talking to a Jolokia agent
pub struct JolokiaClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl JolokiaClient {
    /// Create a client for a validated connection
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| Error::configuration(e.to_string()))?;

        Ok(Self {
            base_url: config.endpoint.as_str().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Agent base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_response(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ServiceUnavailable(format!(
                "Jolokia returned status {status}: {body}"
            )));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::parse(format!("invalid Jolokia response: {e}"))
            }
        })
    }
}

fn transport_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::connection_failed(e.to_string())
    }
}

#[async_trait]
impl MetricSource for JolokiaClient {
    fn name(&self) -> &str {
        "jolokia"
    }

    async fn list(&self, domain: &str) -> Result<Vec<BeanInfo>> {
        let url = format!(
            "{}/list/{}?canonicalNaming=false",
            self.base_url,
            escape_path(domain)
        );
        debug!(url = %url, "Listing JMX domain");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let envelope: Envelope = Self::decode(Self::check_response(response).await?).await?;
        parse_list(domain, envelope)
    }

    async fn read(&self, targets: &[AttributeRef]) -> Result<Vec<Option<MetricValue>>> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/", self.base_url);
        let request: Vec<ReadRequest<'_>> = targets.iter().map(ReadRequest::new).collect();
        debug!(url = %url, attributes = targets.len(), "Bulk read");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let responses: Vec<Envelope> = Self::decode(Self::check_response(response).await?).await?;
        parse_read(targets, responses)
    }
}
