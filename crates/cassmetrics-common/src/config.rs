//! Configuration types for cassmetrics
//!
//! The host hands configuration over as a string-keyed option map. It is
//! validated once into a [`ConnectionConfig`] before any network call is made.

use crate::error::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Managed server base URL
pub const OPT_URL: &str = "url";
/// Node identity used in namespaces and the `node` tag
pub const OPT_HOSTNAME: &str = "hostname";
/// Bridge port
pub const OPT_PORT: &str = "port";
/// Request timeout in milliseconds
pub const OPT_TIMEOUT_MS: &str = "timeout_ms";
/// Path of the Jolokia agent on the server
pub const OPT_AGENT_PATH: &str = "agent_path";
/// Comma-separated list of JMX domains to enumerate
pub const OPT_DOMAINS: &str = "domains";
/// Directory for the persisted discovery tree
pub const OPT_CACHE_DIR: &str = "cache_dir";

/// Default bridge request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default Jolokia agent path
pub const DEFAULT_AGENT_PATH: &str = "/jolokia";
/// Domain enumerated when none is configured
pub const DEFAULT_DOMAIN: &str = "org.apache.cassandra.metrics";

const INVALID_URL: &str = "Invalid URL in global configuration";
const NO_HOSTNAME: &str = "No hostname defined in global configuration";

/// A single configuration value as delivered by the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl ConfigValue {
    /// String view of the value, if it is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// String-keyed option map
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// Description of one accepted configuration option
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigRule {
    /// Option key
    pub key: &'static str,
    /// Whether the option must be present
    pub required: bool,
    /// Human-readable description
    pub description: &'static str,
}

/// Options understood by the collector
#[must_use]
pub fn config_policy() -> Vec<ConfigRule> {
    vec![
        ConfigRule {
            key: OPT_URL,
            required: true,
            description: "managed server URL (scheme defaults to http)",
        },
        ConfigRule {
            key: OPT_HOSTNAME,
            required: true,
            description: "node identity used in namespaces and the node tag",
        },
        ConfigRule {
            key: OPT_PORT,
            required: true,
            description: "Jolokia agent port",
        },
        ConfigRule {
            key: OPT_TIMEOUT_MS,
            required: false,
            description: "request timeout in milliseconds (default 5000)",
        },
        ConfigRule {
            key: OPT_AGENT_PATH,
            required: false,
            description: "Jolokia agent path (default /jolokia)",
        },
        ConfigRule {
            key: OPT_DOMAINS,
            required: false,
            description: "comma-separated JMX domains to discover",
        },
        ConfigRule {
            key: OPT_CACHE_DIR,
            required: false,
            description: "directory where the discovery tree is persisted",
        },
    ]
}

/// Validated connection settings for one managed server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Agent endpoint including port and agent path
    pub endpoint: Url,
    /// Node identity
    pub hostname: String,
    /// Bridge port
    pub port: u16,
    /// Per-request timeout
    pub timeout: Duration,
    /// JMX domains to enumerate
    pub domains: Vec<String>,
    /// Directory for the persisted tree, if any
    pub cache_dir: Option<PathBuf>,
}

impl ConnectionConfig {
    /// Validate a host-supplied option map.
    ///
    /// Fails with [`Error::Configuration`] on a missing or empty `hostname`,
    /// a missing or malformed `url`, or a `port` outside `1..=65535`.
    pub fn from_options(options: &ConfigMap) -> Result<Self> {
        let hostname = match options.get(OPT_HOSTNAME) {
            Some(ConfigValue::Str(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(Error::configuration(NO_HOSTNAME)),
        };

        let raw_url = match options.get(OPT_URL) {
            Some(ConfigValue::Str(s)) if !s.trim().is_empty() => s.trim(),
            _ => return Err(Error::configuration(INVALID_URL)),
        };

        let port = match options.get(OPT_PORT) {
            Some(ConfigValue::Int(p)) => *p,
            Some(ConfigValue::Str(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::configuration(format!("invalid port: {s}")))?,
            _ => return Err(Error::configuration("No port defined in global configuration")),
        };
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| Error::configuration(format!("invalid port: {port}")))?;

        let timeout = match options.get(OPT_TIMEOUT_MS) {
            None => DEFAULT_TIMEOUT,
            Some(ConfigValue::Int(ms)) if *ms > 0 => Duration::from_millis(ms.unsigned_abs()),
            Some(ConfigValue::Str(s)) => match s.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(Error::configuration(format!("invalid timeout_ms: {s}"))),
            },
            Some(other) => {
                return Err(Error::configuration(format!("invalid timeout_ms: {other:?}")));
            }
        };

        let agent_path = options
            .get(OPT_AGENT_PATH)
            .and_then(ConfigValue::as_str)
            .unwrap_or(DEFAULT_AGENT_PATH);

        let domains: Vec<String> = options
            .get(OPT_DOMAINS)
            .and_then(ConfigValue::as_str)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let domains = if domains.is_empty() {
            vec![DEFAULT_DOMAIN.to_string()]
        } else {
            domains
        };

        let cache_dir = options
            .get(OPT_CACHE_DIR)
            .and_then(ConfigValue::as_str)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            endpoint: agent_endpoint(raw_url, port, agent_path)?,
            hostname,
            port,
            timeout,
            domains,
            cache_dir,
        })
    }

    /// Key identifying this server in the tree cache
    #[must_use]
    pub fn cache_key(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or("unknown");
        format!("{}_{}", host.replace(['[', ']', ':'], ""), self.port)
    }
}

/// Build the agent endpoint from the configured URL, port and agent path
fn agent_endpoint(raw_url: &str, port: u16, agent_path: &str) -> Result<Url> {
    let with_scheme = if raw_url.contains("://") {
        raw_url.to_string()
    } else {
        format!("http://{raw_url}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| Error::configuration(format!("{INVALID_URL}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::configuration(format!("{INVALID_URL}: {raw_url}")));
    }

    url.set_port(Some(port))
        .map_err(|()| Error::configuration(format!("{INVALID_URL}: {raw_url}")))?;
    url.set_path(agent_path.trim_end_matches('/'));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
