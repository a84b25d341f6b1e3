//! Configuration file for the cassmetrics CLI

use cassmetrics_common::config::{
    OPT_AGENT_PATH, OPT_CACHE_DIR, OPT_DOMAINS, OPT_HOSTNAME, OPT_PORT, OPT_TIMEOUT_MS, OPT_URL,
};
use cassmetrics_common::ConfigMap;
use serde::Deserialize;

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub agent_path: Option<String>,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            hostname: None,
            port: default_port(),
            timeout_ms: None,
            agent_path: None,
            domains: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_url() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8778
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Option map handed to the collector
    pub fn to_options(&self) -> ConfigMap {
        let mut options = ConfigMap::new();
        options.insert(OPT_URL.to_string(), self.server.url.as_str().into());
        options.insert(OPT_PORT.to_string(), i64::from(self.server.port).into());
        if let Some(hostname) = &self.server.hostname {
            options.insert(OPT_HOSTNAME.to_string(), hostname.as_str().into());
        }
        if let Some(timeout_ms) = self.server.timeout_ms {
            let timeout_ms = i64::try_from(timeout_ms).unwrap_or(i64::MAX);
            options.insert(OPT_TIMEOUT_MS.to_string(), timeout_ms.into());
        }
        if let Some(agent_path) = &self.server.agent_path {
            options.insert(OPT_AGENT_PATH.to_string(), agent_path.as_str().into());
        }
        if !self.server.domains.is_empty() {
            options.insert(OPT_DOMAINS.to_string(), self.server.domains.join(",").into());
        }
        if let Some(dir) = &self.cache.dir {
            options.insert(OPT_CACHE_DIR.to_string(), dir.as_str().into());
        }
        options
    }
}
