//! cassmetrics - Cassandra metric discovery and collection
//!
//! This binary drives the collector from the command line: list every
//! discoverable metric, collect namespace patterns or drop the tree cache.

mod config;

use anyhow::{bail, Context, Result};
use cassmetrics_collector::Collector;
use cassmetrics_common::{ConnectionConfig, MetricRequest};
use cassmetrics_discovery::{FileTreeCache, TreeCache};
use clap::{Parser, Subcommand};
use config::Config;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cassmetrics")]
#[command(about = "Cassandra metric discovery and collection over Jolokia")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/cassmetrics/cassmetrics.toml")]
    config: String,

    /// Managed server URL
    #[arg(long, env = "CASSMETRICS_URL")]
    url: Option<String>,

    /// Node identity used in namespaces
    #[arg(long)]
    hostname: Option<String>,

    /// Jolokia agent port
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for the discovery tree cache
    #[arg(long)]
    cache_dir: Option<String>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every discoverable metric
    Discover,
    /// Collect metrics matching namespace patterns
    Collect {
        /// Namespace patterns, e.g. /intel/cassandra/node/n1/org_apache_cassandra_metrics/type/*/...
        #[arg(required = true)]
        namespaces: Vec<String>,
        /// Extra tag added to every result (key=value)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Discovery tree cache operations
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Show accepted configuration options
    Policy,
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Remove the cached tree for the configured server
    Clear,
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let path = std::path::Path::new(&args.config);
    let mut config: Config = if path.exists() {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", args.config))?;
        toml::from_str(&config_str).with_context(|| format!("failed to parse {}", args.config))?
    } else {
        Config::default()
    };

    // CLI takes precedence
    if let Some(url) = &args.url {
        config.server.url.clone_from(url);
    }
    if let Some(hostname) = &args.hostname {
        config.server.hostname = Some(hostname.clone());
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = &args.cache_dir {
        config.cache.dir = Some(dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    Ok(config)
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays machine readable
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config);

    let options = config.to_options();
    let collector = Collector::new();

    match args.command {
        Commands::Discover => {
            let types = collector.get_metric_types(&options).await?;
            for metric in &types {
                println!(
                    "/{}\t{}",
                    metric.namespace.join("/"),
                    metric.java_type.as_deref().unwrap_or("-")
                );
            }
            info!(metrics = types.len(), "Discovery complete");
        }
        Commands::Collect { namespaces, tags } => {
            let requests: Vec<MetricRequest> = namespaces
                .into_iter()
                .map(|ns| {
                    tags.iter()
                        .fold(MetricRequest::new(ns), |req, (k, v)| req.with_tag(k, v))
                })
                .collect();
            let records = collector.collect_metrics(&requests, &options).await?;
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
            info!(records = records.len(), "Collection complete");
        }
        Commands::Cache { action } => match action {
            CacheCommands::Clear => {
                let connection = ConnectionConfig::from_options(&options)?;
                let Some(dir) = &connection.cache_dir else {
                    bail!("no cache directory configured; use --cache-dir or [cache] dir");
                };
                let cache = FileTreeCache::for_server(dir, &connection.cache_key());
                cache.clear()?;
                println!("Removed {}", cache.path().display());
            }
        },
        Commands::Policy => {
            for rule in collector.get_config_policy() {
                let required = if rule.required { "required" } else { "optional" };
                println!("{:<12} {:<9} {}", rule.key, required, rule.description);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("dc=east").unwrap(), ("dc".to_string(), "east".to_string()));
        assert_eq!(parse_tag("k=a=b").unwrap(), ("k".to_string(), "a=b".to_string()));
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=x").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let args = Args::parse_from([
            "cassmetrics",
            "--config",
            "/nonexistent/cassmetrics.toml",
            "--hostname",
            "cass-2",
            "--port",
            "9999",
            "collect",
            "/intel/cassandra/node/cass-2/x",
            "--tag",
            "dc=east",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.server.hostname.as_deref(), Some("cass-2"));
        assert_eq!(config.server.port, 9999);
        match args.command {
            Commands::Collect { namespaces, tags } => {
                assert_eq!(namespaces.len(), 1);
                assert_eq!(tags, vec![("dc".to_string(), "east".to_string())]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
