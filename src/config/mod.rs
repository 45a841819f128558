use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::carbon::DEFAULT_CARBON_PORT;
use crate::cli::Args;
use crate::error::ConfigError;

pub const DEFAULT_MASTER_PORT: u16 = 5050;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Optional settings file; anything given on the command line or in the
/// environment wins over it
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub master: Option<String>,
    pub master_port: Option<u16>,
    pub carbon: Option<String>,
    pub carbon_port: Option<u16>,
    pub prefix: Option<String>,
    pub singularity: Option<String>,
    pub dry_run: Option<bool>,
    pub http_timeout_secs: Option<u64>,
    pub self_metrics: Option<bool>,
}

impl FileConfig {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "mesos-stats", "mesos-stats")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the file named on the command line, or the default file if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let file_error = |reason: String| ConfigError::File {
            path: path.to_path_buf(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        toml::from_str(&content).map_err(|e| file_error(e.to_string()))
    }
}

/// Fully resolved settings the collector runs with
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `host:port` of the Mesos master
    pub master_pid: String,
    /// `host:port` of the Carbon plaintext listener
    pub carbon_address: String,
    pub graphite_prefix: String,
    pub singularity_host: Option<String>,
    pub dry_run: bool,
    pub http_timeout: Duration,
    pub self_metrics: bool,
}

impl Config {
    /// Merge command line/environment values over the file.
    ///
    /// Master, Carbon host and prefix are mandatory; empty values count as
    /// missing.
    pub fn resolve(args: &Args, file: &FileConfig) -> Result<Self, ConfigError> {
        let master = required("MESOS_MASTER", args.master.as_ref().or(file.master.as_ref()))?;
        let carbon = required("CARBON_HOST", args.carbon.as_ref().or(file.carbon.as_ref()))?;
        let prefix = required("GRAPHITE_PREFIX", args.prefix.as_ref().or(file.prefix.as_ref()))?;

        let master_port = args.master_port.or(file.master_port).unwrap_or(DEFAULT_MASTER_PORT);
        let carbon_port = args.carbon_port.or(file.carbon_port).unwrap_or(DEFAULT_CARBON_PORT);

        let http_timeout_secs = args
            .http_timeout
            .or(file.http_timeout_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "HTTP_TIMEOUT",
                reason: "must be at least one second".to_string(),
            });
        }

        let singularity_host = args
            .singularity
            .as_ref()
            .or(file.singularity.as_ref())
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty());

        Ok(Self {
            master_pid: with_default_port(&master, master_port),
            carbon_address: with_default_port(&carbon, carbon_port),
            graphite_prefix: prefix,
            singularity_host,
            dry_run: args.dry_run.or(file.dry_run).unwrap_or(false),
            http_timeout: Duration::from_secs(http_timeout_secs),
            self_metrics: args.self_metrics.or(file.self_metrics).unwrap_or(false),
        })
    }
}

fn required(key: &'static str, value: Option<&String>) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

/// Append `port` unless `host` already ends in one
pub fn with_default_port(host: &str, port: u16) -> String {
    match host.rsplit_once(':') {
        Some((name, explicit)) if !name.is_empty() && explicit.parse::<u16>().is_ok() => {
            host.to_string()
        }
        _ => format!("{}:{}", host, port),
    }
}

/// Parse flags such as `DRY_RUN`; any non-empty value not spelled as false is true
pub fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "false" | "0" | "no" | "off" | "disable" | "disabled" | "" => Ok(false),
        _ => Ok(true),
    }
}
