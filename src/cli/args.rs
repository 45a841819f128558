use clap::Parser;
use std::path::PathBuf;

use crate::config::parse_flag;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Ship Mesos and Singularity metrics to Carbon once a minute",
    long_about = "mesos-stats polls a Mesos master, its slaves and optionally a Singularity scheduler\n\
at the top of every wall-clock minute and forwards the samples to a Carbon (Graphite) listener.\n\
Every option can also be given through the environment variable shown next to it, or in a\n\
TOML config file (--config). Command line and environment win over the file.\n\
---\n\
Examples:\n\
  MESOS_MASTER=10.0.0.5 CARBON_HOST=graphite GRAPHITE_PREFIX=mesos.prod mesos-stats\n\
  mesos-stats -m 10.0.0.5 -c graphite:2003 -p mesos.prod --dry-run -v 3"
)]
pub struct Args {
    /// Mesos master host, optionally with port
    #[arg(short, long, env = "MESOS_MASTER")]
    pub master: Option<String>,

    /// Master port used when the host has none (default 5050)
    #[arg(long, env = "MESOS_MASTER_PORT")]
    pub master_port: Option<u16>,

    /// Carbon host, optionally with port
    #[arg(short, long, env = "CARBON_HOST")]
    pub carbon: Option<String>,

    /// Carbon plaintext port used when the host has none (default 2003)
    #[arg(long, env = "CARBON_PORT")]
    pub carbon_port: Option<u16>,

    /// Prefix prepended to every metric path
    #[arg(short, long, env = "GRAPHITE_PREFIX")]
    pub prefix: Option<String>,

    /// Singularity host; Singularity metrics are skipped when unset
    #[arg(short, long, env = "SINGULARITY_HOST")]
    pub singularity: Option<String>,

    /// Log metrics instead of sending them to Carbon (any non-empty value other than
    /// false/0/no/off/disable enables it)
    #[arg(long, env = "DRY_RUN", value_parser = parse_flag, num_args = 0..=1, default_missing_value = "true")]
    pub dry_run: Option<bool>,

    /// Timeout in seconds for each HTTP request to Mesos or Singularity (default 10)
    #[arg(long, env = "HTTP_TIMEOUT")]
    pub http_timeout: Option<u64>,

    /// Also report the collector's own cycle timings
    #[arg(long, env = "SELF_METRICS", value_parser = parse_flag, num_args = 0..=1, default_missing_value = "true")]
    pub self_metrics: Option<bool>,

    /// Path to a TOML config file
    #[arg(long, env = "MESOS_STATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stdout
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Verbosity level (0=error, 1=warn, 2=info, 3=debug, 4=trace)
    #[arg(short, long, default_value = "2")]
    pub verbosity: u8,
}

pub fn parse_args() -> Args {
    Args::parse()
}

impl Default for Args {
    fn default() -> Self {
        Self {
            master: None,
            master_port: None,
            carbon: None,
            carbon_port: None,
            prefix: None,
            singularity: None,
            dry_run: None,
            http_timeout: None,
            self_metrics: None,
            config: None,
            log_file: None,
            verbosity: 2,
        }
    }
}
