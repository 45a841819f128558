mod args;

pub use args::{parse_args, Args};

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use std::sync::Arc;
use tracing::error;

use crate::carbon::CarbonSink;
use crate::collector::{Supervisor, SystemClock};
use crate::config::{Config, FileConfig};
use crate::mesos::{self, MesosClient};
use crate::metrics::MetricSource;
use crate::singularity::SingularitySource;

/// Prints the resolved configuration at startup
fn print_banner(config: &Config) {
    println!("{}", "Got configuration...".bold());
    println!("MESOS MASTER:        {}", config.master_pid);
    println!("CARBON:              {}", config.carbon_address);
    println!("GRAPHITE PREFIX:     {}", config.graphite_prefix);
    println!(
        "SINGULARITY HOST:    {}",
        config.singularity_host.as_deref().unwrap_or("<not set>")
    );
    println!("DRY RUN (TEST MODE): {}", config.dry_run);
    println!("==========================================");
}

/// Tells the operator which settings are needed
fn print_config_help() {
    eprintln!("Required settings (flag / environment variable):");
    eprintln!("   --master       MESOS_MASTER      Mesos master host[:port]");
    eprintln!("   --carbon       CARBON_HOST       Carbon host[:port]");
    eprintln!("   --prefix       GRAPHITE_PREFIX   metric path prefix");
    eprintln!("Optional:");
    eprintln!("   --singularity  SINGULARITY_HOST  Singularity host[:port]");
    eprintln!("   --dry-run      DRY_RUN           log metrics instead of sending");
    eprintln!("   --config       MESOS_STATS_CONFIG  TOML file with the same keys");
}

/// Resolve settings; a configuration problem ends the process before the loop starts
fn resolve_config(args: &Args) -> Option<Config> {
    let resolved = FileConfig::load(args.config.as_deref())
        .and_then(|file| Config::resolve(args, &file));
    match resolved {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("{} {}", "One or more configuration settings are not valid:".red(), e);
            print_config_help();
            None
        }
    }
}

/// Build the sources in sampling order
fn build_sources(config: &Config) -> Result<Vec<Box<dyn MetricSource>>> {
    let client = MesosClient::new(&config.master_pid, config.http_timeout)
        .context("Failed to build HTTP client for Mesos")?;
    let mut sources = mesos::sources(Arc::new(client));

    if let Some(host) = &config.singularity_host {
        let singularity = SingularitySource::new(host, config.http_timeout)
            .context("Failed to build HTTP client for Singularity")?;
        sources.push(Box::new(singularity));
    }
    Ok(sources)
}

pub async fn run(args: Args) -> Result<()> {
    // Missing configuration is not a crash: report and exit cleanly
    let Some(config) = resolve_config(&args) else {
        return Ok(());
    };
    print_banner(&config);

    let sources = build_sources(&config)?;
    let sink = CarbonSink::new(
        config.carbon_address.as_str(),
        &config.graphite_prefix,
        config.dry_run,
    );
    let cancel = crate::logging::setup_signal_handler();

    let mut supervisor = Supervisor::new(sources, Box::new(sink), Arc::new(SystemClock), cancel);
    if config.self_metrics {
        supervisor = supervisor.with_self_metrics();
    }

    println!("Start time: {}", Local::now());
    supervisor.run().await;
    println!("Bye!");
    Ok(())
}
