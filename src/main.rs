use anyhow::Result;
use mesos_stats::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    // Held for the whole run so file logging is flushed on exit
    let _log_guard = logging::setup_logger(args.verbosity, args.log_file.as_deref())?;

    cli::run(args).await
}
