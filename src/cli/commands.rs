//! Command execution for the file-relay agent
//!
//! Loads and validates the configuration, registers one runner per job, then
//! parks on ctrl-c. With `--check` the process stops after validation.

use std::sync::Arc;

use tracing::info;

use crate::app::TaskRunner;
use crate::cli::Cli;
use crate::config::Config;
use crate::errors::Result;

/// Entry point invoked by `main` once logging is up.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config_format, &cli.config)?;

    if cli.check {
        println!(
            "Configuration OK: {} job(s), source '{}', target '{}'",
            config.jobs.len(),
            config.source.kind,
            config.target.host
        );
        return Ok(());
    }

    let mut handles = Vec::with_capacity(config.jobs.len());
    for job in config.jobs.clone() {
        let runner = Arc::new(TaskRunner::new(&config, job)?);
        info!(
            job = %runner.name(),
            next_run_in = ?runner.first_wait(),
            "registering job"
        );
        handles.push(tokio::spawn(runner.run()));
    }

    info!(jobs = handles.len(), "service started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, stopping");

    for handle in handles {
        handle.abort();
    }

    Ok(())
}
