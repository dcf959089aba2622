use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lbtrace::cli::Cli;
use lbtrace::{LbTraceError, Pipeline, StageMatcher, output, providers};

/// Exit status when the report is printed but some branches failed.
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = if cli.verbose && std::env::var_os("RUST_LOG").is_none() {
        EnvFilter::new("lbtrace=debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.trace_config();
    let matcher = StageMatcher::new(&cli.stage, config.match_mode).map_err(LbTraceError::from)?;
    let provider = providers::get_provider(cli.provider_name(), &cli.provider_settings()).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling in-flight calls");
            on_interrupt.cancel();
        }
    });

    let pipeline = Pipeline::new(Arc::from(provider), &config, cancel);
    let report = pipeline
        .run(&cli.project, &matcher)
        .await
        .map_err(LbTraceError::from)?;

    println!("{}", output::render(&report, cli.format)?);

    for line in output::failure_lines(&report) {
        eprintln!("{line}");
    }

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::info!(failures = report.failures.len(), "trace finished with failures");
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}
