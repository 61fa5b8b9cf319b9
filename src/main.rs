//! heartpredict - Main entry point

use clap::Parser;
use heartpredict::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "heartpredict={}",
                    cli.loglevel.as_filter()
                ))
            }),
        )
        .init();

    run(cli)
}
