use clap::Parser;
use std::process::ExitCode;

mod cli;

fn main() -> anyhow::Result<ExitCode> {
    let args = cli::CliArgs::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    tracing::info!("Starting safe2tiff v{}", env!("CARGO_PKG_VERSION"));

    cli::run(args)
}
