//! grpcbench - resolve and validate a gRPC load-test run configuration
//!
//! Translates flags and an optional settings file into run options, builds
//! the configuration and prints it as JSON for the load engine.

mod cli;
mod error;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use error::Result;
use libgrpcbench_core::RunConfig;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("error [{}]: {}", e.error_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<()> {
    let resolved = cli.resolve()?;
    debug!(options = resolved.options.len(), "resolved run options");

    let config = RunConfig::build(&resolved.call, &resolved.host, &resolved.options)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
