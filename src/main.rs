//! Hyper CLI entry point

use clap::Parser;
use hypercli::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout only carries command output
    let default_level = if cli.global.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let global = cli.global;
    match cli.command {
        Commands::Run(args) => hypercli::cli::run::execute(args, &global).await,
        Commands::Create(args) => hypercli::cli::create::execute(args, &global).await,
        Commands::Start(args) => hypercli::cli::start::execute(args, &global).await,
        Commands::Restart(args) => hypercli::cli::start::execute_restart(args, &global).await,
        Commands::Stop(args) => hypercli::cli::stop::execute(args, &global).await,
        Commands::Rm(args) => hypercli::cli::rm::execute(args, &global).await,
        Commands::Volume(args) => hypercli::cli::volume::execute(args, &global).await,
        Commands::Fip(args) => hypercli::cli::fip::execute(args, &global).await,
        Commands::Config(args) => hypercli::cli::config::execute(args, &global).await,
    }
}
