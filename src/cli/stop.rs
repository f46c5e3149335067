//! `hyper stop` command implementation

use crate::cli::GlobalArgs;
use crate::engine::ContainerApi;
use clap::Args;

/// Arguments for the `stop` command
#[derive(Args)]
pub struct StopArgs {
    /// Container names or IDs to stop
    #[arg(required = true)]
    pub containers: Vec<String>,

    /// Seconds to wait for stop before killing it
    #[arg(short, long, default_value = "10")]
    pub time: u64,
}

/// Execute the `stop` command
pub async fn execute(args: StopArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;

    let mut failed = Vec::new();
    for container in &args.containers {
        match engine.stop_container(container, args.time).await {
            Ok(()) => println!("{}", container),
            Err(e) => {
                eprintln!("Error: {}", e);
                failed.push(container.as_str());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("failed to stop containers: {}", failed.join(", "));
    }
    Ok(())
}
