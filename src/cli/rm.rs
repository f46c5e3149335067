//! `hyper rm` command implementation

use crate::cli::GlobalArgs;
use crate::engine::ContainerApi;
use clap::Args;

/// Arguments for the `rm` command
#[derive(Args)]
pub struct RmArgs {
    /// Container names or IDs to remove
    #[arg(required = true)]
    pub containers: Vec<String>,

    /// Force the removal of a running container
    #[arg(short, long)]
    pub force: bool,

    /// Remove the volumes associated with the container
    #[arg(short, long)]
    pub volumes: bool,
}

/// Execute the `rm` command
pub async fn execute(args: RmArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;

    let mut failed = Vec::new();
    for container in &args.containers {
        match engine
            .remove_container(container, args.force, args.volumes)
            .await
        {
            Ok(()) => println!("{}", container),
            Err(e) => {
                eprintln!("Error: {}", e);
                failed.push(container.as_str());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("failed to remove containers: {}", failed.join(", "));
    }
    Ok(())
}
