//! `hyper start` and `hyper restart` command implementations

use crate::cli::GlobalArgs;
use crate::engine::Engine;
use crate::volume::init::VolumeInitializer;
use crate::volume::reload::reload_volumes;
use crate::volume::transfer::TransferChannel;
use clap::Args;
use std::sync::Arc;

/// Arguments for the `start` command
#[derive(Args)]
pub struct StartArgs {
    /// Container names or IDs to start
    #[arg(required = true)]
    pub containers: Vec<String>,

    /// Fill initialized volumes from their sources again before starting
    #[arg(short, long)]
    pub reload: bool,
}

/// Arguments for the `restart` command
#[derive(Args)]
pub struct RestartArgs {
    /// Container names or IDs to restart
    #[arg(required = true)]
    pub containers: Vec<String>,

    /// Seconds to wait for stop before killing the container
    #[arg(short, long, default_value = "10")]
    pub time: u64,

    /// Fill initialized volumes from their sources again before starting
    #[arg(short, long)]
    pub reload: bool,
}

/// Execute the `start` command
pub async fn execute(args: StartArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;
    let transfer = global.transfer();

    let mut failed = Vec::new();
    for container in &args.containers {
        match start_container(&engine, transfer.clone(), container, args.reload).await {
            Ok(()) => println!("{}", container),
            Err(e) => {
                eprintln!("Error: {}", e);
                failed.push(container.as_str());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("failed to start containers: {}", failed.join(", "));
    }
    Ok(())
}

/// Execute the `restart` command
pub async fn execute_restart(args: RestartArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;
    let transfer = global.transfer();

    let mut failed = Vec::new();
    for container in &args.containers {
        match restart_container(&engine, transfer.clone(), container, args.time, args.reload).await
        {
            Ok(()) => println!("{}", container),
            Err(e) => {
                eprintln!("Error: {}", e);
                failed.push(container.as_str());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("failed to restart containers: {}", failed.join(", "));
    }
    Ok(())
}

/// Start a container, reloading its initialized volumes first if asked to
pub async fn start_container<E>(
    engine: &Arc<E>,
    transfer: Arc<dyn TransferChannel>,
    container: &str,
    reload: bool,
) -> crate::Result<()>
where
    E: Engine + 'static,
{
    if reload {
        let initializer = VolumeInitializer::new(engine.clone(), transfer);
        let reloaded = reload_volumes(&initializer, &**engine, container).await?;
        tracing::debug!(%container, volumes = reloaded, "volumes reloaded");
    }
    engine.start_container(container).await
}

/// Stop a container, reload its initialized volumes if asked to, start it
pub async fn restart_container<E>(
    engine: &Arc<E>,
    transfer: Arc<dyn TransferChannel>,
    container: &str,
    time: u64,
    reload: bool,
) -> crate::Result<()>
where
    E: Engine + 'static,
{
    engine.stop_container(container, time).await?;
    start_container(engine, transfer, container, reload).await
}
