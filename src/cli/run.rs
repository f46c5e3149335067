//! `hyper run` command implementation
//!
//! Also home of the create pipeline shared with `hyper create`: special binds
//! are provisioned and populated before the container itself is created.

use crate::cli::GlobalArgs;
use crate::engine::types::{ContainerConfig, HostConfig};
use crate::engine::Engine;
use crate::volume::init::VolumeInitializer;
use crate::volume::provision::{provision, Provisioned};
use crate::volume::transfer::TransferChannel;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

/// Container options shared by `run` and `create`
#[derive(Args, Debug, Clone, Default)]
pub struct ContainerArgs {
    /// Image to run
    pub image: String,

    /// Command to run in the container
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,

    /// Container name
    #[arg(long)]
    pub name: Option<String>,

    /// Set environment variables
    #[arg(short, long)]
    pub env: Vec<String>,

    /// Bind a volume; git, http(s) and local sources are copied into a new volume
    #[arg(short, long)]
    pub volume: Vec<String>,

    /// Working directory inside the container
    #[arg(short, long)]
    pub workdir: Option<String>,

    /// Username or UID
    #[arg(short, long)]
    pub user: Option<String>,

    /// Keep STDIN open even if not attached
    #[arg(short, long)]
    pub interactive: bool,

    /// Allocate a pseudo-TTY
    #[arg(short, long)]
    pub tty: bool,

    /// Override the default entrypoint
    #[arg(long)]
    pub entrypoint: Option<String>,

    /// Container hostname
    #[arg(long)]
    pub hostname: Option<String>,

    /// Add a custom host-to-IP mapping
    #[arg(long)]
    pub add_host: Vec<String>,

    /// Set custom DNS servers
    #[arg(long)]
    pub dns: Vec<String>,

    /// Set DNS options
    #[arg(long)]
    pub dns_opt: Vec<String>,

    /// Set custom DNS search domains
    #[arg(long)]
    pub dns_search: Vec<String>,

    /// Signal to stop the container
    #[arg(long, default_value = "SIGTERM")]
    pub stop_signal: String,

    /// Set metadata on the container
    #[arg(short, long)]
    pub label: Vec<String>,

    /// Give up on volume initialization after this many seconds (0 waits forever)
    #[arg(long, default_value = "0")]
    pub init_timeout: u64,
}

impl ContainerArgs {
    /// Engine configuration for the container
    pub fn container_config(&self) -> (ContainerConfig, HostConfig) {
        let config = ContainerConfig {
            hostname: self.hostname.clone().unwrap_or_default(),
            user: self.user.clone().unwrap_or_default(),
            env: self.env.clone(),
            cmd: self.command.clone(),
            image: self.image.clone(),
            entrypoint: self.entrypoint.iter().cloned().collect(),
            working_dir: self.workdir.clone().unwrap_or_default(),
            tty: self.tty,
            open_stdin: self.interactive,
            stop_signal: self.stop_signal.clone(),
            labels: self
                .label
                .iter()
                .map(|label| match label.split_once('=') {
                    Some((key, value)) => (key.to_string(), value.to_string()),
                    None => (label.clone(), String::new()),
                })
                .collect(),
        };

        let host_config = HostConfig {
            binds: self.volume.clone(),
            dns: self.dns.clone(),
            dns_options: self.dns_opt.clone(),
            dns_search: self.dns_search.clone(),
            extra_hosts: self.add_host.clone(),
        };

        (config, host_config)
    }

    /// Deadline for the helper container; none when the flag is zero
    pub fn init_deadline(&self) -> Option<Duration> {
        (self.init_timeout > 0).then(|| Duration::from_secs(self.init_timeout))
    }
}

/// Arguments for the `run` command
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub container: ContainerArgs,
}

/// Execute the `run` command
pub async fn execute(args: RunArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;
    let id = run_container(engine, global.transfer(), &args.container).await?;
    println!("{}", id);
    Ok(())
}

/// Create the container with its volumes initialized, then start it
pub async fn run_container<E>(
    engine: Arc<E>,
    transfer: Arc<dyn TransferChannel>,
    args: &ContainerArgs,
) -> crate::Result<String>
where
    E: Engine + 'static,
{
    let id = create_container(engine.clone(), transfer, args).await?;
    engine.start_container(&id).await?;
    Ok(id)
}

/// Provision special binds, populate them, then create the container.
///
/// Volumes made for this container are removed again if populating them or
/// creating the container fails.
pub async fn create_container<E>(
    engine: Arc<E>,
    transfer: Arc<dyn TransferChannel>,
    args: &ContainerArgs,
) -> crate::Result<String>
where
    E: Engine + 'static,
{
    let (config, mut host_config) = args.container_config();

    let Provisioned { volumes, rollback } = provision(&*engine, &mut host_config.binds).await?;

    let initializer =
        VolumeInitializer::new(engine.clone(), transfer).with_deadline(args.init_deadline());
    if let Err(e) = initializer.initialize(&config, &host_config, &volumes).await {
        return Err(rollback.abort(e).await);
    }

    match engine
        .create_container(&config, &host_config, args.name.as_deref())
        .await
    {
        Ok(created) => {
            rollback.commit();
            for warning in &created.warnings {
                eprintln!("WARNING: {}", warning);
            }
            tracing::debug!(container = %created.id, "container created");
            Ok(created.id)
        }
        Err(e) => Err(rollback.abort(e).await),
    }
}
