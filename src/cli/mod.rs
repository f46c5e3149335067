//! CLI command definitions and handlers

pub mod config;
pub mod create;
pub mod fip;
pub mod rm;
pub mod run;
pub mod start;
pub mod stop;
pub mod volume;

use crate::engine::client::EngineClient;
use crate::storage::config::ClientSettings;
use crate::storage::paths::HyperPaths;
use crate::volume::transfer::{FtpChannel, TransferChannel};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Hyper - command line client for the Hyper container cloud
#[derive(Parser)]
#[command(name = "hyper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Engine endpoint to connect to
    #[arg(short = 'H', long, global = true, env = "HYPER_HOST")]
    pub host: Option<String>,

    /// Location of client config files
    #[arg(long, global = true, env = "HYPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short = 'D', long, global = true)]
    pub debug: bool,
}

impl GlobalArgs {
    pub fn paths(&self) -> crate::Result<HyperPaths> {
        HyperPaths::resolve(self.config.as_deref())
    }

    pub fn settings(&self) -> crate::Result<ClientSettings> {
        ClientSettings::resolve(&self.paths()?, self.host.as_deref())
    }

    /// Engine client for the configured endpoint
    pub fn engine(&self) -> crate::Result<Arc<EngineClient>> {
        Ok(Arc::new(EngineClient::new(&self.settings()?)?))
    }

    pub fn transfer(&self) -> Arc<dyn TransferChannel> {
        Arc::new(FtpChannel)
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a command in a new container
    Run(run::RunArgs),

    /// Create a new container
    Create(create::CreateArgs),

    /// Start one or more stopped containers
    Start(start::StartArgs),

    /// Restart one or more containers
    Restart(start::RestartArgs),

    /// Stop one or more running containers
    Stop(stop::StopArgs),

    /// Remove one or more containers
    Rm(rm::RmArgs),

    /// Manage volumes
    Volume(volume::VolumeArgs),

    /// Manage floating IPs
    Fip(fip::FipArgs),

    /// Store credentials for an endpoint
    Config(config::ConfigArgs),
}
