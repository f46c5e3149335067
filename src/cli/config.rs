//! `hyper config` command implementation

use crate::cli::GlobalArgs;
use crate::storage::config::{normalize_host, CloudConfig, ConfigFile, DEFAULT_HOST};
use crate::storage::paths::HyperPaths;
use crate::Result;
use clap::Args;

/// Arguments for the `config` command
#[derive(Args)]
pub struct ConfigArgs {
    /// Access key of the account
    #[arg(long = "accesskey")]
    pub access_key: String,

    /// Secret key of the account
    #[arg(long = "secretkey")]
    pub secret_key: String,
}

/// Execute the `config` command
pub async fn execute(args: ConfigArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let paths = global.paths()?;
    let host = global.host.as_deref().unwrap_or(DEFAULT_HOST);
    save_credentials(&paths, host, &args)?;
    println!("Credentials saved to {}", paths.config_file().display());
    Ok(())
}

fn save_credentials(paths: &HyperPaths, host: &str, args: &ConfigArgs) -> Result<()> {
    let mut config = ConfigFile::load(paths)?;
    config.set_cloud(
        host,
        CloudConfig {
            access_key: args.access_key.clone(),
            secret_key: args.secret_key.clone(),
        },
    );
    config.save(paths)?;
    tracing::debug!(host = %normalize_host(host), "credentials saved");
    Ok(())
}
