//! `hyper volume` command implementation

use crate::cli::GlobalArgs;
use crate::engine::types::{Volume, VolumeCreateRequest};
use crate::engine::VolumeApi;
use crate::volume::{SOURCE_LABEL, VOLUME_DRIVER};
use crate::{HyperError, Result};
use clap::{Args, Subcommand};
use std::collections::HashMap;

/// Arguments for the `volume` command
#[derive(Args)]
pub struct VolumeArgs {
    #[command(subcommand)]
    pub command: VolumeCommands,
}

/// Volume subcommands
#[derive(Subcommand)]
pub enum VolumeCommands {
    /// Create a volume
    Create(VolumeCreateArgs),
    /// List volumes
    Ls(VolumeLsArgs),
    /// Remove one or more volumes
    Rm(VolumeRmArgs),
    /// Display detailed information on one or more volumes
    Inspect(VolumeInspectArgs),
}

/// Arguments for volume create
#[derive(Args)]
pub struct VolumeCreateArgs {
    /// Volume name
    #[arg(long)]
    pub name: Option<String>,

    /// Specify volume driver name
    #[arg(short, long, default_value = VOLUME_DRIVER)]
    pub driver: String,

    /// Set driver specific options
    #[arg(short, long)]
    pub opt: Vec<String>,

    /// Set metadata for a volume
    #[arg(long)]
    pub label: Vec<String>,
}

/// Arguments for volume ls
#[derive(Args)]
pub struct VolumeLsArgs {
    /// Only display volume names
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for volume rm
#[derive(Args)]
pub struct VolumeRmArgs {
    /// Volume names to remove
    #[arg(required = true)]
    pub volumes: Vec<String>,
}

/// Arguments for volume inspect
#[derive(Args)]
pub struct VolumeInspectArgs {
    /// Volume names to inspect
    #[arg(required = true)]
    pub volumes: Vec<String>,
}

/// Execute the `volume` command
pub async fn execute(args: VolumeArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;

    match args.command {
        VolumeCommands::Create(create_args) => {
            let request = create_request(&create_args)?;
            let volume = engine.create_volume(&request).await?;
            println!("{}", volume.name);
        }
        VolumeCommands::Ls(ls_args) => {
            let volumes = engine.list_volumes().await?;

            if ls_args.quiet {
                for vol in volumes {
                    println!("{}", vol.name);
                }
            } else {
                print!("{}", format_table(&volumes));
            }
        }
        VolumeCommands::Rm(rm_args) => {
            let mut failed = Vec::new();
            for name in &rm_args.volumes {
                match engine.remove_volume(name).await {
                    Ok(()) => println!("{}", name),
                    Err(e) => {
                        eprintln!("Error removing volume {}: {}", name, e);
                        failed.push(name.as_str());
                    }
                }
            }
            if !failed.is_empty() {
                anyhow::bail!("failed to remove volumes: {}", failed.join(", "));
            }
        }
        VolumeCommands::Inspect(inspect_args) => {
            let mut results = Vec::new();
            for name in &inspect_args.volumes {
                match engine.inspect_volume(name).await {
                    Ok(vol) => results.push(vol),
                    Err(e) => eprintln!("Error inspecting volume {}: {}", name, e),
                }
            }
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}

fn create_request(args: &VolumeCreateArgs) -> Result<VolumeCreateRequest> {
    Ok(VolumeCreateRequest {
        name: args.name.clone().unwrap_or_default(),
        driver: args.driver.clone(),
        driver_opts: parse_key_values(&args.opt)?,
        labels: parse_key_values(&args.label)?,
    })
}

/// Parse `key=value` flags
fn parse_key_values(values: &[String]) -> Result<HashMap<String, String>> {
    values
        .iter()
        .map(|value| match value.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(HyperError::Config(format!(
                "invalid key=value pair: {}",
                value
            ))),
        })
        .collect()
}

fn format_table(volumes: &[Volume]) -> String {
    let mut out = format!("{:<20} {:<40} {}\n", "DRIVER", "VOLUME NAME", "SOURCE");
    for vol in volumes {
        let source = vol.labels.get(SOURCE_LABEL).map(String::as_str).unwrap_or("");
        out.push_str(&format!("{:<20} {:<40} {}\n", vol.driver, vol.name, source));
    }
    out
}
