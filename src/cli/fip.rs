//! `hyper fip` command implementation

use crate::cli::GlobalArgs;
use crate::engine::NetworkApi;
use clap::{Args, Subcommand};
use std::collections::HashMap;

/// Arguments for the `fip` command
#[derive(Args)]
pub struct FipArgs {
    #[command(subcommand)]
    pub command: FipCommands,
}

/// Floating IP subcommands
#[derive(Subcommand)]
pub enum FipCommands {
    /// Allocate new floating IPs
    Allocate(FipAllocateArgs),
    /// Release one or more floating IPs
    Release(FipReleaseArgs),
    /// Attach a floating IP to a container
    Associate(FipAssociateArgs),
    /// Detach the floating IP of a container
    Disassociate(FipDisassociateArgs),
    /// List floating IPs
    Ls,
}

#[derive(Args)]
pub struct FipAllocateArgs {
    /// Number of addresses to allocate
    #[arg(default_value = "1")]
    pub count: u32,
}

#[derive(Args)]
pub struct FipReleaseArgs {
    #[arg(required = true)]
    pub fips: Vec<String>,
}

#[derive(Args)]
pub struct FipAssociateArgs {
    pub fip: String,
    pub container: String,
}

#[derive(Args)]
pub struct FipDisassociateArgs {
    pub container: String,
}

/// Execute the `fip` command
pub async fn execute(args: FipArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;

    match args.command {
        FipCommands::Allocate(allocate) => {
            for ip in engine.allocate_fips(allocate.count).await? {
                println!("{}", ip);
            }
        }
        FipCommands::Release(release) => {
            let mut failed = Vec::new();
            for ip in &release.fips {
                if let Err(e) = engine.release_fip(ip).await {
                    eprintln!("Error releasing {}: {}", ip, e);
                    failed.push(ip.as_str());
                }
            }
            if !failed.is_empty() {
                anyhow::bail!("failed to release floating IPs: {}", failed.join(", "));
            }
        }
        FipCommands::Associate(associate) => {
            engine
                .associate_fip(&associate.fip, &associate.container)
                .await?;
        }
        FipCommands::Disassociate(disassociate) => {
            let ip = engine.disassociate_fip(&disassociate.container).await?;
            println!("{}", ip);
        }
        FipCommands::Ls => {
            let fips = engine.list_fips().await?;
            print!("{}", format_table(&fips));
        }
    }

    Ok(())
}

fn format_table(fips: &[HashMap<String, String>]) -> String {
    let field = |fip: &HashMap<String, String>, key: &str| fip.get(key).cloned().unwrap_or_default();

    let mut out = format!("{:<20} {}\n", "FLOATING IP", "CONTAINER");
    for fip in fips {
        out.push_str(&format!(
            "{:<20} {}\n",
            field(fip, "fip"),
            field(fip, "container")
        ));
    }
    out
}
