//! `hyper create` command implementation

use crate::cli::run::{create_container, ContainerArgs};
use crate::cli::GlobalArgs;
use clap::Args;

/// Arguments for the `create` command
#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub container: ContainerArgs,
}

/// Execute the `create` command
pub async fn execute(args: CreateArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let engine = global.engine()?;
    let id = create_container(engine, global.transfer(), &args.container).await?;
    println!("{}", id);
    Ok(())
}
