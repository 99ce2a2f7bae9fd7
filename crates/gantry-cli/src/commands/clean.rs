//! Clean command: remove the destination root.

use gantry_config::{GantryConfig, Mode};
use gantry_core::Pipeline;

use crate::cli::ProjectArgs;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: ProjectArgs) -> Result<()> {
    let root = super::project_root(&args)?;
    let config = GantryConfig::load(&root, args.config.as_deref(), Mode::from_env())?;
    let dest = config.dest_root.clone();

    let pipeline = Pipeline::new(config, root);
    pipeline.clean().await?;

    ui::success(&format!("removed {}", dest.display()));
    Ok(())
}
