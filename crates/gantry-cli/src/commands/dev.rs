//! Development session command.
//!
//! Clean, build both bundles in watch mode, sync assets, start the
//! supervised application server and the reload notifier, then react to
//! changes until Ctrl+C.

use gantry_config::{GantryConfig, Mode};
use gantry_core::Pipeline;

use crate::cli::DevArgs;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: DevArgs) -> Result<()> {
    let root = super::project_root(&args.project)?;
    let mut config = GantryConfig::load(&root, args.project.config.as_deref(), Mode::Development)?;
    if let Some(port) = args.port {
        config.serve.port = port;
    }
    config.validate(&root)?;

    ui::info(&format!("project root: {}", root.display()));
    ui::info(&format!(
        "client {} -> {}",
        config.client.entry.display(),
        config.client.bundle_path().display()
    ));
    ui::info(&format!(
        "server {} -> {}",
        config.server.entry.display(),
        config.server.bundle_path().display()
    ));
    ui::info(&format!(
        "app server on port {}, reload notifier on port {}",
        config.serve.port, config.notifier.port
    ));

    let pipeline = Pipeline::new(config, root);
    let session = pipeline
        .run_dev(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    if let Err(e) = session {
        ui::error("development session failed");
        return Err(e.into());
    }
    ui::success("development session ended");
    Ok(())
}
