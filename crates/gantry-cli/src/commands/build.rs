//! One-shot build command.

use gantry_config::{GantryConfig, Mode};
use gantry_core::Pipeline;

use crate::cli::BuildArgs;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let root = super::project_root(&args.project)?;
    let mode = if args.dev {
        Mode::Development
    } else {
        Mode::Production
    };
    let config = GantryConfig::load(&root, args.project.config.as_deref(), mode)?;
    config.validate(&root)?;

    ui::info(&format!("building in {mode} mode"));

    let pipeline = Pipeline::new(config, root);
    let report = pipeline.build_once().await?;

    ui::success(&format!(
        "client bundle: {} bytes in {}ms",
        report.client.stats.output_bytes,
        report.client.stats.duration.as_millis()
    ));
    ui::success(&format!(
        "server bundle: {} bytes in {}ms",
        report.server.stats.output_bytes,
        report.server.stats.duration.as_millis()
    ));
    ui::success(&format!("copied {} asset files", report.assets_copied));

    // Successful compiles only ever carry warning diagnostics.
    let warnings = report.client.diagnostics.len() + report.server.diagnostics.len();
    if warnings > 0 {
        ui::warning(&format!("{warnings} compiler warning(s), see the log above"));
    }
    Ok(())
}
