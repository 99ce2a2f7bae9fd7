//! Command implementations.
//!
//! One module per subcommand, each exposing an `execute` function taking
//! the parsed arguments.

pub mod build;
pub mod clean;
pub mod dev;

use std::path::PathBuf;

use crate::cli::ProjectArgs;
use crate::error::Result;

pub use build::execute as build_execute;
pub use clean::execute as clean_execute;
pub use dev::execute as dev_execute;

/// Resolve the project root from the arguments or the working directory.
pub(crate) fn project_root(args: &ProjectArgs) -> Result<PathBuf> {
    match &args.root {
        Some(root) => Ok(root.clone()),
        None => Ok(std::env::current_dir()?),
    }
}
