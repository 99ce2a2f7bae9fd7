//! Command-line interface definition.
//!
//! Defines the complete CLI structure with clap's derive macros:
//!
//! - `gantry dev` - clean, build, watch, supervise, reload
//! - `gantry build` - one-shot production build
//! - `gantry clean` - remove the destination root

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Gantry - development orchestrator for client/server web projects
#[derive(Parser, Debug)]
#[command(
    name = "gantry",
    version,
    about = "Build orchestrator for two-target web projects",
    long_about = "Gantry drives an external compiler over a client bundle, a server bundle\n\
                  and a tree of static assets. In dev mode it watches sources, rebuilds\n\
                  incrementally, restarts the application server when its bundle changes,\n\
                  and tells connected browsers to reload."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development session: build, watch, serve, reload
    Dev(DevArgs),

    /// Clean and build both bundles plus assets once
    Build(BuildArgs),

    /// Remove the destination root
    Clean(ProjectArgs),
}

/// Arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root directory (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Configuration file, relative to the project root
    ///
    /// Defaults to gantry.toml when present; built-in defaults apply
    /// otherwise.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DevArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Override the application server port
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Build with development settings (inline source maps, no minify)
    #[arg(long)]
    pub dev: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dev_accepts_port_override() {
        let cli = Cli::parse_from(["gantry", "dev", "--port", "8080"]);
        match cli.command {
            Command::Dev(args) => assert_eq!(args.port, Some(8080)),
            _ => panic!("expected dev command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["gantry", "build", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Build(_)));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["gantry", "dev", "-v", "-q"]).is_err());
    }
}
