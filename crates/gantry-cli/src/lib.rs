//! Gantry CLI - command-line surface over the orchestration pipeline.
//!
//! The CLI is organized into a few small modules:
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - one module per subcommand
//! - [`error`] - CLI error types and miette conversion
//! - [`logger`] - tracing setup
//! - [`ui`] - terminal status messages

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
