//! Configuration for the Gantry development orchestrator.
//!
//! This crate defines the immutable configuration value that is loaded once
//! at startup and handed out in slices: each pipeline component receives
//! only the section it needs (`TargetConfig` for a compiler adapter,
//! `ServeConfig` for the process supervisor, and so on). Nothing mutates
//! configuration after loading.
//!
//! Loading merges, in priority order: built-in defaults, a `gantry.toml`
//! file, and `GANTRY_*` environment variables.

pub mod error;
pub mod loading;
pub mod types;
pub mod validation;

pub use error::{ConfigError, Result};
pub use types::{
    AssetsConfig, CompilerConfig, GantryConfig, Mode, NotifierConfig, ServeConfig, TargetConfig,
    TargetKind, WatchConfig,
};
