//! Configuration loading via figment.
//!
//! Priority: environment variables > `gantry.toml` > built-in defaults.
//! The operating mode is decided separately (subcommand + `GANTRY_ENV`)
//! and applied after extraction.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};

use crate::error::{ConfigError, Result};
use crate::types::{GantryConfig, Mode};

/// Default config file name looked up in the project root.
pub const CONFIG_FILE: &str = "gantry.toml";

impl GantryConfig {
    /// Load configuration for the given project root and mode.
    ///
    /// `config_path` overrides the default `gantry.toml` lookup; passing a
    /// path that does not exist is an error, while a missing default file
    /// silently falls back to defaults.
    pub fn load(root: &Path, config_path: Option<&Path>, mode: Mode) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config()));

        let file = match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                };
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path));
                }
                Some(path)
            }
            None => {
                let default = root.join(CONFIG_FILE);
                default.exists().then_some(default)
            }
        };

        if let Some(path) = file {
            tracing::debug!("loading config file {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // GANTRY_SERVE__PORT=3000 style overrides, double underscore for
        // nesting so field names keep their single underscores.
        figment = figment.merge(Env::prefixed("GANTRY_").split("__"));

        let mut config: GantryConfig = figment
            .extract()
            .map_err(|e| ConfigError::Extract(e.to_string()))?;
        config.mode = mode;

        Ok(config)
    }
}
