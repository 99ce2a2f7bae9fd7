//! Configuration validation.
//!
//! Validation is a separate pass so loading stays side-effect free: a
//! config can be loaded and inspected without touching the filesystem.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::types::{GantryConfig, TargetConfig, TargetKind};

impl GantryConfig {
    /// Validate the configuration against the project root.
    ///
    /// Checks that both entry points exist, that output locations live
    /// under the destination root (the clean step removes that root, so
    /// anything outside it would survive cleaning), and that the notifier
    /// and server ports do not collide.
    pub fn validate(&self, root: &Path) -> Result<()> {
        validate_target(root, TargetKind::Client, &self.client)?;
        validate_target(root, TargetKind::Server, &self.server)?;

        for (kind, target) in [
            (TargetKind::Client, &self.client),
            (TargetKind::Server, &self.server),
        ] {
            if !target.out_dir.starts_with(&self.dest_root) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{kind}.out_dir"),
                    message: format!(
                        "{} is outside the destination root {}",
                        target.out_dir.display(),
                        self.dest_root.display()
                    ),
                });
            }
        }

        if !self.assets.dest.starts_with(&self.dest_root) {
            return Err(ConfigError::InvalidValue {
                field: "assets.dest".to_string(),
                message: format!(
                    "{} is outside the destination root {}",
                    self.assets.dest.display(),
                    self.dest_root.display()
                ),
            });
        }

        if self.notifier.port == self.serve.port {
            return Err(ConfigError::InvalidValue {
                field: "notifier.port".to_string(),
                message: format!("collides with serve.port ({})", self.serve.port),
            });
        }

        if self.notifier.settle_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notifier.settle_ms".to_string(),
                message: "settle window must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

fn validate_target(root: &Path, kind: TargetKind, target: &TargetConfig) -> Result<()> {
    let entry = resolve(root, &target.entry);
    if !entry.exists() {
        return Err(ConfigError::EntryNotFound(entry));
    }

    if target.bundle_name.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: format!("{kind}.bundle_name"),
            message: "bundle name must not be empty".to_string(),
        });
    }

    Ok(())
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project_with_entries() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/client")).unwrap();
        fs::create_dir_all(temp.path().join("src/server")).unwrap();
        fs::write(temp.path().join("src/client/index.js"), "export {}").unwrap();
        fs::write(temp.path().join("src/server/index.js"), "export {}").unwrap();
        temp
    }

    #[test]
    fn test_validate_ok() {
        let temp = project_with_entries();
        let config = GantryConfig::default_config();
        assert!(config.validate(temp.path()).is_ok());
    }

    #[test]
    fn test_validate_missing_entry() {
        let temp = TempDir::new().unwrap();
        let config = GantryConfig::default_config();

        let err = config.validate(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EntryNotFound(_)));
    }

    #[test]
    fn test_validate_out_dir_outside_dest_root() {
        let temp = project_with_entries();
        let mut config = GantryConfig::default_config();
        config.client.out_dir = "elsewhere/public".into();

        let err = config.validate(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "client.out_dir"));
    }

    #[test]
    fn test_validate_port_collision() {
        let temp = project_with_entries();
        let mut config = GantryConfig::default_config();
        config.notifier.port = config.serve.port;

        let err = config.validate(temp.path()).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { field, .. } if field == "notifier.port")
        );
    }

    #[test]
    fn test_validate_zero_settle_window() {
        let temp = project_with_entries();
        let mut config = GantryConfig::default_config();
        config.notifier.settle_ms = 0;

        assert!(config.validate(temp.path()).is_err());
    }
}
