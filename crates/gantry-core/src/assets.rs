//! Static asset copying.
//!
//! A pure glob-to-directory copy with no dependency on the rest of the
//! pipeline. Files are copied verbatim, preserving their paths relative to
//! the static prefix of the glob. Re-running with unchanged sources yields
//! identical destination content. Individual unreadable files are reported
//! and skipped; only an unusable destination aborts the sync.

use std::path::{Component, Path, PathBuf};

use gantry_config::{AssetsConfig, WatchConfig};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::watcher::{FileChange, FileWatcher};

/// Asset copier for one glob/destination pair.
#[derive(Debug, Clone)]
pub struct AssetSync {
    glob: String,
    dest: PathBuf,
    root: PathBuf,
}

impl AssetSync {
    pub fn new(config: AssetsConfig, root: PathBuf) -> Self {
        Self {
            glob: config.glob,
            dest: config.dest,
            root,
        }
    }

    /// Copy all matching files. Returns the number of files copied.
    ///
    /// This does blocking filesystem work; callers on the async runtime
    /// wrap it in `spawn_blocking`.
    pub fn sync(&self) -> Result<usize> {
        let dest = resolve(&self.root, &self.dest);
        std::fs::create_dir_all(&dest).map_err(|e| Error::AssetSync {
            dest: dest.clone(),
            source: e,
        })?;

        let pattern = resolve(&self.root, Path::new(&self.glob))
            .to_string_lossy()
            .into_owned();
        let base = self.base_dir();

        let entries = glob::glob(&pattern).map_err(|e| {
            Error::Config(gantry_config::ConfigError::InvalidValue {
                field: "assets.glob".to_string(),
                message: e.to_string(),
            })
        })?;

        let mut copied = 0usize;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(target: "gantry::assets", "unreadable glob entry: {e}");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }

            let rel = path.strip_prefix(&base).unwrap_or(&path);
            let target = dest.join(rel);

            if let Some(parent) = target.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!(
                        target: "gantry::assets",
                        "skipping {}: cannot create {}: {e}",
                        path.display(),
                        parent.display()
                    );
                    continue;
                }
            }

            match std::fs::copy(&path, &target) {
                Ok(_) => copied += 1,
                Err(e) => {
                    tracing::warn!(
                        target: "gantry::assets",
                        "skipping {}: {e}",
                        path.display()
                    );
                }
            }
        }

        tracing::info!(target: "gantry::assets", "synced {copied} asset files");
        Ok(copied)
    }

    /// Watch the glob's base directory for changes.
    pub fn watch(&self, watch: &WatchConfig) -> Result<(FileWatcher, mpsc::Receiver<FileChange>)> {
        FileWatcher::new(self.base_dir(), watch.ignore.clone(), watch.debounce_ms)
    }

    /// The static (meta-character free) prefix of the glob, resolved
    /// against the project root. Relative destination paths are computed
    /// from here.
    pub fn base_dir(&self) -> PathBuf {
        let mut base = PathBuf::new();
        for component in Path::new(&self.glob).components() {
            match component {
                Component::Normal(part) => {
                    let part_str = part.to_string_lossy();
                    if part_str.contains(['*', '?', '[']) {
                        break;
                    }
                    base.push(part);
                }
                other => base.push(other.as_os_str()),
            }
        }
        resolve(&self.root, &base)
    }
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

    fn sync_for(temp: &TempDir) -> AssetSync {
        AssetSync::new(
            AssetsConfig {
                glob: "src/assets/**".to_string(),
                dest: "dist/public".into(),
            },
            temp.path().to_path_buf(),
        )
    }

    #[test]
    fn test_base_dir_stops_at_meta_characters() {
        let temp = TempDir::new().unwrap();
        let assets = sync_for(&temp);
        assert_eq!(assets.base_dir(), temp.path().join("src/assets"));
    }

    #[test]
    fn test_sync_preserves_relative_paths() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/assets/img")).unwrap();
        fs::write(temp.path().join("src/assets/favicon.ico"), b"icon").unwrap();
        fs::write(temp.path().join("src/assets/img/logo.png"), b"png").unwrap();

        let copied = sync_for(&temp).sync().unwrap();
        assert_eq!(copied, 2);
        assert_eq!(
            fs::read(temp.path().join("dist/public/favicon.ico")).unwrap(),
            b"icon"
        );
        assert_eq!(
            fs::read(temp.path().join("dist/public/img/logo.png")).unwrap(),
            b"png"
        );
    }

    #[test]
    fn test_sync_is_idempotent() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/assets")).unwrap();
        fs::write(temp.path().join("src/assets/style.css"), b"body{}").unwrap();

        let assets = sync_for(&temp);
        assert_eq!(assets.sync().unwrap(), 1);
        let first = fs::read(temp.path().join("dist/public/style.css")).unwrap();

        assert_eq!(assets.sync().unwrap(), 1);
        let second = fs::read(temp.path().join("dist/public/style.css")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sync_with_no_matches_is_ok() {
        let temp = TempDir::new().unwrap();
        assert_eq!(sync_for(&temp).sync().unwrap(), 0);
    }
}
