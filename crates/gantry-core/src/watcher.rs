//! Filesystem watcher with debouncing and ignore filtering.
//!
//! One watcher instance backs each compiler adapter in watch mode, plus the
//! asset sync. Raw notify events are debounced per path and filtered
//! against the configured ignore patterns before they reach the channel.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// A debounced change under the watched root.
#[derive(Debug, Clone)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// The path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive directory watcher.
///
/// Dropping the watcher stops event delivery; the receiver then drains and
/// closes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root` recursively, ignoring `ignore` patterns and collapsing
    /// repeat events on the same path within `debounce_ms`.
    pub fn new(
        root: PathBuf,
        ignore: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(Error::Config(gantry_config::ConfigError::EntryNotFound(
                root,
            )));
        }

        let (tx, rx) = mpsc::channel(100);
        let debounce = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                for path in &event.paths {
                    if should_ignore(path, &root_clone, &ignore) {
                        continue;
                    }

                    let now = Instant::now();
                    if let Some((last_path, last_time)) = &last_event {
                        if last_path == path && now.duration_since(*last_time) < debounce {
                            continue;
                        }
                    }
                    last_event = Some((path.clone(), now));

                    let change = match event.kind {
                        notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                        notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                        notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                        _ => continue,
                    };

                    let _ = tx.blocking_send(change);
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Whether a path is filtered out before reaching the channel.
///
/// Paths outside the root, paths matching an ignore pattern, and hidden
/// files are skipped.
fn should_ignore(path: &Path, root: &Path, ignore: &[String]) -> bool {
    if !path.starts_with(root) {
        return true;
    }

    let rel_path = match path.strip_prefix(root) {
        Ok(p) => p,
        Err(_) => return true,
    };
    let path_str = rel_path.to_string_lossy();

    for pattern in ignore {
        if let Some(suffix) = pattern.strip_prefix('*') {
            // Extension pattern like "*.log"
            if path_str.ends_with(suffix) {
                return true;
            }
        } else if path_str.starts_with(pattern.as_str())
            || path_str.contains(&format!("/{pattern}"))
        {
            // Directory pattern like "node_modules"
            return true;
        }
    }

    for component in rel_path.components() {
        if let Some(name) = component.as_os_str().to_str() {
            if name.starts_with('.') && name != "." && name != ".." {
                return true;
            }
        }
    }

    false
}
