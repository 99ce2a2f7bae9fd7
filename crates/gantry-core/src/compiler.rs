//! Compiler adapter: wraps one external build invocation for one target.
//!
//! The adapter runs the configured compiler command with `{entry}` and
//! `{outfile}` substituted, and emits one `CompilationResult` per compile
//! on a channel. In watch mode the stream is infinite: a filesystem
//! watcher over the target's watch root re-runs the compile on every
//! debounced change. Without watch mode, exactly one result is emitted and
//! the channel closes.
//!
//! Output is compiled into a staging file next to the bundle and renamed
//! into place only on success, so a failed compile never overwrites the
//! last-known-good output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use gantry_config::{CompilerConfig, Mode, TargetConfig, TargetKind, WatchConfig};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::diagnostics::{BuildStats, CompilationResult, Diagnostic};
use crate::error::Result;
use crate::watcher::FileWatcher;

/// Adapter over the external compiler for a single target.
pub struct CompilerAdapter {
    kind: TargetKind,
    target: TargetConfig,
    compiler: CompilerConfig,
    watch: WatchConfig,
    root: PathBuf,
    mode: Mode,
}

impl CompilerAdapter {
    pub fn new(
        kind: TargetKind,
        target: TargetConfig,
        compiler: CompilerConfig,
        watch: WatchConfig,
        root: PathBuf,
        mode: Mode,
    ) -> Self {
        Self {
            kind,
            target,
            compiler,
            watch,
            root,
            mode,
        }
    }

    /// Start compiling and return the result stream.
    ///
    /// Invalid target configuration (missing entry point) fails here,
    /// before any result is emitted.
    pub fn spawn(self, watch_mode: bool) -> Result<mpsc::Receiver<CompilationResult>> {
        let entry = resolve(&self.root, &self.target.entry);
        if !entry.exists() {
            return Err(gantry_config::ConfigError::EntryNotFound(entry).into());
        }

        // Create the watcher up front so setup errors surface to the
        // caller instead of dying inside the task.
        let watcher = if watch_mode {
            let watch_root = resolve(&self.root, &self.target.watch_root());
            Some(FileWatcher::new(
                watch_root,
                self.watch.ignore.clone(),
                self.watch.debounce_ms,
            )?)
        } else {
            None
        };

        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let result = self.compile_once().await;
            if tx.send(result).await.is_err() {
                return;
            }

            if let Some((_watcher, mut changes)) = watcher {
                while let Some(change) = changes.recv().await {
                    tracing::debug!(
                        target: "gantry::compile",
                        "{}: change detected at {}",
                        self.kind,
                        change.path().display()
                    );
                    let result = self.compile_once().await;
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    /// Run the external compiler once.
    async fn compile_once(&self) -> CompilationResult {
        let started = Instant::now();
        let entry = resolve(&self.root, &self.target.entry);
        let out_dir = resolve(&self.root, &self.target.out_dir);
        let bundle = out_dir.join(&self.target.bundle_name);
        let staging = out_dir.join(format!(".{}.staging", self.target.bundle_name));

        if let Err(e) = tokio::fs::create_dir_all(&out_dir).await {
            let result = CompilationResult::failure(
                self.kind,
                vec![Diagnostic::error(format!(
                    "cannot create output directory {}: {e}",
                    out_dir.display()
                ))],
                BuildStats {
                    duration: started.elapsed(),
                    output_bytes: 0,
                },
            );
            result.log();
            return result;
        }

        let args = self.substituted_args(&entry, &staging);
        let output = Command::new(&self.compiler.command)
            .args(&args)
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let result = match output {
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if output.status.success() && staging.exists() {
                    match self.publish(&staging, &bundle).await {
                        Ok(output_bytes) => CompilationResult::success(
                            self.kind,
                            warnings_from_stderr(&stderr),
                            BuildStats {
                                duration: started.elapsed(),
                                output_bytes,
                            },
                        ),
                        Err(e) => CompilationResult::failure(
                            self.kind,
                            vec![Diagnostic::error(format!(
                                "cannot publish bundle {}: {e}",
                                bundle.display()
                            ))],
                            BuildStats {
                                duration: started.elapsed(),
                                output_bytes: 0,
                            },
                        ),
                    }
                } else {
                    // Failed compile: drop the staging file, leaving any
                    // previous bundle untouched.
                    let _ = tokio::fs::remove_file(&staging).await;
                    CompilationResult::failure(
                        self.kind,
                        errors_from_stderr(&stderr),
                        BuildStats {
                            duration: started.elapsed(),
                            output_bytes: 0,
                        },
                    )
                }
            }
            Err(e) => CompilationResult::failure(
                self.kind,
                vec![Diagnostic::error(format!(
                    "cannot run compiler '{}': {e}",
                    self.compiler.command
                ))],
                BuildStats {
                    duration: started.elapsed(),
                    output_bytes: 0,
                },
            ),
        };

        result.log();
        result
    }

    /// Move the staged output into its final location.
    async fn publish(&self, staging: &Path, bundle: &Path) -> std::io::Result<u64> {
        tokio::fs::rename(staging, bundle).await?;
        let metadata = tokio::fs::metadata(bundle).await?;
        Ok(metadata.len())
    }

    fn substituted_args(&self, entry: &Path, outfile: &Path) -> Vec<String> {
        let entry_str = entry.to_string_lossy();
        let outfile_str = outfile.to_string_lossy();

        let mut args: Vec<String> = self.compiler.args.clone();
        if self.mode.is_development() {
            args.extend(self.compiler.dev_args.iter().cloned());
        }

        args.into_iter()
            .map(|a| {
                a.replace("{entry}", &entry_str)
                    .replace("{outfile}", &outfile_str)
            })
            .collect()
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Warnings the compiler printed alongside a successful build.
fn warnings_from_stderr(stderr: &str) -> Vec<Diagnostic> {
    stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| line.to_ascii_lowercase().contains("warning"))
        .map(Diagnostic::warning)
        .collect()
}

/// Diagnostics for a failed build; every non-warning line is an error.
fn errors_from_stderr(stderr: &str) -> Vec<Diagnostic> {
    stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            if line.to_ascii_lowercase().contains("warning") {
                Diagnostic::warning(line)
            } else {
                Diagnostic::error(line)
            }
        })
        .collect()
}
