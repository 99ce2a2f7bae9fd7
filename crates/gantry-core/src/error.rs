//! Error taxonomy for the pipeline core.
//!
//! Configuration errors are fatal and abort before any work starts.
//! Compilation, asset and supervisor errors are recoverable: they are
//! reported through the same structured log channel as successes and never
//! revert output that has already been published.

use std::path::PathBuf;
use std::time::Duration;

use gantry_config::TargetKind;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad target or path configuration. Fatal; raised before any work.
    #[error("configuration error: {0}")]
    Config(#[from] gantry_config::ConfigError),

    /// A target failed to compile during the initial build.
    #[error("{target} compilation failed")]
    Compilation {
        /// Target whose build failed.
        target: TargetKind,
    },

    /// Asset copying failed outright (the destination was unusable, as
    /// opposed to individual files being skipped).
    #[error("asset sync failed for {}: {source}", .dest.display())]
    AssetSync {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The supervised process produced no readiness signal in time.
    #[error("server process produced no readiness signal within {:?}", .timeout)]
    StartupTimeout { timeout: Duration },

    /// The supervised process exited while it was supposed to be running.
    #[error("server process exited unexpectedly (status {status:?})")]
    ProcessCrash { status: Option<i32> },

    /// An operation was requested in a state that does not allow it.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// The supervisor task is gone (session already shut down).
    #[error("process supervisor is no longer running")]
    SupervisorGone,

    /// File watching errors.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Reload notifier transport errors.
    #[error("reload notifier error: {0}")]
    Notifier(String),

    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
