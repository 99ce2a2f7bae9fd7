//! Core pipeline for the Gantry development orchestrator.
//!
//! Gantry drives a two-target web project through an external compiler:
//! a client bundle, a server bundle, and a tree of static assets. This
//! crate contains everything behind the CLI surface:
//!
//! - [`CompilerAdapter`]: runs the external compiler per target, with
//!   staged output publishing and watch-mode rebuild streams
//! - [`AssetSync`]: glob-based static asset copying
//! - [`ProcessSupervisor`]: lifecycle of the application server process,
//!   with coalesced restarts and graceful termination
//! - [`ReloadNotifier`]: Server-Sent Events endpoint that tells browsers
//!   to reload, debounced through a settle window
//! - [`Pipeline`]: the coordinator tying the above together so output is
//!   never served stale or half-written

pub mod assets;
pub mod compiler;
pub mod debounce;
pub mod diagnostics;
pub mod error;
pub mod notifier;
pub mod pipeline;
pub mod supervisor;
pub mod watcher;

pub use assets::AssetSync;
pub use compiler::CompilerAdapter;
pub use debounce::Debouncer;
pub use diagnostics::{BuildStats, CompilationResult, Diagnostic, Severity};
pub use error::{Error, Result};
pub use notifier::{ReloadEvent, ReloadNotifier};
pub use pipeline::{BuildReport, Pipeline, PipelineRun, PipelineState};
pub use supervisor::{ProcessSupervisor, SupervisorEvent, SupervisorState};
pub use watcher::{FileChange, FileWatcher};
