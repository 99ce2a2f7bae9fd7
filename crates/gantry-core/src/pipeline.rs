//! Pipeline coordinator.
//!
//! Owns the ordering between cleaning, compiling, asset copying, process
//! supervision, and reload notification. The dev session is a single
//! select loop over the compiler result streams, the asset watcher, and
//! the supervisor's event stream; restart and reload requests both pass
//! through debouncers so change storms collapse into one restart and one
//! reload.
//!
//! Once Ready has been reached, no later failure reverts the served
//! output: rebuild failures keep the last-known-good bundles and only mark
//! the session degraded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gantry_config::{GantryConfig, TargetKind};
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};

use crate::assets::AssetSync;
use crate::compiler::CompilerAdapter;
use crate::debounce::Debouncer;
use crate::diagnostics::CompilationResult;
use crate::error::{Error, Result};
use crate::notifier::ReloadNotifier;
use crate::supervisor::{ProcessSupervisor, SupervisorEvent};

/// Coordinator state, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Cleaning,
    Building,
    Ready,
    Rebuilding,
    Failed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Cleaning => "cleaning",
            PipelineState::Building => "building",
            PipelineState::Ready => "ready",
            PipelineState::Rebuilding => "rebuilding",
            PipelineState::Failed => "failed",
        }
    }
}

/// Outcome of a one-shot production build.
#[derive(Debug)]
pub struct BuildReport {
    pub client: CompilationResult,
    pub server: CompilationResult,
    pub assets_copied: usize,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.client.success && self.server.success
    }
}

/// Mutable record of the current session, created once per run and
/// updated in place.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// When the session started.
    pub started_at: std::time::Instant,
    /// Most recent client compile result.
    pub last_client: Option<CompilationResult>,
    /// Most recent server compile result.
    pub last_server: Option<CompilationResult>,
    /// True once every required target has succeeded at least once.
    pub ready: bool,
    /// True while a rebuild failure leaves last-known-good output serving.
    pub degraded: bool,
}

impl PipelineRun {
    fn start() -> Self {
        Self {
            started_at: std::time::Instant::now(),
            last_client: None,
            last_server: None,
            ready: false,
            degraded: false,
        }
    }

    fn record(&mut self, result: CompilationResult) {
        match result.target {
            TargetKind::Client => self.last_client = Some(result),
            TargetKind::Server => self.last_server = Some(result),
        }
        let all_good = |r: &Option<CompilationResult>| r.as_ref().is_some_and(|r| r.success);
        self.degraded = self.ready && !(all_good(&self.last_client) && all_good(&self.last_server));
    }
}

/// First results of a session's compiles plus the live result streams.
struct InitialBuild {
    client: CompilationResult,
    server: CompilationResult,
    assets_copied: usize,
    client_rx: mpsc::Receiver<CompilationResult>,
    server_rx: mpsc::Receiver<CompilationResult>,
}

impl InitialBuild {
    fn failed_target(&self) -> Option<TargetKind> {
        if !self.client.success {
            Some(TargetKind::Client)
        } else if !self.server.success {
            Some(TargetKind::Server)
        } else {
            None
        }
    }
}

/// The orchestration pipeline for one project.
pub struct Pipeline {
    config: GantryConfig,
    root: PathBuf,
    state_tx: watch::Sender<PipelineState>,
    ready_tx: watch::Sender<bool>,
    run: RwLock<PipelineRun>,
    /// Set while a dev session is live, for observers.
    supervisor: RwLock<Option<ProcessSupervisor>>,
    notifier: RwLock<Option<Arc<ReloadNotifier>>>,
}

impl Pipeline {
    pub fn new(config: GantryConfig, root: PathBuf) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        let (ready_tx, _) = watch::channel(false);
        Self {
            config,
            root,
            state_tx,
            ready_tx,
            run: RwLock::new(PipelineRun::start()),
            supervisor: RwLock::new(None),
            notifier: RwLock::new(None),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state_tx.borrow()
    }

    /// Watchable state stream for observers and tests.
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Wait until the session has reached Ready once.
    ///
    /// A one-shot signal, decoupled from the state stream: it stays set
    /// through later Rebuilding transitions and resolves immediately when
    /// readiness was already reached. Callers racing a session that may
    /// fail should pair this with a timeout or the state stream.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Snapshot of the current session record.
    pub fn run(&self) -> PipelineRun {
        self.run.read().clone()
    }

    /// Supervisor handle of the live dev session, if any.
    pub fn supervisor(&self) -> Option<ProcessSupervisor> {
        self.supervisor.read().clone()
    }

    /// Notifier of the live dev session, if any.
    pub fn notifier(&self) -> Option<Arc<ReloadNotifier>> {
        self.notifier.read().clone()
    }

    /// Remove the destination root entirely.
    pub async fn clean(&self) -> Result<()> {
        self.set_state(PipelineState::Cleaning);
        let dest = self.resolve(&self.config.dest_root);

        match tokio::fs::remove_dir_all(&dest).await {
            Ok(()) => {
                tracing::info!(target: "gantry::pipeline", "cleaned {}", dest.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// One-shot build: clean, then compile both targets and copy assets.
    ///
    /// Used by the production build command. No watchers, no supervisor.
    pub async fn build_once(&self) -> Result<BuildReport> {
        *self.run.write() = PipelineRun::start();
        self.clean().await?;
        self.set_state(PipelineState::Building);

        let initial = self.initial_build(false).await?;

        let report = BuildReport {
            client: initial.client,
            server: initial.server,
            assets_copied: initial.assets_copied,
        };
        {
            let mut run = self.run.write();
            run.record(report.client.clone());
            run.record(report.server.clone());
            run.ready = report.success();
        }
        if report.success() {
            self.set_state(PipelineState::Idle);
            Ok(report)
        } else {
            self.set_state(PipelineState::Failed);
            let target = if report.client.success {
                TargetKind::Server
            } else {
                TargetKind::Client
            };
            Err(Error::Compilation { target })
        }
    }

    /// Run the full dev session until `shutdown` resolves.
    ///
    /// Clean, build both targets in watch mode, sync assets, start the
    /// supervised server and the reload notifier, then react to changes.
    /// An initial build failure aborts before the server is ever started.
    pub async fn run_dev(&self, shutdown: impl std::future::Future<Output = ()> + Send) -> Result<()> {
        *self.run.write() = PipelineRun::start();
        let _ = self.ready_tx.send(false);
        self.clean().await?;
        self.set_state(PipelineState::Building);

        let assets = AssetSync::new(self.config.assets.clone(), self.root.clone());
        let initial = match self.initial_build(true).await {
            Ok(initial) => initial,
            Err(e) => {
                self.set_state(PipelineState::Failed);
                return Err(e);
            }
        };
        {
            let mut run = self.run.write();
            run.record(initial.client.clone());
            run.record(initial.server.clone());
        }
        if let Some(target) = initial.failed_target() {
            self.set_state(PipelineState::Failed);
            return Err(Error::Compilation { target });
        }
        let mut client_rx = initial.client_rx;
        let mut server_rx = initial.server_rx;

        // Both bundles and the assets exist on disk; the server may start.
        let (supervisor, mut events) =
            ProcessSupervisor::new(self.config.serve.clone(), self.root.clone());
        if let Err(e) = supervisor.start().await {
            self.set_state(PipelineState::Failed);
            return Err(e);
        }
        *self.supervisor.write() = Some(supervisor.clone());

        // The server child is live from here on; any further setup
        // failure must stop it again before surfacing.
        let notifier = Arc::new(ReloadNotifier::new(&self.config.notifier));
        if let Err(e) = notifier.serve().await {
            self.abort_session(&supervisor).await;
            return Err(e);
        }
        *self.notifier.write() = Some(notifier.clone());

        let (_asset_watcher, mut asset_rx) = match assets.watch(&self.config.watch) {
            Ok(watch) => watch,
            Err(e) => {
                self.abort_session(&supervisor).await;
                return Err(e);
            }
        };

        // Server rebuilds funnel through a settle window before the
        // supervisor sees them; the supervisor coalesces whatever still
        // overlaps.
        let restart_supervisor = supervisor.clone();
        let restart_debouncer = Debouncer::spawn(
            Duration::from_millis(self.config.notifier.settle_ms),
            move || {
                let supervisor = restart_supervisor.clone();
                async move {
                    supervisor.restart();
                }
            },
        );

        self.run.write().ready = true;
        let _ = self.ready_tx.send(true);
        self.set_state(PipelineState::Ready);
        tracing::info!(target: "gantry::pipeline", "ready, watching for changes");

        let mut client_open = true;
        let mut server_open = true;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = client_rx.recv(), if client_open => match result {
                    Some(result) => self.on_rebuild(result, &notifier, &restart_debouncer),
                    None => client_open = false,
                },
                result = server_rx.recv(), if server_open => match result {
                    Some(result) => self.on_rebuild(result, &notifier, &restart_debouncer),
                    None => server_open = false,
                },
                change = asset_rx.recv() => {
                    if let Some(change) = change {
                        tracing::debug!(
                            target: "gantry::pipeline",
                            "asset change at {}",
                            change.path().display()
                        );
                        let sync = assets.clone();
                        match tokio::task::spawn_blocking(move || sync.sync()).await {
                            Ok(Ok(_)) => notifier.notify_reload("assets updated"),
                            Ok(Err(e)) => {
                                tracing::error!(target: "gantry::pipeline", "asset sync failed: {e}");
                            }
                            Err(e) => {
                                tracing::error!(target: "gantry::pipeline", "asset sync task panicked: {e}");
                            }
                        }
                    }
                }
                event = events.recv() => match event {
                    Some(SupervisorEvent::Started { restarted: true }) => {
                        // Browsers reload only once the restarted server
                        // is accepting traffic again.
                        notifier.notify_reload("server restarted");
                    }
                    Some(SupervisorEvent::Started { restarted: false }) => {}
                    Some(SupervisorEvent::Crashed { status }) => {
                        tracing::error!(
                            target: "gantry::pipeline",
                            "server crashed (status {status:?}); the next successful server rebuild will restart it"
                        );
                    }
                    Some(SupervisorEvent::StartupTimedOut) => {
                        tracing::error!(
                            target: "gantry::pipeline",
                            "server produced no readiness signal in time"
                        );
                    }
                    None => {}
                },
                _ = &mut shutdown => {
                    tracing::info!(target: "gantry::pipeline", "shutting down");
                    break;
                }
            }
        }

        restart_debouncer.cancel();
        notifier.cancel_pending();
        supervisor.stop().await;
        *self.supervisor.write() = None;
        *self.notifier.write() = None;
        self.set_state(PipelineState::Idle);
        Ok(())
    }

    /// Tear down a partially started session: stop the server child,
    /// clear the published handles, and mark the pipeline Failed.
    async fn abort_session(&self, supervisor: &ProcessSupervisor) {
        supervisor.stop().await;
        *self.supervisor.write() = None;
        *self.notifier.write() = None;
        self.set_state(PipelineState::Failed);
    }

    /// Handle one watch-mode compilation result while Ready.
    fn on_rebuild(
        &self,
        result: CompilationResult,
        notifier: &ReloadNotifier,
        restart_debouncer: &Debouncer,
    ) {
        self.set_state(PipelineState::Rebuilding);

        if result.success {
            match result.target {
                TargetKind::Client => notifier.notify_reload("client bundle updated"),
                TargetKind::Server => restart_debouncer.trigger(),
            }
        } else {
            // Last-known-good output keeps serving; only report.
            tracing::error!(
                target: "gantry::pipeline",
                "{} rebuild failed ({} error(s)), serving last good bundle",
                result.target,
                result.error_count()
            );
        }
        self.run.write().record(result);

        self.set_state(PipelineState::Ready);
    }

    fn adapter(&self, kind: TargetKind) -> CompilerAdapter {
        CompilerAdapter::new(
            kind,
            self.config.target(kind).clone(),
            self.config.compiler.clone(),
            self.config.watch.clone(),
            self.root.clone(),
            self.config.mode,
        )
    }

    /// Run the two compiles and the asset sync concurrently. In watch
    /// mode the returned receivers keep streaming rebuild results.
    async fn initial_build(&self, watch_mode: bool) -> Result<InitialBuild> {
        let client = self.adapter(TargetKind::Client);
        let server = self.adapter(TargetKind::Server);
        let assets = AssetSync::new(self.config.assets.clone(), self.root.clone());

        let mut client_rx = client.spawn(watch_mode)?;
        let mut server_rx = server.spawn(watch_mode)?;

        let (client_result, server_result, assets_result) = tokio::join!(
            client_rx.recv(),
            server_rx.recv(),
            tokio::task::spawn_blocking(move || assets.sync()),
        );

        let client_result = client_result.ok_or(Error::Compilation {
            target: TargetKind::Client,
        })?;
        let server_result = server_result.ok_or(Error::Compilation {
            target: TargetKind::Server,
        })?;
        let assets_copied = assets_result
            .map_err(|e| Error::Io(std::io::Error::other(format!("asset sync task panicked: {e}"))))??;

        Ok(InitialBuild {
            client: client_result,
            server: server_result,
            assets_copied,
            client_rx,
            server_rx,
        })
    }

    fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn set_state(&self, state: PipelineState) {
        tracing::debug!(target: "gantry::pipeline", "pipeline -> {}", state.as_str());
        let _ = self.state_tx.send(state);
    }
}
