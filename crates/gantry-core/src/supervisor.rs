//! Process supervisor for the application server.
//!
//! Owns the lifecycle of the server child process: start with readiness
//! detection, debounced restart, stop. The supervisor is an actor: a
//! cloneable handle sends commands to a task that owns the child, so state
//! transitions are serialized and the listening port is fully released
//! (child reaped) before any restart launches a successor.
//!
//! Restart requests that arrive while a restart is already in progress are
//! coalesced last-write-wins into a single trailing restart. An unexpected
//! exit while Running moves to Failed and is reported; it is never
//! auto-restarted, so a crash-on-start bug cannot cause a restart loop.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use gantry_config::ServeConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{Error, Result};

/// Lifecycle state of the supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Restarting,
    Failed,
}

impl SupervisorState {
    pub fn as_str(self) -> &'static str {
        match self {
            SupervisorState::Stopped => "stopped",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Restarting => "restarting",
            SupervisorState::Failed => "failed",
        }
    }
}

/// Notifications the supervisor pushes to its consumer.
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    /// The process reached Running. `restarted` distinguishes a restart
    /// cycle from the initial start.
    Started { restarted: bool },
    /// The process exited while it was supposed to be running.
    Crashed { status: Option<i32> },
    /// The process produced no readiness signal within the startup
    /// timeout.
    StartupTimedOut,
}

enum Cmd {
    Start(oneshot::Sender<Result<()>>),
    Restart(ServeConfig),
    Stop(oneshot::Sender<()>),
}

/// Cloneable handle to the supervisor actor.
#[derive(Clone)]
pub struct ProcessSupervisor {
    cmd_tx: mpsc::UnboundedSender<Cmd>,
    state_rx: watch::Receiver<SupervisorState>,
    config: ServeConfig,
}

impl ProcessSupervisor {
    /// Create a supervisor for the given process config and working
    /// directory. Returns the handle and the event stream.
    pub fn new(
        config: ServeConfig,
        root: PathBuf,
    ) -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SupervisorState::Stopped);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            config: config.clone(),
            root,
            state_tx,
            event_tx,
            child: None,
        };
        tokio::spawn(actor.run(cmd_rx));

        (
            Self {
                cmd_tx,
                state_rx,
                config,
            },
            event_rx,
        )
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        *self.state_rx.borrow()
    }

    /// Watchable state stream.
    pub fn state_stream(&self) -> watch::Receiver<SupervisorState> {
        self.state_rx.clone()
    }

    /// Start the process. Errors unless currently Stopped, or when no
    /// readiness signal arrives within the startup timeout.
    pub async fn start(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Cmd::Start(tx))
            .map_err(|_| Error::SupervisorGone)?;
        rx.await.map_err(|_| Error::SupervisorGone)?
    }

    /// Request a restart with the current configuration.
    ///
    /// Fire-and-forget: overlapping requests are coalesced by the actor.
    /// Ignored unless the process is Running or Failed.
    pub fn restart(&self) {
        self.restart_with(self.config.clone());
    }

    /// Request a restart with an updated configuration. When several
    /// requests coalesce, the configuration from the last one wins.
    pub fn restart_with(&self, config: ServeConfig) {
        let _ = self.cmd_tx.send(Cmd::Restart(config));
    }

    /// Stop the process from any state. Always ends Stopped with no live
    /// child.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Cmd::Stop(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

enum Wake {
    Cmd(Option<Cmd>),
    Exit(std::io::Result<std::process::ExitStatus>),
}

struct Actor {
    config: ServeConfig,
    root: PathBuf,
    state_tx: watch::Sender<SupervisorState>,
    event_tx: mpsc::UnboundedSender<SupervisorEvent>,
    /// Only Some while the state is Running.
    child: Option<Child>,
}

impl Actor {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Cmd>) {
        loop {
            let wake = if let Some(child) = self.child.as_mut() {
                tokio::select! {
                    cmd = cmd_rx.recv() => Wake::Cmd(cmd),
                    status = child.wait() => Wake::Exit(status),
                }
            } else {
                Wake::Cmd(cmd_rx.recv().await)
            };

            match wake {
                Wake::Cmd(None) => {
                    // All handles dropped: session shutdown.
                    self.terminate().await;
                    return;
                }
                Wake::Cmd(Some(Cmd::Start(reply))) => {
                    let result = self.handle_start(false).await;
                    let _ = reply.send(result);
                }
                Wake::Cmd(Some(Cmd::Restart(config))) => {
                    self.handle_restart(config, &mut cmd_rx).await;
                }
                Wake::Cmd(Some(Cmd::Stop(reply))) => {
                    self.terminate().await;
                    self.set_state(SupervisorState::Stopped);
                    let _ = reply.send(());
                }
                Wake::Exit(status) => {
                    self.child = None;
                    let code = status.ok().and_then(|s| s.code());
                    tracing::error!(
                        target: "gantry::serve",
                        "server process exited unexpectedly (status {code:?})"
                    );
                    self.set_state(SupervisorState::Failed);
                    let _ = self
                        .event_tx
                        .send(SupervisorEvent::Crashed { status: code });
                }
            }
        }
    }

    async fn handle_start(&mut self, restarted: bool) -> Result<()> {
        if *self.state_tx.borrow() != SupervisorState::Stopped && !restarted {
            return Err(Error::InvalidState {
                operation: "start",
                state: self.state_tx.borrow().as_str(),
            });
        }

        self.set_state(SupervisorState::Starting);
        match self.launch().await {
            Ok(child) => {
                self.child = Some(child);
                self.set_state(SupervisorState::Running);
                let _ = self.event_tx.send(SupervisorEvent::Started { restarted });
                Ok(())
            }
            Err(e) => {
                self.set_state(SupervisorState::Failed);
                if matches!(e, Error::StartupTimeout { .. }) {
                    let _ = self.event_tx.send(SupervisorEvent::StartupTimedOut);
                } else {
                    let _ = self.event_tx.send(SupervisorEvent::Crashed { status: None });
                }
                Err(e)
            }
        }
    }

    /// Handle a restart request, coalescing any queued requests into this
    /// single cycle. A queued Stop wins over the restart.
    async fn handle_restart(
        &mut self,
        config: ServeConfig,
        cmd_rx: &mut mpsc::UnboundedReceiver<Cmd>,
    ) {
        let state = *self.state_tx.borrow();
        if !matches!(state, SupervisorState::Running | SupervisorState::Failed) {
            tracing::warn!(
                target: "gantry::serve",
                "ignoring restart request while {}",
                state.as_str()
            );
            return;
        }

        self.set_state(SupervisorState::Restarting);

        let mut config = config;
        if let Some(reply) = drain_restarts(cmd_rx, &mut config) {
            self.terminate().await;
            self.set_state(SupervisorState::Stopped);
            let _ = reply.send(());
            return;
        }

        self.terminate().await;

        // Requests that arrived during termination collapse into this
        // same trailing restart, last config wins.
        if let Some(reply) = drain_restarts(cmd_rx, &mut config) {
            self.set_state(SupervisorState::Stopped);
            let _ = reply.send(());
            return;
        }

        self.config = config;
        if let Err(e) = self.handle_start(true).await {
            tracing::error!(target: "gantry::serve", "restart failed: {e}");
        }
    }

    /// Launch the process and wait for readiness.
    async fn launch(&mut self) -> Result<Child> {
        let config = self.config.clone();
        tracing::info!(
            target: "gantry::serve",
            "starting server: {} {} (port {})",
            config.command,
            config.args.join(" "),
            config.port
        );

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .env("PORT", config.port.to_string())
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let (ready_tx, ready_rx) = oneshot::channel();
        if let Some(stdout) = child.stdout.take() {
            let marker = config.ready_marker.clone();
            tokio::spawn(async move {
                let mut ready_tx = Some(ready_tx);
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::info!(target: "gantry::serve", "{line}");
                    if let Some(marker) = &marker {
                        if line.contains(marker.as_str()) {
                            if let Some(tx) = ready_tx.take() {
                                let _ = tx.send(());
                            }
                        }
                    }
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(target: "gantry::serve", "{line}");
                }
            });
        }

        if config.ready_marker.is_some() {
            let startup = Duration::from_millis(config.startup_timeout_ms);
            tokio::select! {
                res = ready_rx => match res {
                    Ok(()) => Ok(child),
                    Err(_) => {
                        // Stdout closed without the marker: early exit.
                        let status = child.wait().await.ok();
                        Err(Error::ProcessCrash {
                            status: status.and_then(|s| s.code()),
                        })
                    }
                },
                _ = tokio::time::sleep(startup) => {
                    let mut child = Some(child);
                    terminate_child(&mut child, Duration::from_millis(config.kill_grace_ms)).await;
                    Err(Error::StartupTimeout { timeout: startup })
                }
            }
        } else {
            // No observable readiness signal: fall back to a grace period
            // with the process still alive.
            tokio::time::sleep(Duration::from_millis(config.ready_grace_ms)).await;
            match child.try_wait() {
                Ok(Some(status)) => Err(Error::ProcessCrash {
                    status: status.code(),
                }),
                _ => Ok(child),
            }
        }
    }

    /// Terminate the current child, if any, and reap it fully.
    async fn terminate(&mut self) {
        let grace = Duration::from_millis(self.config.kill_grace_ms);
        terminate_child(&mut self.child, grace).await;
    }

    fn set_state(&self, state: SupervisorState) {
        tracing::debug!(target: "gantry::serve", "supervisor -> {}", state.as_str());
        let _ = self.state_tx.send(state);
    }
}

/// Graceful termination: polite signal first, forced kill after the grace
/// window, then a full wait so the port is released before returning.
async fn terminate_child(child: &mut Option<Child>, grace: Duration) {
    let Some(mut child) = child.take() else {
        return;
    };

    graceful_signal(&mut child);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(_) => {}
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

#[cfg(unix)]
fn graceful_signal(child: &mut Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
    } else {
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn graceful_signal(child: &mut Child) {
    let _ = child.start_kill();
}

/// Drain queued commands, keeping only the most recent restart config.
/// Returns the reply channel of a drained Stop, which supersedes the
/// restart.
fn drain_restarts(
    cmd_rx: &mut mpsc::UnboundedReceiver<Cmd>,
    config: &mut ServeConfig,
) -> Option<oneshot::Sender<()>> {
    while let Ok(cmd) = cmd_rx.try_recv() {
        match cmd {
            Cmd::Restart(c) => *config = c,
            Cmd::Start(reply) => {
                let _ = reply.send(Err(Error::InvalidState {
                    operation: "start",
                    state: SupervisorState::Restarting.as_str(),
                }));
            }
            Cmd::Stop(reply) => return Some(reply),
        }
    }
    None
}
