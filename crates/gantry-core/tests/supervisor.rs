//! Process supervisor integration tests using shell-script servers.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::Duration;

use gantry_config::ServeConfig;
use gantry_core::supervisor::{ProcessSupervisor, SupervisorEvent, SupervisorState};
use tokio::time::timeout;

fn serve_config(script: &str) -> ServeConfig {
    ServeConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        port: 5000,
        ready_marker: Some("Server started".to_string()),
        startup_timeout_ms: 5_000,
        ready_grace_ms: 200,
        kill_grace_ms: 300,
    }
}

fn workdir() -> PathBuf {
    std::env::temp_dir()
}

async fn next_event(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<SupervisorEvent>,
) -> SupervisorEvent {
    timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for supervisor event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_start_then_stop() {
    let (supervisor, mut events) = ProcessSupervisor::new(
        serve_config("echo 'Server started'; sleep 30"),
        workdir(),
    );

    supervisor.start().await.unwrap();
    assert_eq!(supervisor.state(), SupervisorState::Running);
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: false }
    ));

    supervisor.stop().await;
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_start_is_rejected_unless_stopped() {
    let (supervisor, _events) = ProcessSupervisor::new(
        serve_config("echo 'Server started'; sleep 30"),
        workdir(),
    );

    supervisor.start().await.unwrap();
    assert!(supervisor.start().await.is_err());

    supervisor.stop().await;
}

#[tokio::test]
async fn test_readiness_grace_without_marker() {
    let mut config = serve_config("sleep 30");
    config.ready_marker = None;

    let (supervisor, _events) = ProcessSupervisor::new(config, workdir());
    supervisor.start().await.unwrap();
    assert_eq!(supervisor.state(), SupervisorState::Running);

    supervisor.stop().await;
}

#[tokio::test]
async fn test_startup_timeout_fails_the_start() {
    let mut config = serve_config("sleep 30");
    config.startup_timeout_ms = 200;

    let (supervisor, mut events) = ProcessSupervisor::new(config, workdir());
    assert!(supervisor.start().await.is_err());
    assert_eq!(supervisor.state(), SupervisorState::Failed);
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::StartupTimedOut
    ));
}

#[tokio::test]
async fn test_unexpected_exit_reports_crash_without_restart() {
    let (supervisor, mut events) = ProcessSupervisor::new(
        serve_config("echo 'Server started'; sleep 0.2; exit 3"),
        workdir(),
    );

    supervisor.start().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: false }
    ));

    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Crashed { status: Some(3) }
    ));
    assert_eq!(supervisor.state(), SupervisorState::Failed);

    // No automatic relaunch follows a crash.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(supervisor.state(), SupervisorState::Failed);
}

#[tokio::test]
async fn test_restart_burst_coalesces_to_one_cycle() {
    let (supervisor, mut events) = ProcessSupervisor::new(
        serve_config("echo 'Server started'; sleep 30"),
        workdir(),
    );

    supervisor.start().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: false }
    ));

    for _ in 0..5 {
        supervisor.restart();
    }

    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: true }
    ));
    assert_eq!(supervisor.state(), SupervisorState::Running);

    // The burst produced exactly one restart cycle.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(events.try_recv().is_err());

    supervisor.stop().await;
}

#[tokio::test]
async fn test_coalesced_restart_uses_last_config() {
    let temp = tempfile::TempDir::new().unwrap();
    let first_marker = temp.path().join("first");
    let last_marker = temp.path().join("last");

    // Ignore SIGTERM so termination takes the full kill grace, leaving
    // time for both queued restarts to land before the relaunch.
    let (supervisor, mut events) = ProcessSupervisor::new(
        serve_config("trap '' TERM; echo 'Server started'; sleep 30"),
        workdir(),
    );
    supervisor.start().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: false }
    ));

    let mut first = serve_config(&format!(
        "touch {}; echo 'Server started'; sleep 30",
        first_marker.display()
    ));
    first.kill_grace_ms = 300;
    let mut last = first.clone();
    last.args[1] = format!(
        "touch {}; echo 'Server started'; sleep 30",
        last_marker.display()
    );

    supervisor.restart_with(first);
    supervisor.restart_with(last);

    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: true }
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(last_marker.exists());
    assert!(!first_marker.exists());

    supervisor.stop().await;
}

#[tokio::test]
async fn test_restart_after_crash_recovers() {
    let (supervisor, mut events) = ProcessSupervisor::new(
        serve_config("echo 'Server started'; sleep 0.1"),
        workdir(),
    );

    supervisor.start().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: false }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Crashed { .. }
    ));

    supervisor.restart_with(serve_config("echo 'Server started'; sleep 30"));
    assert!(matches!(
        next_event(&mut events).await,
        SupervisorEvent::Started { restarted: true }
    ));
    assert_eq!(supervisor.state(), SupervisorState::Running);

    supervisor.stop().await;
}
