//! Trailing-debounce primitive.
//!
//! A `Debouncer` coalesces bursts of triggers into a single action fired
//! once the settle window elapses with no further triggers, measured from
//! the last trigger in the burst. Both the reload notifier and the
//! server-restart path are built on this.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Handle to a running debounce task.
///
/// Dropping the handle cancels any pending fire, so a session shutdown
/// leaves no timer behind.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    handle: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn a debounce task that runs `action` once per settled burst.
    pub fn spawn<F, Fut>(settle: Duration, mut action: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let handle = tokio::spawn(async move {
            // Outer loop: wait for the first trigger of a burst.
            while rx.recv().await.is_some() {
                let mut deadline = Instant::now() + settle;
                loop {
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            action().await;
                            break;
                        }
                        msg = rx.recv() => match msg {
                            // Another trigger: restart the window.
                            Some(()) => deadline = Instant::now() + settle,
                            None => return,
                        },
                    }
                }
            }
        });

        Self { tx, handle }
    }

    /// Record a trigger. Resets the settle window if one is pending.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Cancel the task, dropping any pending fire.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
