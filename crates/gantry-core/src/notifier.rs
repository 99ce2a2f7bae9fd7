//! Browser reload notifier over Server-Sent Events.
//!
//! Runs a small axum server next to the application server. Browsers load
//! `/reload-client.js`, which subscribes to `/events` and reloads the page
//! on every message. Reload requests are debounced through a settle window
//! so a burst of rebuild completions produces a single reload.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::get;
use axum::Router;
use gantry_config::NotifierConfig;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};

use crate::debounce::Debouncer;
use crate::error::{Error, Result};

/// Event payload pushed to connected browsers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadEvent {
    Reload { reason: String },
}

/// Connected-client registry shared with the HTTP handlers.
#[derive(Default)]
struct Registry {
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_client_id: RwLock<usize>,
    /// Reason attached to the next debounced reload, last write wins.
    pending_reason: RwLock<String>,
}

impl Registry {
    fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    async fn broadcast(&self, event: &ReloadEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
        let clients = self.clients.read().clone();

        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                failed_ids.push(id);
            }
        }
        for id in failed_ids {
            self.unregister_client(id);
        }
    }
}

/// Reload notification service.
pub struct ReloadNotifier {
    registry: Arc<Registry>,
    debouncer: Debouncer,
    port: u16,
}

impl ReloadNotifier {
    pub fn new(config: &NotifierConfig) -> Self {
        let registry = Arc::new(Registry::default());

        let broadcast_registry = registry.clone();
        let debouncer = Debouncer::spawn(Duration::from_millis(config.settle_ms), move || {
            let registry = broadcast_registry.clone();
            async move {
                let reason = registry.pending_reason.read().clone();
                tracing::info!(
                    target: "gantry::notify",
                    "reloading {} browser client(s) ({reason})",
                    registry.client_count()
                );
                registry.broadcast(&ReloadEvent::Reload { reason }).await;
            }
        });

        Self {
            registry,
            debouncer,
            port: config.port,
        }
    }

    /// Bind the notifier server and serve it on a background task.
    ///
    /// Returns once the listener is bound, so port conflicts surface here
    /// rather than inside the task.
    pub async fn serve(&self) -> Result<()> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Notifier(format!("cannot bind {addr}: {e}")))?;

        tracing::info!(target: "gantry::notify", "reload notifier listening on {addr}");

        let app = router(self.registry.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(target: "gantry::notify", "notifier server error: {e}");
            }
        });

        Ok(())
    }

    /// Request a browser reload. Bursts within the settle window collapse
    /// into one broadcast; the last reason wins.
    pub fn notify_reload(&self, reason: &str) {
        *self.registry.pending_reason.write() = reason.to_string();
        self.debouncer.trigger();
    }

    /// Cancel any pending debounced reload.
    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    /// Register a client directly, bypassing the SSE endpoint. Messages
    /// delivered to the client arrive on the returned receiver.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        self.registry.register_client()
    }

    /// Remove a client; any in-flight broadcast simply skips it.
    pub fn unregister_client(&self, id: usize) {
        self.registry.unregister_client(id);
    }

    pub fn client_count(&self) -> usize {
        self.registry.client_count()
    }
}

fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/events", get(handle_sse))
        .route("/reload-client.js", get(handle_reload_script))
        .layer(
            // Pages are served from the application server on another
            // port, so the event stream must allow cross-origin reads.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(registry)
}

/// SSE subscription endpoint for browser clients.
async fn handle_sse(
    State(registry): State<Arc<Registry>>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<axum::response::sse::Event, std::convert::Infallible>>>
{
    use axum::response::sse::Event;

    let (id, rx) = registry.register_client();
    tracing::debug!(target: "gantry::notify", "browser client {id} connected");

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_reload_script() -> impl IntoResponse {
    const RELOAD_SCRIPT: &str = include_str!("../assets/reload-client.js");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/javascript")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(RELOAD_SCRIPT))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
