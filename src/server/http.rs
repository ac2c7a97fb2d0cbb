use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{Error, Result};
use crate::ip::PublicIpFetcher;
use crate::status::StatusStore;

/// Capacity of the request/error observer queues. Notifications beyond
/// this are dropped; the request path never blocks on an observer.
pub const OBSERVER_QUEUE_DEPTH: usize = 64;

/// A request seen by the server, reported to the request observer.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub method: String,
    pub path: String,
}

#[derive(Clone)]
pub struct AppState {
    fetcher: Arc<PublicIpFetcher>,
    status: StatusStore,
    request_tx: mpsc::Sender<RequestEvent>,
    error_tx: mpsc::Sender<String>,
}

impl AppState {
    pub fn new(
        fetcher: PublicIpFetcher,
        status: StatusStore,
        request_tx: mpsc::Sender<RequestEvent>,
        error_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            status,
            request_tx,
            error_tx,
        }
    }

    fn notify_request(&self, method: &Method, path: &str) {
        let event = RequestEvent {
            method: method.to_string(),
            path: path.to_string(),
        };
        if self.request_tx.try_send(event).is_err() {
            debug!("Request observer queue full, dropping notification");
        }
    }

    fn notify_error(&self, err: &Error) {
        if self.error_tx.try_send(err.to_string()).is_err() {
            debug!("Error observer queue full, dropping notification");
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Non-GET methods on known paths get the same 404 envelope as
    // unknown paths, not a 405.
    Router::new()
        .route("/", get(status_handler).fallback(not_found))
        .route("/status", get(status_handler).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

/// Serve the status API until the shutdown signal fires.
pub async fn serve(
    address: &str,
    state: AppState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|e| Error::init(format!("failed to bind {}: {}", address, e)))?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await
        .map_err(|e| Error::init(format!("server error: {}", e)))
}

/// `GET /` and `GET /status`: fetch a fresh public IP, fold it into the
/// `current` half of the store, answer with a full snapshot.
async fn status_handler(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    state.notify_request(&method, uri.path());

    let (ip, err) = match state.fetcher.fetch().await {
        Ok(ip) => (ip, None),
        Err(e) => {
            state.notify_error(&e);
            (String::new(), Some(e))
        }
    };

    state.status.record_current(&ip, err.as_ref());

    let snapshot = state.status.snapshot();
    let code = if snapshot.current.error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (code, Json(snapshot)).into_response()
}

async fn not_found(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    state.notify_request(&method, uri.path());

    let body = serde_json::json!({
        "status": 404,
        "message": format!("path not found: {} {}", method, uri.path()),
    });

    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
