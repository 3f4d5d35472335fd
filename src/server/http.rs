//! HTTP surface
//!
//! WebSocket upgrade, status, the one-shot ingest endpoint and the small
//! extras (favicon, JSON 404, request logging).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State, WebSocketUpgrade};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Semaphore;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::coordinator::Coordinator;
use crate::stats::StatusSnapshot;

use super::ingest::IngestPeers;
use super::socket::serve_socket;

/// Shared state of the HTTP handlers
#[derive(Debug, Clone)]
pub struct AppState {
    coordinator: Coordinator,
    ingest: Arc<IngestPeers>,
    connection_limit: Option<Arc<Semaphore>>,
}

impl AppState {
    /// Bundle handler state; `max_connections == 0` disables the limit
    pub fn new(coordinator: Coordinator, ingest: Arc<IngestPeers>, max_connections: usize) -> Self {
        let connection_limit = if max_connections > 0 {
            Some(Arc::new(Semaphore::new(max_connections)))
        } else {
            None
        };

        Self {
            coordinator,
            ingest,
            connection_limit,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/status", get(status))
        .route("/broadcast", post(broadcast))
        .route("/favicon.ico", get(favicon))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// JSON error body `{error, path?}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    path: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            message,
            path: None,
        }
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.path {
            Some(path) => json!({ "error": self.message, "path": path }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let permit = match &state.connection_limit {
        Some(limit) => match Arc::clone(limit).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!("Connection rejected: limit reached");
                return ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Connection limit reached")
                    .into_response();
            }
        },
        None => None,
    };

    let coordinator = state.coordinator.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, coordinator, permit))
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, ApiError> {
    match state.coordinator.status().await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            tracing::error!(error = %e, "Status unavailable");
            Err(ApiError::internal())
        }
    }
}

#[derive(Debug, Deserialize)]
struct OfferRequest {
    sdp: Option<RTCSessionDescription>,
}

async fn broadcast(
    State(state): State<AppState>,
    body: Result<Json<OfferRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let offer = match body {
        Ok(Json(OfferRequest { sdp: Some(offer) })) => offer,
        Ok(_) => return Err(ApiError::new(StatusCode::BAD_REQUEST, "SDP is required")),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Ingest body rejected");
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "SDP is required"));
        }
    };

    match state.ingest.answer(offer).await {
        Ok(answer) => Ok(Json(json!({ "sdp": answer })).into_response()),
        Err(e) => {
            tracing::error!(error = %e, "Broadcast ingest failed");
            Err(ApiError::internal())
        }
    }
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    tracing::info!(method = %method, uri = %uri, "Endpoint not found");
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: "Endpoint not found",
        path: Some(uri.to_string()),
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::debug!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed = ?started.elapsed(),
        "Request"
    );
    response
}
