use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::types::{ErrorResponse, HealthResponse, InvokeQuery, ServiceInfo};
use crate::script::{Dispatcher, ScriptError};

/// HTTP server state
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    started_at: Instant,
}

/// HTTP front end for registered capabilities
///
/// - GET /health - Health check
/// - GET /api/services - Registered capabilities with metadata
/// - POST /api/services/{capability}?return_response=true - Invoke a capability
///   with a JSON object body as its parameters
pub struct ScriptServer {
    bind: SocketAddr,
    dispatcher: Arc<Dispatcher>,
}

impl ScriptServer {
    pub fn new(bind: SocketAddr, dispatcher: Arc<Dispatcher>) -> Self {
        Self { bind, dispatcher }
    }

    /// Create the Axum router with all endpoints
    pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
        let state = AppState {
            dispatcher,
            started_at: Instant::now(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/api/services", get(list_services))
            .route("/api/services/{capability}", post(invoke_service))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server and run until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = Self::router(self.dispatcher);

        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind))?;
        info!("HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        Ok(())
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        capabilities: state.dispatcher.registry().list().len(),
        cached_units: state.dispatcher.cache().len(),
    })
}

async fn list_services(State(state): State<AppState>) -> Json<Vec<ServiceInfo>> {
    let services = state
        .dispatcher
        .registry()
        .list()
        .iter()
        .map(|capability| ServiceInfo::from(capability.as_ref()))
        .collect();
    Json(services)
}

async fn invoke_service(
    Path(capability): Path<String>,
    Query(query): Query<InvokeQuery>,
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(message) => {
            warn!(capability = %capability, error = %message, "Invalid request body");
            return error_response(StatusCode::BAD_REQUEST, message);
        }
    };

    let dispatcher = state.dispatcher.clone();
    let identifier = capability.clone();
    let want_response = query.return_response;
    let outcome = tokio::task::spawn_blocking(move || {
        dispatcher.call(&identifier, payload, want_response)
    })
    .await;

    match outcome {
        Ok(Ok(Some(response))) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Ok(None)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => {
            warn!(capability = %capability, error = %e, "Invocation failed");
            error_response(status_for(&e), e.to_string())
        }
        Err(e) => {
            warn!(capability = %capability, error = %e, "Invocation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// An empty body is an empty parameter set; anything else must be a JSON object
fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("Request body must be a JSON object, got {}", other)),
        Err(e) => Err(format!("Invalid JSON body: {}", e)),
    }
}

fn status_for(error: &ScriptError) -> StatusCode {
    match error {
        ScriptError::Validation => StatusCode::BAD_REQUEST,
        ScriptError::UnknownCapability(_) | ScriptError::Read { .. } => StatusCode::NOT_FOUND,
        ScriptError::Syntax { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ScriptError::Discovery(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
