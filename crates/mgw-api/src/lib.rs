//! ---
//! mgw_section: "05-networking-external-interfaces"
//! mgw_subsection: "module"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "External REST API surface for the MGW gateway."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
//! REST API and static asset server for the motor gateway.
//!
//! The gateway is a stateless translation layer: each request is handled
//! end-to-end by its own task, performs one or more synchronous Data Layer
//! calls with the caller's forwarded credential, and terminates with a
//! single JSON reply. There is no cross-request shared mutable state.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, get_service};
use axum::{Json, Router};
use mgw_datalayer::{
    Credential, DataLayerClient, DataLayerError, MOTOR_ENABLE_NODE, MOTOR_SPEED_NODE,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub mod state;

pub use state::{MotorState, MOTOR_SPEED_MAX, MOTOR_SPEED_MIN};

/// Shared API state exposed to handlers.
#[derive(Debug)]
pub struct GatewayState {
    client: DataLayerClient,
}

impl GatewayState {
    pub fn new(client: DataLayerClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Request-terminal failures, mapped one-to-one onto response statuses.
///
/// Nothing is retried or queued; classification and translation into a
/// single JSON error reply is the extent of local handling.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No forwardable credential on the inbound request.
    #[error("missing Authorization header")]
    Unauthenticated,
    /// Request body failed domain constraints.
    #[error("{0}")]
    Validation(String),
    /// An upstream Data Layer call failed (status or transport).
    #[error("data layer request failed: {0}")]
    Upstream(DataLayerError),
    /// Anything else unexpected, including malformed upstream envelopes.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DataLayerError> for ApiError {
    fn from(err: DataLayerError) -> Self {
        if err.is_upstream() {
            ApiError::Upstream(err)
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// The caller's `Authorization` header, extracted before the body is
/// touched so an unauthenticated request is rejected regardless of its
/// contents and without any upstream call.
///
/// When the gateway is opened from the controller's own web UI the header
/// is injected by the embedding console; a missing header usually means
/// someone browsed directly to the backend port.
pub struct ForwardedCredential(pub Credential);

#[async_trait]
impl<S> FromRequestParts<S> for ForwardedCredential
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .map(|value| ForwardedCredential(Credential::new(value)))
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Read both motor nodes and assemble the state DTO.
///
/// The two reads are independent and sequential; the pair is never
/// guaranteed to be an atomic snapshot of the controller.
async fn read_state(state: &GatewayState, credential: &Credential) -> Result<MotorState, ApiError> {
    let enable = state.client.read_node(credential, MOTOR_ENABLE_NODE).await?;
    let speed = state.client.read_node(credential, MOTOR_SPEED_NODE).await?;
    MotorState::from_node_values(&enable, &speed).map_err(|err| {
        warn!(error = %err, "controller returned uninterpretable node values");
        ApiError::Internal(err.to_string())
    })
}

async fn get_state(
    State(state): State<Arc<GatewayState>>,
    ForwardedCredential(credential): ForwardedCredential,
) -> Result<Json<MotorState>, ApiError> {
    let observed = read_state(&state, &credential).await?;
    Ok(Json(observed))
}

async fn set_state(
    State(state): State<Arc<GatewayState>>,
    ForwardedCredential(credential): ForwardedCredential,
    payload: Result<Json<MotorState>, JsonRejection>,
) -> Result<Json<MotorState>, ApiError> {
    let Json(requested) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    requested
        .validate()
        .map_err(|err| ApiError::Validation(err.to_string()))?;

    // Enable first, then speed, each awaited; a failure aborts before the
    // read-back and surfaces the failing step's error. The pair is not
    // applied atomically at the controller.
    state
        .client
        .write_node(&credential, MOTOR_ENABLE_NODE, requested.enable_value())
        .await?;
    state
        .client
        .write_node(&credential, MOTOR_SPEED_NODE, requested.speed_value())
        .await?;

    let observed = read_state(&state, &credential).await?;
    info!(
        enable = observed.motor_enable,
        speed = observed.motor_speed,
        "motor state updated"
    );
    Ok(Json(observed))
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Assemble the gateway router with optional static asset hosting.
pub fn router(state: Arc<GatewayState>, static_dir: Option<PathBuf>) -> Router {
    let api_routes = Router::new()
        .route("/api/state", get(get_state).post(set_state))
        .route("/api/health", get(get_health))
        .with_state(state);

    if let Some(dir) = static_dir {
        let service = get_service(ServeDir::new(dir).append_index_html_on_directories(true));
        Router::new()
            .merge(api_routes)
            .fallback_service(service)
            .layer(TraceLayer::new_for_http())
    } else {
        api_routes.layer(TraceLayer::new_for_http())
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Spawn the REST API with optional static asset hosting.
pub fn spawn_api_server(
    state: Arc<GatewayState>,
    addr: SocketAddr,
    static_dir: Option<PathBuf>,
) -> Result<ApiServer> {
    let router = router(state, static_dir);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %local_addr, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %local_addr, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}
