use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use churn_core::{ModelArtifact, Record};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::errors::ServiceError;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Loaded artifact with its hash computed once at startup
struct ServedModel {
    artifact: Arc<ModelArtifact>,
    hash: String,
}

/// Shared, read-only serving state
pub struct AppState {
    model: Option<ServedModel>,
    pub reject_unknown_categories: bool,
    pub start_time: Instant,
    pub req_count: AtomicU64,
}

impl AppState {
    pub fn new(model: Option<ModelArtifact>, reject_unknown_categories: bool) -> Result<Self, ServiceError> {
        let model = match model {
            Some(artifact) => Some(ServedModel {
                hash: artifact.model_hash().map_err(ServiceError::ModelHash)?,
                artifact: Arc::new(artifact),
            }),
            None => None,
        };

        Ok(Self {
            model,
            reject_unknown_categories,
            start_time: Instant::now(),
            req_count: AtomicU64::new(0),
        })
    }

    /// Load the configured artifact. With `fail_fast` a load failure is
    /// returned; otherwise the state starts without a model.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let model = match ModelArtifact::load_from_path(&config.model_path) {
            Ok(artifact) => {
                info!(
                    path = %config.model_path.display(),
                    target = artifact.target(),
                    estimator = %artifact.estimator().kind(),
                    features = artifact.encoder().dimension(),
                    "loaded model artifact"
                );
                Some(artifact)
            }
            Err(source) => {
                let err = ServiceError::ArtifactLoad {
                    path: config.model_path.clone(),
                    source,
                };
                if config.fail_fast {
                    return Err(err);
                }
                warn!("{err}; serving without a model");
                None
            }
        };

        Self::new(model, config.reject_unknown_categories)
    }

    pub fn model(&self) -> Result<&Arc<ModelArtifact>, ServiceError> {
        self.served().map(|served| &served.artifact)
    }

    /// Hex BLAKE3 hash of the served artifact.
    pub fn model_hash(&self) -> Result<&str, ServiceError> {
        self.served().map(|served| served.hash.as_str())
    }

    fn served(&self) -> Result<&ServedModel, ServiceError> {
        self.model.as_ref().ok_or(ServiceError::ModelUnavailable)
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct ModelResponse {
    target: String,
    estimator: String,
    feature_count: usize,
    feature_names: Vec<String>,
    threshold: f64,
    model_hash: String,
    created_at: u64,
    trainer_version: String,
    metrics: BTreeMap<String, f64>,
    uptime_secs: u64,
    req_total: u64,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InputValidation(message) => ApiError::bad_request(message),
            ServiceError::ModelUnavailable => ApiError::service_unavailable("model unavailable"),
            other => {
                error!("request failed: {other}");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

/// Serve until Ctrl-C.
pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("prediction service listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("prediction server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(err) => error!("unable to listen for shutdown signal: {}", err),
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/ping", get(handle_ping))
        .route("/predict", post(handle_predict))
        .route("/model", get(handle_model))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_ping(State(state): State<SharedState>) -> &'static str {
    state.record_request();
    "PONG"
}

async fn handle_predict(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req_total = state.record_request();
    let model = state.model()?;

    let Json(body) = payload.map_err(|rejection| {
        debug!("rejected request body: {}", rejection.body_text());
        ApiError::new(
            rejection.status(),
            format!("malformed request body: {}", rejection.body_text()),
        )
    })?;

    let record = Record::from_json_value(&body).map_err(ServiceError::from)?;
    model
        .encoder()
        .validate(&record, state.reject_unknown_categories)
        .map_err(ServiceError::from)?;

    let prediction = model.predict(&record).map_err(ServiceError::from)?;

    debug!(req_total, ?prediction, "prediction served");
    Ok(Json(prediction.to_json(model.target())))
}

async fn handle_model(State(state): State<SharedState>) -> Result<Json<ModelResponse>, ApiError> {
    let req_total = state.record_request();
    let model = state.model()?;
    let metadata = model.metadata();

    Ok(Json(ModelResponse {
        target: model.target().to_string(),
        estimator: model.estimator().kind().to_string(),
        feature_count: model.encoder().dimension(),
        feature_names: model.encoder().feature_names().to_vec(),
        threshold: model.threshold(),
        model_hash: state.model_hash()?.to_string(),
        created_at: metadata.created_at,
        trainer_version: metadata.trainer_version.clone(),
        metrics: metadata.metrics.clone(),
        uptime_secs: state.uptime_seconds(),
        req_total,
    }))
}
