use crate::config::Config;
use crate::db::StoreBackend;
use crate::errors::AppError;
use crate::models::{PointsResponse, ProcessReceiptResponse, Receipt};
use crate::scoring::score_breakdown_at;
use crate::store::ReceiptStore;
use axum::{
    error_handling::HandleErrorLayer,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    BoxError, Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Instant;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

/// Largest receipt body accepted, in bytes.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Points store, keyed by receipt id.
    pub store: ReceiptStore<StoreBackend>,
}

impl AppState {
    pub fn new(config: Config, backend: StoreBackend) -> Self {
        let store = ReceiptStore::new(backend, &config);
        Self { config, store }
    }

    /// Deadline for every store call made while serving one request.
    ///
    /// Taken once when the handler starts, so it never runs past the
    /// request timeout enforced by the middleware by more than the time
    /// spent before the handler was entered.
    fn request_deadline(&self) -> Instant {
        Instant::now() + self.config.request_timeout
    }
}

/// Builds the receipt routes with body limit and request timeout applied.
///
/// Rate limiting, tracing and CORS are layered on by `main`.
pub fn router(state: Arc<AppState>) -> Router {
    let request_timeout = state.config.request_timeout;

    Router::new()
        .route("/health", get(health))
        .route("/receipts/process", post(process_receipt))
        .route("/receipts/:id/points", get(get_points))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
}

/// Maps middleware failures (request timeout) to an error response.
async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::RequestTimeout
    } else {
        AppError::InternalError(err.to_string())
    }
}

/// Health check endpoint.
///
/// Reports healthy only when the store answers a ping.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let deadline = state.request_deadline();

    state
        .store
        .ping(deadline)
        .await
        .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "receipt-points-api",
            "version": env!("CARGO_PKG_VERSION"),
            "store": "connected"
        })),
    ))
}

/// POST /receipts/process
///
/// Scores the receipt and stores the points under a fresh UUID v4.
///
/// # Returns
///
/// * `Result<Json<ProcessReceiptResponse>, AppError>` - The new receipt id, or 400 if the
///   receipt is malformed or could not be stored.
pub async fn process_receipt(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Receipt>, JsonRejection>,
) -> Result<Json<ProcessReceiptResponse>, AppError> {
    let deadline = state.request_deadline();
    let Json(receipt) = payload.map_err(|e| AppError::InvalidReceipt(e.body_text()))?;

    let breakdown = score_breakdown_at(&receipt, Utc::now())?;
    let points = breakdown.total();
    tracing::debug!("Score breakdown for {:?}: {:?}", receipt.retailer, breakdown);

    let id = Uuid::new_v4().to_string();
    state
        .store
        .put(deadline, &id, &points.to_string())
        .await
        .map_err(|e| AppError::InvalidReceipt(format!("could not store points: {}", e)))?;

    tracing::info!("id: {}, pts: {}", id, points);

    Ok(Json(ProcessReceiptResponse { id }))
}

/// GET /receipts/:id/points
///
/// # Arguments
///
/// * `id` - Receipt id returned by `process_receipt`; must be a version 4 UUID.
///
/// # Returns
///
/// * `Result<Json<PointsResponse>, AppError>` - The points, or 404 for any id that
///   cannot be resolved (malformed, unknown, expired, or store failure).
pub async fn get_points(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PointsResponse>, AppError> {
    let deadline = state.request_deadline();
    validate_receipt_id(&id)?;

    let stored = state
        .store
        .get(deadline, &id)
        .await
        .map_err(|e| AppError::ReceiptNotFound(e.to_string()))?;

    let points = stored.parse::<u64>().map_err(|_| {
        AppError::ReceiptNotFound(format!("stored value {:?} for {} is not an integer", stored, id))
    })?;

    Ok(Json(PointsResponse { points }))
}

/// Rejects anything that is not a version 4 UUID before it reaches the store.
pub fn validate_receipt_id(id: &str) -> Result<Uuid, AppError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| AppError::ReceiptNotFound(format!("invalid UUIDv4 {:?}: {}", id, e)))?;

    if uuid.get_version_num() != 4 {
        return Err(AppError::ReceiptNotFound(format!(
            "{} is a version {} UUID, expected version 4",
            id,
            uuid.get_version_num()
        )));
    }

    Ok(uuid)
}
