use crate::config::Config;
use crate::errors::AppError;
use crate::intake_client::SUBMIT_PATH;
use crate::intake_handler::submit_kyc;
use crate::models::IntakeReceipt;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Receipts of accepted submissions, keyed by submission id.
    /// Also the duplicate-submission check: an id found here was already accepted.
    pub receipts: Cache<Uuid, IntakeReceipt>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let receipts = Cache::builder()
            .time_to_live(Duration::from_secs(config.receipt_ttl_secs))
            .max_capacity(10_000)
            .build();

        Self { config, receipts }
    }
}

/// Intake endpoints, without state or the outer layers.
///
/// The server binary wraps these with rate limiting; `/health` stays outside it.
pub fn api_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(SUBMIT_PATH, post(submit_kyc))
        .route("/api/v1/submissions/:id", get(get_receipt))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}

/// Complete intake service with tracing and CORS, no rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .merge(api_routes(max_upload_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kyc-intake",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/submissions/:id
///
/// Returns the receipt of an accepted submission.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `id` - The submission id sent with the record.
pub async fn get_receipt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<IntakeReceipt>, AppError> {
    tracing::info!("GET /submissions/{}", id);

    state
        .receipts
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))
}
