use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::{
    analytics::{self, AnalyticsSummary},
    analyzer::analyze_blocking,
    app_state::AppState,
    error::{AnalysisError, StorageError, SubmitError},
    intake,
    models::{AnalysisResult, Complaint, ComplaintStatus, NewComplaint},
    storage::ComplaintFilter,
};

const SERVICE_NAME: &str = "complaint-analyzer";

type ApiError = (StatusCode, Json<Value>);

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct AnalyzePayload {
    #[serde(default, alias = "text")]
    complaint: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusPayload {
    status: ComplaintStatus,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    models_loaded: bool,
    sentiment_available: bool,
    timestamp: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/api/analyze", post(analyze_handler))
        .route(
            "/api/complaints",
            get(list_complaints_handler).post(create_complaint_handler),
        )
        .route(
            "/api/complaints/:id",
            get(get_complaint_handler)
                .put(update_status_handler)
                .patch(update_status_handler),
        )
        .route("/api/analytics", get(analytics_handler))
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .with_state(app_state)
}

// --- Errores ---

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({ "error": message.into(), "status": status.as_u16() })),
    )
}

// Cuerpo JSON malformado, tipo incorrecto o sin content-type.
fn json_rejection(rejection: JsonRejection) -> ApiError {
    error_body(rejection.status(), rejection.body_text())
}

fn analysis_error(err: AnalysisError) -> ApiError {
    let status = match &err {
        AnalysisError::EmptyInput | AnalysisError::InputTooLong { .. } => StatusCode::BAD_REQUEST,
        AnalysisError::ModelsUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, err.to_string())
}

fn storage_error(err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound(_) => error_body(StatusCode::NOT_FOUND, err.to_string()),
        other => {
            error!("Error de almacenamiento: {}", other);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

// --- Handlers ---

#[axum::debug_handler]
async fn analyze_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzePayload>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    let text = payload.complaint.unwrap_or_default();
    analyze_blocking(state.analyzer.clone(), text)
        .await
        .map(Json)
        .map_err(analysis_error)
}

#[axum::debug_handler]
async fn create_complaint_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewComplaint>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    match intake::submit_complaint(&state.analyzer, state.store.as_ref(), payload).await {
        Ok(complaint) => Ok((StatusCode::CREATED, Json(complaint))),
        Err(SubmitError::Analysis(err)) => Err(analysis_error(err)),
        Err(SubmitError::NotSaved { analysis, source }) => {
            error!("Queja analizada pero no guardada: {}", source);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            Err((
                status,
                Json(json!({
                    "error": format!("No se pudo guardar la queja: {source}"),
                    "status": status.as_u16(),
                    "saved": false,
                    "analysis": analysis,
                })),
            ))
        }
    }
}

#[axum::debug_handler]
async fn list_complaints_handler(
    State(state): State<AppState>,
    Query(filter): Query<ComplaintFilter>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    state.store.list(&filter).await.map(Json).map_err(storage_error)
}

#[axum::debug_handler]
async fn get_complaint_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Complaint>, ApiError> {
    state.store.get(&id).await.map(Json).map_err(storage_error)
}

#[axum::debug_handler]
async fn update_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusPayload>, JsonRejection>,
) -> Result<Json<Complaint>, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    intake::update_status(state.store.as_ref(), &id, payload.status)
        .await
        .map(Json)
        .map_err(storage_error)
}

#[axum::debug_handler]
async fn analytics_handler(State(state): State<AppState>) -> Result<Json<AnalyticsSummary>, ApiError> {
    let complaints = state
        .store
        .list(&ComplaintFilter::default())
        .await
        .map_err(storage_error)?;
    Ok(Json(analytics::summarize(&complaints)))
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let models_loaded = state.analyzer.models_loaded();
    let (code, status) = if models_loaded {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };
    let body = HealthResponse {
        status,
        service: SERVICE_NAME,
        models_loaded,
        sentiment_available: state.analyzer.sentiment_available(),
        timestamp: Utc::now().to_rfc3339(),
    };
    (code, Json(body))
}
