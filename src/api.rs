//! HTTP сервис предсказаний

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::PipelineError;
use crate::inference::PredictPipeline;
use crate::types::{ErrorResponse, HealthResponse, HouseFeatures, PredictionResponse, ServiceInfo};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<PredictPipeline>,
}

impl AppState {
    pub fn new(pipeline: PredictPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/predict", post(predict))
        .route("/predictdata", post(predict_form))
        .layer(cors)
        .with_state(state)
}

pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.root() {
            PipelineError::SchemaMismatch(_) | PipelineError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PipelineError::MissingArtifact(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Prediction failed: {}", self.0);
        } else {
            tracing::warn!("Rejected prediction request: {}", self.0);
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Missing or mistyped fields are schema problems; anything else is bad input.
fn rejection_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => PipelineError::schema(err.body_text()).into(),
        other => PipelineError::invalid_input(other.body_text()).into(),
    }
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "House Price ML API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<HouseFeatures>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(features) = payload.map_err(rejection_error)?;
    tracing::info!("Predict request: {} bedrooms, {} sqft", features.no_of_bedrooms, features.flat_area);
    run_prediction(state, features).await
}

async fn predict_form(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Json<PredictionResponse>, ApiError> {
    tracing::info!("Form predict request with {} fields", fields.len());
    let features = HouseFeatures::from_form(&fields)?;
    run_prediction(state, features).await
}

/// Artifact loading and inference are blocking, so they run off the runtime.
async fn run_prediction(state: AppState, features: HouseFeatures) -> Result<Json<PredictionResponse>, ApiError> {
    let prediction = tokio::task::spawn_blocking(move || state.pipeline.predict_one(&features))
        .await
        .map_err(|e| ApiError(PipelineError::Io(std::io::Error::other(e))))??;
    Ok(Json(PredictionResponse { prediction }))
}
