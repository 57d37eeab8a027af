use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::prediction::{PredictionRequest, PredictionResponse};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.classifier.model_name()
    }))
}

async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, (StatusCode, Json<Value>)> {
    if request.text.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "text must not be empty"})),
        ));
    }

    debug!("Prediction request: {} chars", request.text.chars().count());

    let classifier = state.classifier.clone();
    let result = tokio::task::spawn_blocking(move || classifier.classify(&request.text))
        .await
        .map_err(|e| {
            error!("Inference task panicked: {}", e);
            internal_error("inference task failed")
        })?
        .map_err(|e| {
            error!("Inference failed: {}", e);
            internal_error(&e.to_string())
        })?;

    Ok(Json(PredictionResponse { result }))
}

fn internal_error(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": message})),
    )
}
