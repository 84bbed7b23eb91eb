use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ml", get(ml_health))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "uptimeSeconds": state.uptime_seconds(),
    }))
}

async fn ml_health(State(state): State<AppState>) -> impl IntoResponse {
    let Some(client) = state.ml_client() else {
        return (
            StatusCode::OK,
            Json(json!({ "available": false, "error": "ML service not configured" })),
        );
    };

    let health = client.check_health().await;
    let status = if health.available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!(health)))
}
