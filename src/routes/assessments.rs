use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use crate::assessment::types::ResultOverrides;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/assessments/:id", get(get_assessment))
        .route("/api/assessments/:id/complete", post(complete_assessment))
        .route("/api/learners/:id/skills-profile", get(get_skills_profile))
}

async fn complete_assessment(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let overrides = parse_overrides(&body)?;
    let assessment = state
        .orchestrator()
        .complete(&assessment_id, overrides)
        .await?;
    Ok(ok(assessment))
}

async fn get_assessment(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = state
        .orchestrator()
        .assessments()
        .load_assessment(&assessment_id)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Assessment not found: {assessment_id}")))?;
    Ok(ok(assessment))
}

async fn get_skills_profile(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .orchestrator()
        .profiles()
        .load_profile(&learner_id)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Skills profile not found: {learner_id}")))?;
    Ok(ok(profile))
}

/// An empty body means no overrides.
fn parse_overrides(body: &[u8]) -> Result<ResultOverrides, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ResultOverrides::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request("VALIDATION_ERROR", format!("invalid overrides: {e}")))
}
