pub mod assessments;
pub mod health;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(assessments::router())
        .with_state(state)
}
