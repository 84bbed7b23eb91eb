pub mod assessment;
pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::StoreError;
use crate::state::AppState;

pub async fn create_app(config: &Config) -> Result<axum::Router, StoreError> {
    let state = AppState::from_config(config).await?;

    Ok(routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
