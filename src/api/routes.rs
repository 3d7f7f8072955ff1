use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::api_error::APIError;
use crate::api::model::HostSnapshot;
use crate::api::server::AppState;

pub(super) fn new(state: AppState, timeout: Duration) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/hosts", get(hosts))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn hosts(State(state): State<AppState>) -> Result<Json<Vec<HostSnapshot>>, APIError> {
    Ok(Json(state.handle.hosts().await?))
}
