//! REST API routes.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::api::request_id::{ensure_request_id, RequestId};
use crate::path_service::{plan_path, PathCorners, PathQuery};
use crate::state::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/v1/paths/:lon_a/:lat_a/:lon_b/:lat_b",
            get(find_path_handler),
        )
        .route("/v1/forecasts/:location", get(get_forecasts))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(ensure_request_id))
        .layer(CorsLayer::permissive())
}

async fn find_path_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(corners): Path<PathCorners>,
    Query(query): Query<PathQuery>,
) -> impl IntoResponse {
    let (status, response) = plan_path(state, request_id, corners, query).await;
    (status, Json(response))
}

async fn get_forecasts(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> impl IntoResponse {
    match state.newest_forecasts(&location).await {
        Ok(records) if records.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("forecast for location {location} not found") })),
        ),
        Ok(records) => (
            StatusCode::OK,
            Json(json!({ "location": location, "forecasts": records })),
        ),
        Err(err) => {
            error!("forecast lookup failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "forecast store unavailable" })),
            )
        }
    }
}
