//! Server-side path planning on top of the core engine.

use std::sync::Arc;

use avroute_core::{
    Coord, ErrorKind, ForecastContext, ForecastTable, LocationResolver, PathError, PathFinder,
    PathPlan, PathRequest, PathStats, Waypoint,
};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info_span, warn};

use crate::api::request_id::RequestId;
use crate::state::AppState;

const DEFAULT_RISK_WEIGHT: f64 = 0.5;

/// Raw path segments of a path request, parsed by the handler so that
/// malformed numbers become validation errors.
#[derive(Debug, Clone, Deserialize)]
pub struct PathCorners {
    pub lon_a: String,
    pub lat_a: String,
    pub lon_b: String,
    pub lat_b: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathQuery {
    pub risk_weight: Option<String>,
    pub time_budget_s: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathResponse {
    pub ok: bool,
    pub waypoints: Vec<Waypoint>,
    pub message: String,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PathStats>,
}

impl PathResponse {
    fn success(plan: PathPlan) -> Self {
        Self {
            ok: true,
            waypoints: plan.waypoints,
            message: plan.message,
            errors: Vec::new(),
            kind: None,
            stats: Some(plan.stats),
        }
    }

    fn failure(message: &str, errors: Vec<String>, kind: Option<ErrorKind>) -> Self {
        Self {
            ok: false,
            waypoints: Vec::new(),
            message: message.to_string(),
            errors,
            kind,
            stats: None,
        }
    }

    fn from_error(err: &PathError) -> Self {
        Self::failure("No path found.", vec![err.to_string()], Some(err.kind()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Data => StatusCode::NOT_FOUND,
        ErrorKind::Deadline => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::Exhausted => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn parse_coordinate(name: &str, value: &str) -> Result<f64, PathError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| PathError::InvalidCoordinate(format!("{name} {value:?} is not a number")))
}

/// Turns raw request parts into an engine request. Missing optional
/// parameters fall back to defaults; unparsable ones are rejected.
pub fn parse_request(
    corners: &PathCorners,
    query: &PathQuery,
    default_time_budget_s: f64,
) -> Result<PathRequest, PathError> {
    let from = Coord::new(
        parse_coordinate("lon_a", &corners.lon_a)?,
        parse_coordinate("lat_a", &corners.lat_a)?,
    );
    let to = Coord::new(
        parse_coordinate("lon_b", &corners.lon_b)?,
        parse_coordinate("lat_b", &corners.lat_b)?,
    );
    let risk_weight = match &query.risk_weight {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| PathError::InvalidRiskWeight(f64::NAN))?,
        None => DEFAULT_RISK_WEIGHT,
    };
    let time_budget_s = match &query.time_budget_s {
        Some(raw) => raw.trim().parse::<f64>().unwrap_or(f64::NAN),
        None => default_time_budget_s,
    };
    Ok(PathRequest {
        from,
        to,
        risk_weight,
        time_budget_s,
    })
}

/// Plans a path for one HTTP request. Forecasts are fetched here so the
/// engine, which runs on the blocking pool, never touches the database.
/// Engine logs carry `request_id` since the blocking pool does not
/// inherit the request span.
pub async fn plan_path(
    state: Arc<AppState>,
    request_id: RequestId,
    corners: PathCorners,
    query: PathQuery,
) -> (StatusCode, PathResponse) {
    let request = match parse_request(&corners, &query, state.config().default_time_budget_s) {
        Ok(request) => request,
        Err(err) => return (status_for(err.kind()), PathResponse::from_error(&err)),
    };
    if let Err(err) = request.validate(&state.config().planner()) {
        return (status_for(err.kind()), PathResponse::from_error(&err));
    }

    let Some(terrain) = state.terrain() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            PathResponse::failure(
                "Path search unavailable.",
                vec!["terrain layers are not configured".to_string()],
                None,
            ),
        );
    };

    let mut table = ForecastTable::new();
    if terrain.aspect.is_some() {
        let centre = Coord::new(
            (request.from.lon + request.to.lon) / 2.0,
            (request.from.lat + request.to.lat) / 2.0,
        );
        if let Some(location) = state.regions().location_for_coordinate(centre) {
            match state.newest_forecasts(&location).await {
                Ok(records) => table.insert(location, records),
                Err(err) => {
                    error!("forecast lookup failed: {err:#}");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        PathResponse::failure(
                            "Forecast store unavailable.",
                            vec![err.to_string()],
                            None,
                        ),
                    );
                }
            }
        }
    }

    let terrain = Arc::clone(terrain);
    let planner = state.config().planner();
    let regions = state.regions().clone();
    let span = info_span!("find_path", request_id = %request_id);
    let joined = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        PathFinder::new(planner, terrain.sources())
            .with_forecasts(ForecastContext {
                forecasts: &table,
                locations: &regions,
            })
            .find_path(&request)
    })
    .await;

    match joined {
        Ok(Ok(plan)) => (StatusCode::OK, PathResponse::success(plan)),
        Ok(Err(err)) => {
            if err.kind() == ErrorKind::Exhausted {
                error!(%request_id, "path search exhausted: {err}");
            } else {
                warn!(%request_id, "path request failed: {err}");
            }
            (status_for(err.kind()), PathResponse::from_error(&err))
        }
        Err(err) => {
            error!("path worker failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                PathResponse::failure("Path search failed.", vec![err.to_string()], None),
            )
        }
    }
}
