//! Error types for the path engine and its data sources.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a raster, forecast or location collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("requested window lies outside the source coverage")]
    OutOfCoverage,

    #[error("requested window of {cols}x{rows} cells exceeds the {max} cell limit")]
    TooLarge { rows: usize, cols: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Which raster layer a data error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Elevation,
    Aspect,
    Risk,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Layer::Elevation => "elevation",
            Layer::Aspect => "aspect",
            Layer::Risk => "risk",
        };
        f.write_str(name)
    }
}

/// Broad failure classes a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; retry with corrected parameters.
    Validation,
    /// A collaborator could not supply data for the area.
    Data,
    /// The frontier emptied before the goal was reached.
    Exhausted,
    /// The time budget ran out; retry with a larger budget or smaller area.
    Deadline,
}

/// Every way a path request can fail. The `Display` text is the reason
/// string handed back to callers.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("risk weight must be within [0, 1], got {0}")]
    InvalidRiskWeight(f64),

    #[error("time budget must be greater than {min}s, got {got}s")]
    InvalidTimeBudget { got: f64, min: f64 },

    #[error("requested area too large ({cols}x{rows} cells, mean extent limit {limit})")]
    AreaTooLarge { rows: usize, cols: usize, limit: usize },

    #[error("requested area too small ({cols}x{rows} cells, minimum extent {limit})")]
    AreaTooSmall { rows: usize, cols: usize, limit: usize },

    #[error("{layer} data unavailable: {source}")]
    Source {
        layer: Layer,
        #[source]
        source: SourceError,
    },

    #[error("{layer} samples are not a valid 2-D numeric grid: {reason}")]
    InvalidGrid { layer: Layer, reason: String },

    #[error("location name unavailable for ({lon:.5}, {lat:.5})")]
    LocationUnavailable { lon: f64, lat: f64 },

    #[error("forecast for location {0} not found")]
    ForecastUnavailable(String),

    #[error("waypoint conversion failed at cell ({x}, {y}): {source}")]
    Waypoint {
        x: usize,
        y: usize,
        #[source]
        source: SourceError,
    },

    #[error("search exhausted after {expanded} expansions without reaching the goal")]
    Exhausted { expanded: usize },

    #[error("deadline exceeded after {elapsed_ms} ms ({expanded} expansions)")]
    DeadlineExceeded { elapsed_ms: u128, expanded: usize },
}

impl PathError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PathError::InvalidCoordinate(_)
            | PathError::InvalidRiskWeight(_)
            | PathError::InvalidTimeBudget { .. }
            | PathError::AreaTooLarge { .. }
            | PathError::AreaTooSmall { .. } => ErrorKind::Validation,
            PathError::Source { .. }
            | PathError::InvalidGrid { .. }
            | PathError::LocationUnavailable { .. }
            | PathError::ForecastUnavailable(_)
            | PathError::Waypoint { .. } => ErrorKind::Data,
            PathError::Exhausted { .. } => ErrorKind::Exhausted,
            PathError::DeadlineExceeded { .. } => ErrorKind::Deadline,
        }
    }

    pub(crate) fn layer(layer: Layer) -> impl FnOnce(SourceError) -> PathError {
        move |source| PathError::Source { layer, source }
    }
}

pub type PathResult<T> = Result<T, PathError>;
