pub mod config;
pub mod downsample;
pub mod error;
pub mod forecast;
pub mod grid;
pub mod locations;
pub mod models;
pub mod normalize;
pub mod planner;
pub mod raster;
pub mod reconstruct;
pub mod search;
pub mod sources;

pub use config::PlannerConfig;
pub use error::{ErrorKind, Layer, PathError, PathResult, SourceError};
pub use forecast::{
    apply_dynamic_risk, decode_compass_rose, load_bulletins, match_forecast, ForecastBulletin,
    ForecastTable,
};
pub use locations::{Region, RegionResolver};
pub use models::{Coord, Facing, ForecastRecord, PathPlan, PathStats, Waypoint};
pub use planner::{PathFinder, PathRequest};
pub use raster::{load_ascii_grid, parse_ascii_grid, GeoTransform, MemoryRaster, SampleGrid};
pub use sources::{ForecastContext, ForecastSource, LocationResolver, RasterSource, TerrainSources};
