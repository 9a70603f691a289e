//! Capability interfaces for the data the engine consumes.
//!
//! The engine never branches on where samples come from. Raster files,
//! in-memory fixtures and database-backed stores all sit behind these
//! traits and are handed to [`crate::PathFinder`] per request.

use crate::error::SourceError;
use crate::models::{Coord, ForecastRecord};
use crate::raster::SampleGrid;

/// A georeferenced grid of samples (elevation, aspect or static risk).
pub trait RasterSource: Send + Sync {
    /// Number of `(rows, cols)` a [`read_block`](Self::read_block) over the
    /// same corners would return, without reading any samples. Not bound
    /// by the source's read limit, so size policy can judge the full area.
    fn block_shape(&self, top_left: Coord, bottom_right: Coord) -> Result<(usize, usize), SourceError>;

    /// Samples covering the window, row-major from the top-left corner.
    fn read_block(&self, top_left: Coord, bottom_right: Coord) -> Result<SampleGrid, SourceError>;

    /// Geodetic coordinate of the cell `dx` columns right of and `dy` rows
    /// below `origin`, at this source's native resolution.
    fn displacement_to_coordinate(&self, origin: Coord, dx: usize, dy: usize) -> Result<Coord, SourceError>;
}

/// Supplies the current forecast for a named location.
pub trait ForecastSource: Send + Sync {
    /// Records of the newest forecast day, or `None` if the location has none.
    fn forecasts_for_location(&self, location: &str) -> Option<Vec<ForecastRecord>>;
}

/// Maps a coordinate to the forecast location that covers it.
pub trait LocationResolver: Send + Sync {
    fn location_for_coordinate(&self, coord: Coord) -> Option<String>;
}

/// The raster layers a search reads from.
#[derive(Clone, Copy)]
pub struct TerrainSources<'a> {
    pub elevation: &'a dyn RasterSource,
    /// Without an aspect layer no forecast adjustment is applied.
    pub aspect: Option<&'a dyn RasterSource>,
    pub risk: &'a dyn RasterSource,
}

/// Forecast lookups for dynamic risk. Both halves must be present for the
/// adjustment to run.
pub struct ForecastContext<'a> {
    pub forecasts: &'a dyn ForecastSource,
    pub locations: &'a dyn LocationResolver,
}
