//! Route planning against terrain grids on local disk.

use anyhow::{Context, Result};
use avroute_core::{
    load_ascii_grid, load_bulletins, ForecastContext, ForecastTable, MemoryRaster, PathFinder,
    PathPlan, PathRequest, PathResult, PlannerConfig, RegionResolver, TerrainSources,
};
use std::path::Path;

pub struct LocalTerrain {
    elevation: MemoryRaster,
    aspect: Option<MemoryRaster>,
    risk: MemoryRaster,
    forecasts: Option<ForecastTable>,
    regions: RegionResolver,
}

impl LocalTerrain {
    pub fn new(elevation: MemoryRaster, risk: MemoryRaster) -> Self {
        Self {
            elevation,
            aspect: None,
            risk,
            forecasts: None,
            regions: RegionResolver::scottish_regions(),
        }
    }

    pub fn load(elevation: &Path, risk: &Path) -> Result<Self> {
        let elevation = load_ascii_grid(elevation)
            .with_context(|| format!("loading elevation grid {}", elevation.display()))?;
        let risk = load_ascii_grid(risk)
            .with_context(|| format!("loading risk grid {}", risk.display()))?;
        Ok(Self::new(elevation, risk))
    }

    pub fn with_aspect(mut self, aspect: MemoryRaster) -> Self {
        self.aspect = Some(aspect);
        self
    }

    pub fn with_forecasts(mut self, forecasts: ForecastTable) -> Self {
        self.forecasts = Some(forecasts);
        self
    }

    pub fn with_regions(mut self, regions: RegionResolver) -> Self {
        self.regions = regions;
        self
    }

    /// Loads an aspect grid and a bulletin file; only the newest bulletin
    /// per location is kept.
    pub fn load_forecast_inputs(self, aspect: &Path, bulletins: &Path) -> Result<Self> {
        let aspect_grid = load_ascii_grid(aspect)
            .with_context(|| format!("loading aspect grid {}", aspect.display()))?;
        let bulletins = load_bulletins(bulletins)
            .with_context(|| format!("reading bulletins {}", bulletins.display()))?;
        let table = ForecastTable::from_bulletins(&bulletins)?;
        tracing::debug!(locations = table.len(), "forecasts loaded");
        Ok(self.with_aspect(aspect_grid).with_forecasts(table))
    }

    /// Forecasts adjust risk only when both aspect and forecasts are set.
    pub fn plan(&self, config: PlannerConfig, request: &PathRequest) -> PathResult<PathPlan> {
        let sources = TerrainSources {
            elevation: &self.elevation,
            aspect: self
                .aspect
                .as_ref()
                .map(|a| a as &dyn avroute_core::RasterSource),
            risk: &self.risk,
        };
        let finder = PathFinder::new(config, sources);
        match (&self.aspect, &self.forecasts) {
            (Some(_), Some(forecasts)) => finder
                .with_forecasts(ForecastContext {
                    forecasts,
                    locations: &self.regions,
                })
                .find_path(request),
            _ => finder.find_path(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avroute_core::{parse_ascii_grid, Coord, ErrorKind, Region};

    fn grid(value: f64) -> MemoryRaster {
        let mut text = String::from(
            "ncols 5\nnrows 5\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n",
        );
        for _ in 0..5 {
            text.push_str(&format!("{value} {value} {value} {value} {value}\n"));
        }
        parse_ascii_grid(&text).unwrap()
    }

    fn request(risk_weight: f64) -> PathRequest {
        PathRequest {
            from: Coord::new(0.0, 5.0),
            to: Coord::new(4.0, 1.0),
            risk_weight,
            time_budget_s: 5.0,
        }
    }

    #[test]
    fn flat_grid_gives_direct_path() {
        let terrain = LocalTerrain::new(grid(250.0), grid(0.0));
        let plan = terrain.plan(PlannerConfig::default(), &request(0.5)).unwrap();
        assert!(plan.stats.direct);
        assert_eq!(plan.waypoints.len(), 5);
        assert_eq!(plan.waypoints[0].height_m, 250.0);
        assert_eq!(plan.waypoints[4].lon, 4.0);
        assert_eq!(plan.waypoints[4].lat, 1.0);
    }

    #[test]
    fn forecasts_need_a_known_location() {
        let terrain = LocalTerrain::new(grid(700.0), grid(1.0))
            .with_aspect(grid(0.0))
            .with_forecasts(ForecastTable::new())
            .with_regions(RegionResolver::new(vec![Region::new(
                "Test Range",
                Coord::new(-1.0, -1.0),
                Coord::new(6.0, 6.0),
            )]));
        let err = terrain
            .plan(PlannerConfig::default(), &request(0.5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn aspect_without_forecasts_uses_static_risk() {
        let terrain = LocalTerrain::new(grid(700.0), grid(1.0)).with_aspect(grid(0.0));
        let plan = terrain.plan(PlannerConfig::default(), &request(0.5)).unwrap();
        assert!(!plan.stats.direct);
        assert_eq!(plan.message, "Path found.");
    }

    #[test]
    fn missing_files_are_reported() {
        let err = LocalTerrain::load(Path::new("/nonexistent/dem.asc"), Path::new("risk.asc"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("elevation"));
    }
}
