//! Shared application state.

use anyhow::{Context, Result};
use avroute_core::{load_ascii_grid, ForecastRecord, MemoryRaster, RegionResolver, TerrainSources};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::ForecastCache;
use crate::config::Config;
use crate::persistence::{forecasts, Database};

/// Terrain rasters held in memory for the life of the process.
pub struct TerrainLayers {
    pub elevation: MemoryRaster,
    pub aspect: Option<MemoryRaster>,
    pub risk: MemoryRaster,
}

impl TerrainLayers {
    /// Loads the configured grids. `None` when elevation or risk is unset.
    pub fn load(config: &Config) -> Result<Option<Self>> {
        let (Some(elevation_path), Some(risk_path)) = (&config.elevation_grid, &config.risk_grid) else {
            return Ok(None);
        };
        let elevation = load_ascii_grid(elevation_path)
            .with_context(|| format!("loading elevation grid {}", elevation_path.display()))?;
        let risk = load_ascii_grid(risk_path)
            .with_context(|| format!("loading risk grid {}", risk_path.display()))?;
        let aspect = match &config.aspect_grid {
            Some(path) => Some(
                load_ascii_grid(path)
                    .with_context(|| format!("loading aspect grid {}", path.display()))?,
            ),
            None => None,
        };
        info!(
            cols = elevation.grid().cols(),
            rows = elevation.grid().rows(),
            aspect = aspect.is_some(),
            "terrain layers loaded"
        );
        Ok(Some(Self {
            elevation,
            aspect,
            risk,
        }))
    }

    pub fn sources(&self) -> TerrainSources<'_> {
        TerrainSources {
            elevation: &self.elevation,
            aspect: self
                .aspect
                .as_ref()
                .map(|a| a as &dyn avroute_core::RasterSource),
            risk: &self.risk,
        }
    }
}

pub struct AppState {
    config: Config,
    db: Database,
    terrain: Option<Arc<TerrainLayers>>,
    regions: RegionResolver,
    forecast_cache: ForecastCache,
}

impl AppState {
    pub fn new(config: Config, db: Database, terrain: Option<TerrainLayers>) -> Self {
        let forecast_cache = ForecastCache::new(
            Duration::from_secs(config.forecast_cache_ttl_s),
            config.forecast_cache_max_entries,
        );
        Self {
            config,
            db,
            terrain: terrain.map(Arc::new),
            regions: RegionResolver::scottish_regions(),
            forecast_cache,
        }
    }

    pub fn with_regions(mut self, regions: RegionResolver) -> Self {
        self.regions = regions;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn terrain(&self) -> Option<&Arc<TerrainLayers>> {
        self.terrain.as_ref()
    }

    pub fn regions(&self) -> &RegionResolver {
        &self.regions
    }

    pub fn forecast_cache(&self) -> &ForecastCache {
        &self.forecast_cache
    }

    /// Newest forecast records for a location name, cached briefly.
    /// Empty when the location or its forecasts are unknown.
    pub async fn newest_forecasts(&self, location: &str) -> Result<Vec<ForecastRecord>> {
        if let Some(records) = self.forecast_cache.get(location) {
            debug!(location, "forecast cache hit");
            return Ok(records);
        }
        let pool = self.db.pool();
        let Some(location_id) = forecasts::select_location_by_name(pool, location).await? else {
            return Ok(Vec::new());
        };
        let records = forecasts::newest_forecasts(pool, location_id).await?;
        if !records.is_empty() {
            self.forecast_cache.insert(location, records.clone());
        }
        Ok(records)
    }
}
