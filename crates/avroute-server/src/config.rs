//! Server configuration from environment.

use std::env;
use std::path::PathBuf;

use avroute_core::PlannerConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// ESRI ASCII grids for the terrain layers. Path search is disabled
    /// until elevation and risk are both set.
    pub elevation_grid: Option<PathBuf>,
    pub aspect_grid: Option<PathBuf>,
    pub risk_grid: Option<PathBuf>,
    pub default_time_budget_s: f64,
    pub max_mean_extent: usize,
    pub target_extent: usize,
    pub forecast_cache_ttl_s: u64,
    pub forecast_cache_max_entries: usize,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let planner = PlannerConfig::default();
        Self {
            server_port: parsed("AVROUTE_PORT", 3000),
            database_path: env::var("AVROUTE_DATABASE_PATH")
                .unwrap_or_else(|_| "data/avroute.db".to_string()),
            database_max_connections: parsed("AVROUTE_DATABASE_MAX_CONNECTIONS", 5),
            elevation_grid: env::var_os("AVROUTE_ELEVATION_GRID").map(PathBuf::from),
            aspect_grid: env::var_os("AVROUTE_ASPECT_GRID").map(PathBuf::from),
            risk_grid: env::var_os("AVROUTE_RISK_GRID").map(PathBuf::from),
            default_time_budget_s: parsed("AVROUTE_DEFAULT_TIME_BUDGET_S", 30.0),
            max_mean_extent: parsed("AVROUTE_MAX_MEAN_EXTENT", planner.max_mean_extent),
            target_extent: parsed("AVROUTE_TARGET_EXTENT", planner.target_extent),
            forecast_cache_ttl_s: parsed("AVROUTE_FORECAST_CACHE_TTL_S", 300),
            forecast_cache_max_entries: parsed("AVROUTE_FORECAST_CACHE_MAX_ENTRIES", 64),
        }
    }

    /// Engine settings with the size limits overridden from the environment.
    pub fn planner(&self) -> PlannerConfig {
        PlannerConfig {
            max_mean_extent: self.max_mean_extent,
            target_extent: self.target_extent,
            ..PlannerConfig::default()
        }
    }
}
