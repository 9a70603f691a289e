//! Request validation and the end-to-end path pipeline.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::downsample::{downsample, plan_reduction, Reduce};
use crate::error::{Layer, PathError, PathResult};
use crate::forecast::apply_dynamic_risk;
use crate::grid::{validate_layer, Grid};
use crate::models::{Coord, PathPlan, PathStats};
use crate::normalize::normalize;
use crate::reconstruct::{backtrace, direct_path, to_waypoints};
use crate::search::{search, SearchParams};
use crate::sources::{ForecastContext, TerrainSources};

/// A route request between two corners of a rectangular area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    pub from: Coord,
    pub to: Coord,
    /// 0 weighs only travel effort, 1 only avalanche risk.
    pub risk_weight: f64,
    pub time_budget_s: f64,
}

impl PathRequest {
    pub fn validate(&self, config: &PlannerConfig) -> PathResult<()> {
        for (name, coord) in [("source", self.from), ("destination", self.to)] {
            if !coord.lon.is_finite() || !(-180.0..=180.0).contains(&coord.lon) {
                return Err(PathError::InvalidCoordinate(format!(
                    "{name} longitude {} outside [-180, 180]",
                    coord.lon
                )));
            }
            if !coord.lat.is_finite() || !(-90.0..=90.0).contains(&coord.lat) {
                return Err(PathError::InvalidCoordinate(format!(
                    "{name} latitude {} outside [-90, 90]",
                    coord.lat
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.risk_weight) {
            return Err(PathError::InvalidRiskWeight(self.risk_weight));
        }
        if !self.time_budget_s.is_finite() || self.time_budget_s <= config.min_time_budget_s {
            return Err(PathError::InvalidTimeBudget {
                got: self.time_budget_s,
                min: config.min_time_budget_s,
            });
        }
        Ok(())
    }
}

/// Where the request's endpoints sit on the area's grid.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Orientation {
    top_left: Coord,
    bottom_right: Coord,
    /// Source lies east of the destination.
    flip_x: bool,
    /// Source lies south of the destination.
    flip_y: bool,
}

impl Orientation {
    fn of(request: &PathRequest) -> Self {
        let (a, b) = (request.from, request.to);
        Self {
            top_left: Coord::new(a.lon.min(b.lon), a.lat.max(b.lat)),
            bottom_right: Coord::new(a.lon.max(b.lon), a.lat.min(b.lat)),
            flip_x: a.lon > b.lon,
            flip_y: a.lat < b.lat,
        }
    }

    /// Source and goal cells on a grid with the given maxima.
    fn endpoints(&self, x_max: usize, y_max: usize) -> ((usize, usize), (usize, usize)) {
        let (sx, gx) = if self.flip_x { (x_max, 0) } else { (0, x_max) };
        let (sy, gy) = if self.flip_y { (y_max, 0) } else { (0, y_max) };
        ((sx, sy), (gx, gy))
    }
}

/// Plans routes over one set of terrain layers. Holds no per-request
/// state, so one finder may serve concurrent requests.
pub struct PathFinder<'a> {
    config: PlannerConfig,
    terrain: TerrainSources<'a>,
    forecast: Option<ForecastContext<'a>>,
}

impl<'a> PathFinder<'a> {
    pub fn new(config: PlannerConfig, terrain: TerrainSources<'a>) -> Self {
        Self {
            config,
            terrain,
            forecast: None,
        }
    }

    /// Enables forecast-adjusted risk. Requires an aspect layer to take effect.
    pub fn with_forecasts(mut self, forecast: ForecastContext<'a>) -> Self {
        self.forecast = Some(forecast);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn find_path(&self, request: &PathRequest) -> PathResult<PathPlan> {
        let started = Instant::now();
        request.validate(&self.config)?;
        let budget = Duration::from_secs_f64(request.time_budget_s);

        let orientation = Orientation::of(request);
        let (top_left, bottom_right) = (orientation.top_left, orientation.bottom_right);

        let (raw_rows, raw_cols) = self
            .terrain
            .elevation
            .block_shape(top_left, bottom_right)
            .map_err(PathError::layer(Layer::Elevation))?;
        let reduction = plan_reduction(raw_rows, raw_cols, &self.config)?;
        debug!(
            raw_cols,
            raw_rows,
            factor_x = reduction.factor_x,
            factor_y = reduction.factor_y,
            "area accepted"
        );

        let elevation = self
            .terrain
            .elevation
            .read_block(top_left, bottom_right)
            .map_err(PathError::layer(Layer::Elevation))?;
        let shape = elevation.shape();
        validate_layer(Layer::Elevation, &elevation, shape)?;

        let risk = self
            .terrain
            .risk
            .read_block(top_left, bottom_right)
            .map_err(PathError::layer(Layer::Risk))?;
        validate_layer(Layer::Risk, &risk, shape)?;

        let aspect = match (self.terrain.aspect, &self.forecast) {
            (Some(source), Some(_)) => {
                let aspect = source
                    .read_block(top_left, bottom_right)
                    .map_err(PathError::layer(Layer::Aspect))?;
                validate_layer(Layer::Aspect, &aspect, shape)?;
                Some(aspect)
            }
            _ => None,
        };

        let elevation = downsample(&elevation, reduction, Reduce::Mean);
        let mut risk = downsample(&risk, reduction, Reduce::Max);

        if let (Some(aspect), Some(forecast)) = (aspect, &self.forecast) {
            // Plain arithmetic mean, not a circular one: a block straddling
            // north (350° and 10°) averages to 180°.
            let aspect = downsample(&aspect, reduction, Reduce::Mean);
            let centre = Coord::new(
                (top_left.lon + bottom_right.lon) / 2.0,
                (top_left.lat + bottom_right.lat) / 2.0,
            );
            let location = forecast.locations.location_for_coordinate(centre).ok_or(
                PathError::LocationUnavailable {
                    lon: centre.lon,
                    lat: centre.lat,
                },
            )?;
            let records = forecast
                .forecasts
                .forecasts_for_location(&location)
                .filter(|records| !records.is_empty())
                .ok_or_else(|| PathError::ForecastUnavailable(location.clone()))?;
            debug!(%location, records = records.len(), "applying forecast");
            apply_dynamic_risk(&mut risk, &elevation, &aspect, &records);
        }

        let mut grid = Grid::build(&elevation, &risk, &self.config)?;
        let (start, goal) = orientation.endpoints(grid.x_max(), grid.y_max());
        let mut stats = PathStats {
            grid_cols: grid.cols(),
            grid_rows: grid.rows(),
            factor_x: reduction.factor_x,
            factor_y: reduction.factor_y,
            ..PathStats::default()
        };

        let (cells, message) = if grid.has_positive_risk() {
            let norm = normalize(&mut grid, self.config.risk_clip_percentile);
            debug!(
                min_cost = norm.min_cost,
                max_cost = norm.max_cost,
                risk_floor = ?norm.risk_floor,
                "grid normalised"
            );
            let params = SearchParams {
                start,
                goal,
                risk_weight: request.risk_weight,
                time_budget: budget.saturating_sub(started.elapsed()),
            };
            let outcome = search(&grid, &params, &self.config)?;
            stats.nodes_expanded = outcome.expanded;
            stats.cost = outcome.cost;
            let cells = backtrace(&outcome.came_from, outcome.start, outcome.goal)
                .into_iter()
                .map(|index| grid.position(index))
                .collect::<Vec<_>>();
            (cells, "Path found.".to_string())
        } else {
            stats.direct = true;
            (
                direct_path(start, goal),
                "No avalanche risk in the area, direct path returned.".to_string(),
            )
        };

        let waypoints = to_waypoints(&cells, &grid, reduction, top_left, self.terrain.elevation)?;
        info!(
            waypoints = waypoints.len(),
            expanded = stats.nodes_expanded,
            direct = stats.direct,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "path planned"
        );
        Ok(PathPlan {
            waypoints,
            message,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::ForecastTable;
    use crate::locations::{Region, RegionResolver};
    use crate::models::{Facing, ForecastRecord};
    use crate::raster::{GeoTransform, MemoryRaster, SampleGrid};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const PIXEL: f64 = 0.001;

    fn raster(grid: SampleGrid) -> MemoryRaster {
        MemoryRaster::new(
            GeoTransform {
                origin_lon: -5.0,
                origin_lat: 57.0,
                pixel_width: PIXEL,
                pixel_height: -PIXEL,
            },
            grid,
        )
    }

    /// Corner coordinates of cell `(x, y)`.
    fn at(x: usize, y: usize) -> Coord {
        Coord::new(-5.0 + x as f64 * PIXEL, 57.0 - y as f64 * PIXEL)
    }

    fn request(from: Coord, to: Coord, risk_weight: f64) -> PathRequest {
        PathRequest {
            from,
            to,
            risk_weight,
            time_budget_s: 10.0,
        }
    }

    fn cells_of(plan: &PathPlan) -> Vec<(usize, usize)> {
        plan.waypoints
            .iter()
            .map(|w| {
                (
                    ((w.lon + 5.0) / PIXEL).round() as usize,
                    ((57.0 - w.lat) / PIXEL).round() as usize,
                )
            })
            .collect()
    }

    #[test]
    fn flat_zero_risk_returns_diagonal() {
        let elevation = raster(SampleGrid::filled(20, 20, 300.0));
        let risk = raster(SampleGrid::filled(20, 20, 0.0));
        for weight in [0.0, 0.5, 1.0] {
            let finder = PathFinder::new(
                PlannerConfig::default(),
                TerrainSources {
                    elevation: &elevation,
                    aspect: None,
                    risk: &risk,
                },
            );
            let plan = finder
                .find_path(&request(at(0, 0), at(19, 19), weight))
                .unwrap();
            assert!(plan.stats.direct);
            assert_eq!(plan.waypoints.len(), 20);
            let cells = cells_of(&plan);
            for (i, cell) in cells.iter().enumerate() {
                assert_eq!(*cell, (i, i));
            }
            assert!(plan.waypoints.iter().all(|w| w.height_m == 300.0));
        }
    }

    #[test]
    fn zero_risk_rectangle_has_max_extent_length() {
        let elevation = raster(SampleGrid::filled(6, 12, 0.0));
        let risk = raster(SampleGrid::filled(6, 12, 0.0));
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        // Source in the south-east corner.
        let plan = finder.find_path(&request(at(11, 5), at(0, 0), 0.3)).unwrap();
        let cells = cells_of(&plan);
        assert_eq!(cells.len(), 12);
        assert_eq!(cells[0], (11, 5));
        assert_eq!(cells[5], (6, 0));
        assert_eq!(*cells.last().unwrap(), (0, 0));
    }

    #[test]
    fn risk_wall_forces_detour() {
        let elevation = raster(SampleGrid::filled(20, 20, 300.0));
        let mut wall = SampleGrid::filled(20, 20, 0.0);
        for i in 0..18 {
            wall.set(i, 19 - i - 1, 1.0);
            wall.set(i + 1, 19 - i - 1, 1.0);
        }
        let risk = raster(wall.clone());
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let plan = finder.find_path(&request(at(0, 0), at(19, 19), 1.0)).unwrap();
        let cells = cells_of(&plan);
        assert_eq!(cells[0], (0, 0));
        assert_eq!(*cells.last().unwrap(), (19, 19));
        assert!(cells.len() > 20);
        assert!(cells.iter().all(|&(x, y)| wall.get(x, y) == 0.0));
        assert_eq!(plan.stats.cost, 0.0);
    }

    #[test]
    fn risk_weight_zero_ignores_risk_values() {
        let mut rng = StdRng::seed_from_u64(7);
        let heights: Vec<f64> = (0..30 * 30).map(|_| rng.random_range(100.0..140.0)).collect();
        let elevation = raster(SampleGrid::new(30, 30, heights).unwrap());

        let mut baseline: Option<Vec<(usize, usize)>> = None;
        for _ in 0..5 {
            let values: Vec<f64> = (0..30 * 30).map(|_| rng.random_range(0.01..1.0)).collect();
            let risk = raster(SampleGrid::new(30, 30, values).unwrap());
            let finder = PathFinder::new(
                PlannerConfig::default(),
                TerrainSources {
                    elevation: &elevation,
                    aspect: None,
                    risk: &risk,
                },
            );
            let plan = finder.find_path(&request(at(0, 29), at(29, 0), 0.0)).unwrap();
            let cells = cells_of(&plan);
            match &baseline {
                Some(expected) => assert_eq!(&cells, expected),
                None => baseline = Some(cells),
            }
        }
    }

    #[test]
    fn repeated_requests_are_identical() {
        let mut rng = StdRng::seed_from_u64(42);
        let heights: Vec<f64> = (0..25 * 25).map(|_| rng.random_range(0.0..30.0)).collect();
        let risks: Vec<f64> = (0..25 * 25).map(|_| rng.random_range(0.0..5.0)).collect();
        let elevation = raster(SampleGrid::new(25, 25, heights).unwrap());
        let risk = raster(SampleGrid::new(25, 25, risks).unwrap());
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let req = request(at(3, 20), at(22, 1), 0.6);
        let first = finder.find_path(&req).unwrap();
        let second = finder.find_path(&req).unwrap();
        assert_eq!(first.waypoints, second.waypoints);
    }

    #[test]
    fn oversized_area_is_a_validation_failure() {
        let elevation = raster(SampleGrid::filled(40, 40, 0.0));
        let risk = raster(SampleGrid::filled(40, 40, 1.0));
        let config = PlannerConfig {
            max_mean_extent: 30,
            ..PlannerConfig::default()
        };
        let finder = PathFinder::new(
            config,
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let err = finder.find_path(&request(at(0, 0), at(39, 39), 0.5)).unwrap_err();
        assert!(matches!(err, PathError::AreaTooLarge { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn area_past_the_read_limit_is_still_a_validation_failure() {
        let elevation = raster(SampleGrid::filled(3, 60, 0.0)).with_max_block_cells(50);
        let risk = raster(SampleGrid::filled(3, 60, 1.0)).with_max_block_cells(50);
        let terrain = TerrainSources {
            elevation: &elevation,
            aspect: None,
            risk: &risk,
        };
        let wide = request(at(0, 0), at(59, 2), 0.5);

        let config = PlannerConfig {
            max_mean_extent: 20,
            ..PlannerConfig::default()
        };
        let err = PathFinder::new(config, terrain).find_path(&wide).unwrap_err();
        assert!(matches!(err, PathError::AreaTooLarge { rows: 3, cols: 60, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);

        // Within the size policy, the source's own limit surfaces on read.
        let err = PathFinder::new(PlannerConfig::default(), terrain)
            .find_path(&wide)
            .unwrap_err();
        assert!(matches!(
            err,
            PathError::Source {
                layer: Layer::Elevation,
                source: crate::error::SourceError::TooLarge { .. }
            }
        ));
    }

    #[test]
    fn single_row_area_is_too_small() {
        let elevation = raster(SampleGrid::filled(10, 10, 0.0));
        let risk = raster(SampleGrid::filled(10, 10, 1.0));
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let err = finder.find_path(&request(at(0, 4), at(9, 4), 0.5)).unwrap_err();
        assert!(matches!(err, PathError::AreaTooSmall { .. }));
    }

    #[test]
    fn invalid_inputs_are_rejected_before_reading() {
        let elevation = raster(SampleGrid::filled(10, 10, 0.0));
        let risk = raster(SampleGrid::filled(10, 10, 1.0));
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let mut req = request(at(0, 0), at(9, 9), 1.5);
        assert!(matches!(
            finder.find_path(&req),
            Err(PathError::InvalidRiskWeight(_))
        ));
        req.risk_weight = 0.5;
        req.time_budget_s = 1.0;
        assert!(matches!(
            finder.find_path(&req),
            Err(PathError::InvalidTimeBudget { .. })
        ));
        req.time_budget_s = 5.0;
        req.from.lat = f64::NAN;
        assert!(matches!(
            finder.find_path(&req),
            Err(PathError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn out_of_coverage_is_a_data_error() {
        let elevation = raster(SampleGrid::filled(10, 10, 0.0));
        let risk = raster(SampleGrid::filled(10, 10, 1.0));
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let err = finder
            .find_path(&request(at(0, 0), Coord::new(-4.0, 56.0), 0.5))
            .unwrap_err();
        assert!(matches!(
            err,
            PathError::Source {
                layer: Layer::Elevation,
                ..
            }
        ));
    }

    #[test]
    fn large_area_is_downsampled() {
        let elevation = raster(SampleGrid::filled(90, 50, 10.0));
        let risk = raster(SampleGrid::filled(90, 50, 2.0));
        let config = PlannerConfig {
            target_extent: 20,
            ..PlannerConfig::default()
        };
        let finder = PathFinder::new(
            config,
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let plan = finder.find_path(&request(at(0, 0), at(49, 89), 0.5)).unwrap();
        assert_eq!((plan.stats.factor_x, plan.stats.factor_y), (3, 5));
        assert_eq!((plan.stats.grid_cols, plan.stats.grid_rows), (17, 18));
        for (x, y) in cells_of(&plan) {
            assert_eq!(x % 3, 0);
            assert_eq!(y % 5, 0);
        }
        let last = cells_of(&plan).pop().unwrap();
        assert_eq!(last, (48, 85));
    }

    #[test]
    fn deadline_is_reported_without_partial_path() {
        let mut rng = StdRng::seed_from_u64(3);
        let risks: Vec<f64> = (0..200 * 200).map(|_| rng.random_range(0.1..1.0)).collect();
        let elevation = raster(SampleGrid::filled(200, 200, 0.0));
        let risk = raster(SampleGrid::new(200, 200, risks).unwrap());
        let config = PlannerConfig {
            min_time_budget_s: 0.0,
            ..PlannerConfig::default()
        };
        let finder = PathFinder::new(
            config,
            TerrainSources {
                elevation: &elevation,
                aspect: None,
                risk: &risk,
            },
        );
        let mut req = request(at(0, 0), at(199, 199), 0.7);
        req.time_budget_s = 1e-9;
        let err = finder.find_path(&req).unwrap_err();
        assert!(matches!(err, PathError::DeadlineExceeded { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Deadline);
    }

    fn forecast_fixture() -> (RegionResolver, ForecastTable) {
        let resolver = RegionResolver::new(vec![Region::new(
            "Test Range",
            Coord::new(-5.1, 56.9),
            Coord::new(-4.9, 57.1),
        )]);
        let date = NaiveDate::from_ymd_opt(2018, 1, 20).unwrap();
        let records = Facing::ALL
            .iter()
            .map(|&facing| ForecastRecord {
                date,
                facing,
                lower_boundary_m: 100,
                middle_boundary_m: 500,
                upper_boundary_m: 1000,
                lower_primary: 2,
                lower_secondary: 1,
                upper_primary: if facing == Facing::N { 5 } else { 3 },
                upper_secondary: 0,
            })
            .collect();
        let mut table = ForecastTable::new();
        table.insert("Test Range", records);
        (resolver, table)
    }

    #[test]
    fn forecast_below_snow_line_zeroes_risk() {
        let elevation = raster(SampleGrid::filled(10, 10, 50.0));
        let aspect = raster(SampleGrid::filled(10, 10, 0.0));
        let risk = raster(SampleGrid::filled(10, 10, 0.8));
        let (resolver, table) = forecast_fixture();
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: Some(&aspect),
                risk: &risk,
            },
        )
        .with_forecasts(ForecastContext {
            forecasts: &table,
            locations: &resolver,
        });
        let plan = finder.find_path(&request(at(0, 0), at(9, 9), 0.5)).unwrap();
        assert!(plan.stats.direct);
        assert_eq!(plan.waypoints.len(), 10);
    }

    #[test]
    fn forecast_steers_away_from_north_slopes() {
        // A north-facing block across the diagonal, everything else faces
        // south; all cells sit in the upper altitude band.
        let mut aspects = SampleGrid::filled(12, 12, 180.0);
        for y in 0..10 {
            for x in 3..10 {
                aspects.set(x, y, 0.0);
            }
        }
        let elevation = raster(SampleGrid::filled(12, 12, 700.0));
        let aspect = raster(aspects);
        let risk = raster(SampleGrid::filled(12, 12, 1.0));
        let (resolver, table) = forecast_fixture();
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: Some(&aspect),
                risk: &risk,
            },
        )
        .with_forecasts(ForecastContext {
            forecasts: &table,
            locations: &resolver,
        });
        let plan = finder.find_path(&request(at(0, 0), at(11, 11), 1.0)).unwrap();
        assert!(!plan.stats.direct);
        assert_eq!(plan.stats.cost, 0.0);
        assert!(cells_of(&plan)
            .iter()
            .all(|&(x, y)| !(3..10).contains(&x) || y >= 10));
    }

    #[test]
    fn unresolved_location_fails_the_search() {
        let elevation = raster(SampleGrid::filled(10, 10, 700.0));
        let aspect = raster(SampleGrid::filled(10, 10, 0.0));
        let risk = raster(SampleGrid::filled(10, 10, 1.0));
        let resolver = RegionResolver::new(Vec::new());
        let (_, table) = forecast_fixture();
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: Some(&aspect),
                risk: &risk,
            },
        )
        .with_forecasts(ForecastContext {
            forecasts: &table,
            locations: &resolver,
        });
        let err = finder.find_path(&request(at(0, 0), at(9, 9), 0.5)).unwrap_err();
        assert!(matches!(err, PathError::LocationUnavailable { .. }));

        let (resolver, _) = forecast_fixture();
        let empty = ForecastTable::new();
        let finder = PathFinder::new(
            PlannerConfig::default(),
            TerrainSources {
                elevation: &elevation,
                aspect: Some(&aspect),
                risk: &risk,
            },
        )
        .with_forecasts(ForecastContext {
            forecasts: &empty,
            locations: &resolver,
        });
        let err = finder.find_path(&request(at(0, 0), at(9, 9), 0.5)).unwrap_err();
        assert!(matches!(err, PathError::ForecastUnavailable(_)));
    }
}
