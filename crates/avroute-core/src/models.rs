//! Core data models shared by the engine, its sources and its callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A geodetic coordinate, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

impl Coord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// One point of a planned route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lon: f64,
    pub lat: f64,
    pub height_m: f64,
}

/// Compass octant a slope faces, clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Facing {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Facing {
    /// Octants in compass-rose order.
    pub const ALL: [Facing; 8] = [
        Facing::N,
        Facing::NE,
        Facing::E,
        Facing::SE,
        Facing::S,
        Facing::SW,
        Facing::W,
        Facing::NW,
    ];

    /// Classifies an aspect in degrees (ArcGIS convention). Each sector is
    /// 45° wide, centred on its compass point and inclusive at its upper
    /// edge, so an exact boundary belongs to the clockwise-earlier sector.
    /// Values outside `[0, 360]` (flat cells, nodata) have no facing.
    pub fn from_aspect(aspect: f64) -> Option<Facing> {
        if !(0.0..=360.0).contains(&aspect) {
            return None;
        }
        if aspect > 337.5 || aspect <= 22.5 {
            return Some(Facing::N);
        }
        let sector = ((aspect - 22.5) / 45.0).ceil() as usize;
        Facing::ALL.get(sector).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::N => "N",
            Facing::NE => "NE",
            Facing::E => "E",
            Facing::SE => "SE",
            Facing::S => "S",
            Facing::SW => "SW",
            Facing::W => "W",
            Facing::NW => "NW",
        }
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Facing::ALL
            .iter()
            .copied()
            .find(|facing| facing.as_str() == value.trim())
            .ok_or_else(|| format!("unknown direction {value:?}"))
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day's avalanche forecast for one compass direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub facing: Facing,
    /// Altitude boundaries in metres: lower, middle, upper.
    pub lower_boundary_m: i32,
    pub middle_boundary_m: i32,
    pub upper_boundary_m: i32,
    pub lower_primary: u8,
    pub lower_secondary: u8,
    pub upper_primary: u8,
    pub upper_secondary: u8,
}

/// A successfully planned route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPlan {
    pub waypoints: Vec<Waypoint>,
    pub message: String,
    pub stats: PathStats,
}

/// Bookkeeping about how a plan was produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathStats {
    /// Grid dimensions the search ran on, after downsampling.
    pub grid_cols: usize,
    pub grid_rows: usize,
    /// Block factors applied along x and y.
    pub factor_x: usize,
    pub factor_y: usize,
    pub nodes_expanded: usize,
    /// Accumulated normalised cost of the returned path.
    pub cost: f64,
    /// True when the zero-risk shortcut replaced the search.
    pub direct: bool,
}
