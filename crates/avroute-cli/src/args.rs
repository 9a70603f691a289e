//! Command line arguments shared by the binaries.

use avroute_core::Coord;
use clap::{Args, Parser};
use std::path::PathBuf;

/// Parses `lon,lat`.
pub fn parse_coord(raw: &str) -> Result<Coord, String> {
    let (lon, lat) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LON,LAT, got {raw:?}"))?;
    let number = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("{s:?} is not a number"))
    };
    Ok(Coord::new(number(lon)?, number(lat)?))
}

/// Endpoints and search knobs common to local and remote planning.
#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    /// Start corner as LON,LAT
    #[arg(long, allow_hyphen_values = true, value_parser = parse_coord)]
    pub from: Coord,

    /// Goal corner as LON,LAT
    #[arg(long, allow_hyphen_values = true, value_parser = parse_coord)]
    pub to: Coord,

    /// 0 = terrain cost only, 1 = avalanche risk only
    #[arg(long, default_value_t = 0.5)]
    pub risk_weight: f64,

    /// Search deadline in seconds
    #[arg(long, default_value_t = 30.0)]
    pub time_budget: f64,
}

/// Plan an avalanche-aware route from local terrain grids
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct FindPathArgs {
    #[command(flatten)]
    pub route: RouteArgs,

    /// Elevation ESRI ASCII grid
    #[arg(long)]
    pub elevation: PathBuf,

    /// Static avalanche risk ESRI ASCII grid
    #[arg(long)]
    pub risk: PathBuf,

    /// Aspect ESRI ASCII grid (degrees clockwise from north)
    #[arg(long, requires = "forecasts")]
    pub aspect: Option<PathBuf>,

    /// Forecast bulletins JSON, applied when an aspect grid is given
    #[arg(long, requires = "aspect")]
    pub forecasts: Option<PathBuf>,

    /// Largest accepted mean extent in cells
    #[arg(long)]
    pub max_extent: Option<usize>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}

/// Ask an avroute server for a route
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct RequestPathArgs {
    /// Avroute server URL
    #[arg(long, default_value = "http://localhost:3000")]
    pub url: String,

    #[command(flatten)]
    pub route: RouteArgs,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}

/// Show the newest avalanche forecast a server holds for a location
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct ShowForecastsArgs {
    /// Avroute server URL
    #[arg(long, default_value = "http://localhost:3000")]
    pub url: String,

    /// Location name, matched partially and case-insensitively
    pub location: String,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}
