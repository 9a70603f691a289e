//! Forecast decoding and the dynamic risk adjustment.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::models::{Facing, ForecastRecord};
use crate::raster::SampleGrid;
use crate::sources::ForecastSource;

/// Length of an encoded compass rose: 4 digits for each of 8 directions.
pub const COMPASS_ROSE_DIGITS: usize = 32;

impl ForecastRecord {
    /// Hazard score for a height on this record's slope. Heights below the
    /// lower boundary or above the upper boundary carry no altitude hazard.
    pub fn severity_at(&self, height: f64) -> u8 {
        let lower = f64::from(self.lower_boundary_m);
        let middle = f64::from(self.middle_boundary_m);
        let upper = f64::from(self.upper_boundary_m);
        if height < lower || height > upper {
            0
        } else if height < middle {
            self.lower_primary.max(self.lower_secondary)
        } else {
            self.upper_primary.max(self.upper_secondary)
        }
    }
}

/// Severity for a cell from its aspect and height. `None` when the aspect
/// has no facing or no record covers the facing.
pub fn match_forecast(forecasts: &[ForecastRecord], aspect: f64, height: f64) -> Option<u8> {
    let facing = Facing::from_aspect(aspect)?;
    forecasts
        .iter()
        .find(|record| record.facing == facing)
        .map(|record| record.severity_at(height))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DynamicRiskReport {
    pub adjusted: usize,
    pub unmatched: usize,
}

/// Multiplies each cell's static risk by its forecast severity in place.
/// Unmatched cells get factor 0. All three grids must share a shape.
pub fn apply_dynamic_risk(
    risk: &mut SampleGrid,
    elevation: &SampleGrid,
    aspect: &SampleGrid,
    forecasts: &[ForecastRecord],
) -> DynamicRiskReport {
    let mut report = DynamicRiskReport::default();
    for y in 0..risk.rows() {
        for x in 0..risk.cols() {
            let factor = match match_forecast(forecasts, aspect.get(x, y), elevation.get(x, y)) {
                Some(severity) => {
                    report.adjusted += 1;
                    f64::from(severity)
                }
                None => {
                    report.unmatched += 1;
                    0.0
                }
            };
            risk.set(x, y, risk.get(x, y) * factor);
        }
    }
    if report.unmatched > 0 {
        warn!(
            unmatched = report.unmatched,
            adjusted = report.adjusted,
            "cells without a matching forecast treated as no risk"
        );
    } else {
        debug!(adjusted = report.adjusted, "dynamic risk applied");
    }
    report
}

/// Decodes an encoded compass rose into one record per direction, in
/// N, NE, E, SE, S, SW, W, NW order. Each 4-digit group is
/// `lower primary, upper primary, lower secondary, upper secondary`.
pub fn decode_compass_rose(
    date: NaiveDate,
    boundaries: (i32, i32, i32),
    digits: &str,
) -> Result<Vec<ForecastRecord>, SourceError> {
    if digits.len() != COMPASS_ROSE_DIGITS {
        return Err(SourceError::Parse(format!(
            "compass rose must have {COMPASS_ROSE_DIGITS} digits, got {}",
            digits.len()
        )));
    }
    let values = digits
        .chars()
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| SourceError::Parse(format!("non-digit {c:?} in compass rose")))
        })
        .collect::<Result<Vec<u8>, SourceError>>()?;

    let (lower, middle, upper) = boundaries;
    Ok(values
        .chunks_exact(4)
        .zip(Facing::ALL)
        .map(|(group, facing)| ForecastRecord {
            date,
            facing,
            lower_boundary_m: lower,
            middle_boundary_m: middle,
            upper_boundary_m: upper,
            lower_primary: group[0],
            lower_secondary: group[2],
            upper_primary: group[1],
            upper_secondary: group[3],
        })
        .collect())
}

/// One published forecast as it appears in an import file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastBulletin {
    pub location: String,
    #[serde(default)]
    pub url: Option<String>,
    pub date: NaiveDate,
    /// Lower, middle and upper altitude boundaries in metres.
    pub boundaries: [i32; 3],
    pub compass_rose: String,
}

impl ForecastBulletin {
    pub fn records(&self) -> Result<Vec<ForecastRecord>, SourceError> {
        let [lower, middle, upper] = self.boundaries;
        decode_compass_rose(self.date, (lower, middle, upper), &self.compass_rose)
    }
}

pub fn load_bulletins(path: impl AsRef<Path>) -> Result<Vec<ForecastBulletin>, SourceError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| SourceError::Parse(e.to_string()))
}

/// In-memory forecasts keyed by location name.
#[derive(Debug, Clone, Default)]
pub struct ForecastTable {
    by_location: HashMap<String, Vec<ForecastRecord>>,
}

impl ForecastTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, records: Vec<ForecastRecord>) {
        self.by_location.insert(location.into(), records);
    }

    /// Keeps only the newest bulletin per location.
    pub fn from_bulletins(bulletins: &[ForecastBulletin]) -> Result<Self, SourceError> {
        let mut newest: HashMap<&str, &ForecastBulletin> = HashMap::new();
        for bulletin in bulletins {
            let entry = newest.entry(bulletin.location.as_str()).or_insert(bulletin);
            if bulletin.date > entry.date {
                *entry = bulletin;
            }
        }
        let mut table = Self::new();
        for (location, bulletin) in newest {
            table.insert(location, bulletin.records()?);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}

impl ForecastSource for ForecastTable {
    fn forecasts_for_location(&self, location: &str) -> Option<Vec<ForecastRecord>> {
        self.by_location.get(location).cloned()
    }
}
