//! Sample grids and an in-memory raster source.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::models::Coord;
use crate::sources::RasterSource;

/// Per-axis window limit applied by [`MemoryRaster`] unless overridden.
pub const DEFAULT_MAX_BLOCK_CELLS: usize = 9999;

/// A rectangular block of samples stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl SampleGrid {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, String> {
        if rows == 0 || cols == 0 {
            return Err(format!("empty grid ({cols}x{rows})"));
        }
        if values.len() != rows * cols {
            return Err(format!(
                "expected {} samples for {cols}x{rows}, got {}",
                rows * cols,
                values.len()
            ));
        }
        Ok(Self { rows, cols, values })
    }

    /// Builds a grid from nested rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, String> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(format!("row {index} has {} samples, expected {cols}", row.len()));
        }
        let height = rows.len();
        Self::new(height, cols, rows.into_iter().flatten().collect())
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            values: vec![value; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.cols + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.values[y * self.cols + x] = value;
    }

    /// Position of the first non-finite sample, if any.
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.values
            .iter()
            .position(|v| !v.is_finite())
            .map(|i| (i % self.cols, i / self.cols))
    }

    fn window(&self, x0: usize, y0: usize, cols: usize, rows: usize) -> SampleGrid {
        let mut values = Vec::with_capacity(rows * cols);
        for y in y0..y0 + rows {
            let start = y * self.cols + x0;
            values.extend_from_slice(&self.values[start..start + cols]);
        }
        SampleGrid { rows, cols, values }
    }
}

/// North-up affine transform: origin is the top-left corner, pixel height
/// is negative so rows advance southwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Nearest pixel index for a coordinate. May be negative or past the
    /// raster edge; callers check coverage first.
    pub fn coordinate_to_index(&self, coord: Coord) -> (i64, i64) {
        let x = ((coord.lon - self.origin_lon) / self.pixel_width).round() as i64;
        let y = ((coord.lat - self.origin_lat) / self.pixel_height).round() as i64;
        (x, y)
    }

    pub fn index_to_coordinate(&self, x: usize, y: usize) -> Coord {
        Coord::new(
            self.origin_lon + x as f64 * self.pixel_width,
            self.origin_lat + y as f64 * self.pixel_height,
        )
    }
}

/// A raster fully held in memory.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    transform: GeoTransform,
    grid: SampleGrid,
    max_block_cells: usize,
}

impl MemoryRaster {
    pub fn new(transform: GeoTransform, grid: SampleGrid) -> Self {
        Self {
            transform,
            grid,
            max_block_cells: DEFAULT_MAX_BLOCK_CELLS,
        }
    }

    pub fn with_max_block_cells(mut self, max_block_cells: usize) -> Self {
        self.max_block_cells = max_block_cells;
        self
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    /// Origins of the top-left and bottom-right pixels.
    pub fn extent(&self) -> (Coord, Coord) {
        (
            self.transform.index_to_coordinate(0, 0),
            self.transform
                .index_to_coordinate(self.grid.cols() - 1, self.grid.rows() - 1),
        )
    }

    fn covers(&self, coord: Coord) -> bool {
        let t = &self.transform;
        let east = t.origin_lon + self.grid.cols() as f64 * t.pixel_width;
        let south = t.origin_lat + self.grid.rows() as f64 * t.pixel_height;
        coord.lon >= t.origin_lon && coord.lon <= east && coord.lat <= t.origin_lat && coord.lat >= south
    }

    fn clamp_index(&self, coord: Coord) -> (usize, usize) {
        let (x, y) = self.transform.coordinate_to_index(coord);
        let x = x.clamp(0, self.grid.cols() as i64 - 1) as usize;
        let y = y.clamp(0, self.grid.rows() as i64 - 1) as usize;
        (x, y)
    }

    /// Pixel window `(x0, y0, cols, rows)` for two corners in any order.
    fn window(&self, a: Coord, b: Coord) -> Result<(usize, usize, usize, usize), SourceError> {
        if !self.covers(a) || !self.covers(b) {
            return Err(SourceError::OutOfCoverage);
        }
        let top_left = Coord::new(a.lon.min(b.lon), a.lat.max(b.lat));
        let bottom_right = Coord::new(a.lon.max(b.lon), a.lat.min(b.lat));
        let (x0, y0) = self.clamp_index(top_left);
        let (x1, y1) = self.clamp_index(bottom_right);
        Ok((x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }
}

impl RasterSource for MemoryRaster {
    fn block_shape(&self, top_left: Coord, bottom_right: Coord) -> Result<(usize, usize), SourceError> {
        let (_, _, cols, rows) = self.window(top_left, bottom_right)?;
        Ok((rows, cols))
    }

    fn read_block(&self, top_left: Coord, bottom_right: Coord) -> Result<SampleGrid, SourceError> {
        let (x0, y0, cols, rows) = self.window(top_left, bottom_right)?;
        if cols > self.max_block_cells || rows > self.max_block_cells {
            return Err(SourceError::TooLarge {
                rows,
                cols,
                max: self.max_block_cells,
            });
        }
        Ok(self.grid.window(x0, y0, cols, rows))
    }

    fn displacement_to_coordinate(&self, origin: Coord, dx: usize, dy: usize) -> Result<Coord, SourceError> {
        if dx >= self.grid.cols() || dy >= self.grid.rows() {
            return Err(SourceError::OutOfCoverage);
        }
        Ok(Coord::new(
            origin.lon + dx as f64 * self.transform.pixel_width,
            origin.lat + dy as f64 * self.transform.pixel_height,
        ))
    }
}

/// Reads an ESRI ASCII grid file into memory.
pub fn load_ascii_grid(path: impl AsRef<Path>) -> Result<MemoryRaster, SourceError> {
    let text = std::fs::read_to_string(path)?;
    parse_ascii_grid(&text)
}

/// Parses ESRI ASCII grid text. Rows run north to south; `NODATA_value`
/// cells become NaN.
pub fn parse_ascii_grid(text: &str) -> Result<MemoryRaster, SourceError> {
    let mut ncols = None;
    let mut nrows = None;
    let mut x_ll = None;
    let mut y_ll = None;
    let mut centred = false;
    let mut cellsize = None;
    let mut nodata = None;

    let mut tokens = text.split_whitespace().peekable();
    while let Some(key) = tokens.peek() {
        if key.parse::<f64>().is_ok() {
            break;
        }
        let key = key.to_ascii_lowercase();
        tokens.next();
        let value = tokens
            .next()
            .ok_or_else(|| SourceError::Parse(format!("missing value for header {key}")))?;
        let number = value
            .parse::<f64>()
            .map_err(|_| SourceError::Parse(format!("bad value {value:?} for header {key}")))?;
        match key.as_str() {
            "ncols" => ncols = Some(number as usize),
            "nrows" => nrows = Some(number as usize),
            "xllcorner" => x_ll = Some(number),
            "yllcorner" => y_ll = Some(number),
            "xllcenter" => {
                x_ll = Some(number);
                centred = true;
            }
            "yllcenter" => {
                y_ll = Some(number);
                centred = true;
            }
            "cellsize" => cellsize = Some(number),
            "nodata_value" => nodata = Some(number),
            other => return Err(SourceError::Parse(format!("unknown header {other}"))),
        }
    }

    let missing = |name: &str| SourceError::Parse(format!("missing header {name}"));
    let ncols = ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = nrows.ok_or_else(|| missing("nrows"))?;
    let mut x_ll = x_ll.ok_or_else(|| missing("xllcorner"))?;
    let mut y_ll = y_ll.ok_or_else(|| missing("yllcorner"))?;
    let cellsize = cellsize.ok_or_else(|| missing("cellsize"))?;
    if cellsize <= 0.0 {
        return Err(SourceError::Parse(format!("cellsize must be positive, got {cellsize}")));
    }
    if centred {
        x_ll -= cellsize / 2.0;
        y_ll -= cellsize / 2.0;
    }

    let values = tokens
        .map(|token| {
            let value = token
                .parse::<f64>()
                .map_err(|_| SourceError::Parse(format!("bad sample {token:?}")))?;
            Ok(match nodata {
                Some(nodata) if value == nodata => f64::NAN,
                _ => value,
            })
        })
        .collect::<Result<Vec<f64>, SourceError>>()?;

    let grid = SampleGrid::new(nrows, ncols, values).map_err(SourceError::Parse)?;
    let transform = GeoTransform {
        origin_lon: x_ll,
        origin_lat: y_ll + nrows as f64 * cellsize,
        pixel_width: cellsize,
        pixel_height: -cellsize,
    };
    Ok(MemoryRaster::new(transform, grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster() -> MemoryRaster {
        let values = (0..20).map(|v| v as f64).collect();
        let grid = SampleGrid::new(4, 5, values).unwrap();
        MemoryRaster::new(
            GeoTransform {
                origin_lon: -5.0,
                origin_lat: 57.0,
                pixel_width: 0.1,
                pixel_height: -0.1,
            },
            grid,
        )
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = SampleGrid::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.contains("row 1"));
        assert!(SampleGrid::from_rows(vec![]).is_err());
    }

    #[test]
    fn read_block_orders_corners() {
        let raster = raster();
        let a = Coord::new(-4.7, 56.8);
        let b = Coord::new(-4.9, 56.9);
        let block = raster.read_block(a, b).unwrap();
        assert_eq!(block.shape(), (2, 3));
        assert_eq!(block.get(0, 0), 6.0);
        assert_eq!(block.get(2, 1), 13.0);
        assert_eq!(raster.block_shape(b, a).unwrap(), (2, 3));
    }

    #[test]
    fn read_block_outside_coverage_fails() {
        let raster = raster();
        let err = raster
            .read_block(Coord::new(-5.5, 57.0), Coord::new(-4.8, 56.8))
            .unwrap_err();
        assert!(matches!(err, SourceError::OutOfCoverage));
    }

    #[test]
    fn read_block_respects_cell_limit() {
        let raster = raster().with_max_block_cells(2);
        let (a, b) = (Coord::new(-5.0, 57.0), Coord::new(-4.6, 56.7));
        // The shape is geometry only; the limit applies to reads.
        assert_eq!(raster.block_shape(a, b).unwrap(), (4, 5));
        let err = raster.read_block(a, b).unwrap_err();
        assert!(matches!(err, SourceError::TooLarge { cols: 5, rows: 4, max: 2 }));
    }

    #[test]
    fn displacement_moves_east_and_south() {
        let raster = raster();
        let coord = raster
            .displacement_to_coordinate(Coord::new(-5.0, 57.0), 2, 3)
            .unwrap();
        assert!((coord.lon + 4.8).abs() < 1e-9);
        assert!((coord.lat - 56.7).abs() < 1e-9);
        assert!(raster
            .displacement_to_coordinate(Coord::new(-5.0, 57.0), 5, 0)
            .is_err());
    }

    #[test]
    fn parses_ascii_grid_with_nodata() {
        let text = "ncols 3\nnrows 2\nxllcorner -5.0\nyllcorner 56.0\ncellsize 0.5\nNODATA_value -9999\n1 2 3\n4 -9999 6\n";
        let raster = parse_ascii_grid(text).unwrap();
        assert_eq!(raster.grid().shape(), (2, 3));
        assert_eq!(raster.transform().origin_lat, 57.0);
        assert_eq!(raster.grid().get(2, 0), 3.0);
        assert!(raster.grid().get(1, 1).is_nan());
        assert_eq!(raster.grid().first_non_finite(), Some((1, 1)));
    }

    #[test]
    fn ascii_grid_sample_count_must_match_header() {
        let text = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        assert!(matches!(parse_ascii_grid(text), Err(SourceError::Parse(_))));
    }
}
