//! Per-cell terrain model with cached edge costs.

use crate::config::PlannerConfig;
use crate::error::{Layer, PathError, PathResult};
use crate::raster::SampleGrid;

/// Neighbour displacements, row by row from the north-west.
pub const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub height: f64,
    /// Adjusted risk until normalisation, scaled risk afterwards.
    pub risk: f64,
    /// Terrain cost to each in-bounds neighbour, in [`NEIGHBOR_OFFSETS`]
    /// order. Raw Naismith cost until normalisation, scaled afterwards.
    pub edges: [Option<f64>; 8],
}

/// The search graph for one request.
#[derive(Debug, Clone)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
    min_cost: f64,
    max_cost: f64,
}

/// Rejects layers that are empty, hold non-finite samples, or disagree
/// in shape with the elevation layer.
pub fn validate_layer(layer: Layer, grid: &SampleGrid, shape: (usize, usize)) -> PathResult<()> {
    if grid.shape() != shape {
        return Err(PathError::InvalidGrid {
            layer,
            reason: format!(
                "shape {}x{} does not match {}x{}",
                grid.cols(),
                grid.rows(),
                shape.1,
                shape.0
            ),
        });
    }
    if let Some((x, y)) = grid.first_non_finite() {
        return Err(PathError::InvalidGrid {
            layer,
            reason: format!("non-numeric sample at ({x}, {y})"),
        });
    }
    Ok(())
}

impl Grid {
    /// Builds cells and edges from same-shaped elevation and risk samples,
    /// tracking the terrain cost bounds as edges are computed.
    pub fn build(elevation: &SampleGrid, risk: &SampleGrid, config: &PlannerConfig) -> PathResult<Grid> {
        let shape = elevation.shape();
        validate_layer(Layer::Elevation, elevation, shape)?;
        validate_layer(Layer::Risk, risk, shape)?;

        let (rows, cols) = shape;
        let diagonal = config.diagonal_size_m();
        let mut min_cost = f64::INFINITY;
        let mut max_cost = f64::NEG_INFINITY;
        let mut cells = Vec::with_capacity(rows * cols);

        for y in 0..rows {
            for x in 0..cols {
                let height = elevation.get(x, y);
                let mut edges = [None; 8];
                for (slot, (ox, oy)) in NEIGHBOR_OFFSETS.iter().enumerate() {
                    let nx = x as i64 + ox;
                    let ny = y as i64 + oy;
                    if nx < 0 || ny < 0 || nx >= cols as i64 || ny >= rows as i64 {
                        continue;
                    }
                    let base = if ox.abs() + oy.abs() == 1 {
                        config.cell_size_m
                    } else {
                        diagonal
                    };
                    let climb = (elevation.get(nx as usize, ny as usize) - height).abs();
                    let cost = base + config.naismith_constant * climb;
                    min_cost = min_cost.min(cost);
                    max_cost = max_cost.max(cost);
                    edges[slot] = Some(cost);
                }
                cells.push(Cell {
                    height,
                    risk: risk.get(x, y),
                    edges,
                });
            }
        }

        if !min_cost.is_finite() {
            min_cost = 0.0;
            max_cost = 0.0;
        }

        Ok(Grid {
            cols,
            rows,
            cells,
            min_cost,
            max_cost,
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn x_max(&self) -> usize {
        self.cols - 1
    }

    pub fn y_max(&self) -> usize {
        self.rows - 1
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.cols + x
    }

    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.cols, index / self.cols)
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Minimum and maximum raw terrain cost over every edge.
    pub fn cost_bounds(&self) -> (f64, f64) {
        (self.min_cost, self.max_cost)
    }

    pub fn has_positive_risk(&self) -> bool {
        self.cells.iter().any(|cell| cell.risk > 0.0)
    }

    /// In-bounds neighbours of a cell with their edge cost.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (x, y) = self.position(index);
        let cols = self.cols;
        self.cells[index]
            .edges
            .iter()
            .zip(NEIGHBOR_OFFSETS)
            .filter_map(move |(edge, (ox, oy))| {
                edge.map(|cost| {
                    let nx = (x as i64 + ox) as usize;
                    let ny = (y as i64 + oy) as usize;
                    (ny * cols + nx, cost)
                })
            })
    }
}
