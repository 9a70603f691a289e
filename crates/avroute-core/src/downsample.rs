//! Size policy and block reduction of raw sample grids.

use crate::config::PlannerConfig;
use crate::error::{PathError, PathResult};
use crate::raster::SampleGrid;

/// How a block of raw samples collapses into one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    /// Arithmetic mean. Also used for aspect, where it does not wrap at north.
    Mean,
    /// Keeps the worst sample so a hazard is never averaged away.
    Max,
}

/// Block factors chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reduction {
    pub factor_x: usize,
    pub factor_y: usize,
}

impl Reduction {
    pub const NONE: Reduction = Reduction {
        factor_x: 1,
        factor_y: 1,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::NONE
    }
}

pub fn block_factor(extent: usize, target: usize) -> usize {
    if extent > target {
        extent.div_ceil(target.max(1))
    } else {
        1
    }
}

/// Applies the size policy to a raw `(rows, cols)` window: rejects areas
/// that are too large or degenerate, then picks per-axis block factors.
pub fn plan_reduction(rows: usize, cols: usize, config: &PlannerConfig) -> PathResult<Reduction> {
    let mean_extent = (rows + cols) as f64 / 2.0;
    if mean_extent > config.max_mean_extent as f64 {
        return Err(PathError::AreaTooLarge {
            rows,
            cols,
            limit: config.max_mean_extent,
        });
    }
    if rows.min(cols) < config.min_extent {
        return Err(PathError::AreaTooSmall {
            rows,
            cols,
            limit: config.min_extent,
        });
    }
    Ok(Reduction {
        factor_x: block_factor(cols, config.target_extent),
        factor_y: block_factor(rows, config.target_extent),
    })
}

/// Collapses `factor_x` by `factor_y` blocks. Edge blocks that fall short
/// reduce over the samples they have.
pub fn downsample(grid: &SampleGrid, reduction: Reduction, reduce: Reduce) -> SampleGrid {
    if reduction.is_identity() {
        return grid.clone();
    }
    let Reduction { factor_x, factor_y } = reduction;
    let cols = grid.cols().div_ceil(factor_x);
    let rows = grid.rows().div_ceil(factor_y);
    let mut out = SampleGrid::filled(rows, cols, 0.0);

    for by in 0..rows {
        let y_end = ((by + 1) * factor_y).min(grid.rows());
        for bx in 0..cols {
            let x_end = ((bx + 1) * factor_x).min(grid.cols());
            let mut sum = 0.0;
            let mut max = f64::NEG_INFINITY;
            let mut count = 0usize;
            for y in by * factor_y..y_end {
                for x in bx * factor_x..x_end {
                    let v = grid.get(x, y);
                    sum += v;
                    max = max.max(v);
                    count += 1;
                }
            }
            let value = match reduce {
                Reduce::Mean => sum / count as f64,
                Reduce::Max => max,
            };
            out.set(bx, by, value);
        }
    }
    out
}
