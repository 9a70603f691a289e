//! Scales edge costs and risk into [0, 1].

use tracing::debug;

use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub min_cost: f64,
    pub max_cost: f64,
    pub min_risk: f64,
    pub max_risk: f64,
    /// Floor applied to positive scaled risk, if any risk was positive.
    pub risk_floor: Option<f64>,
}

/// Nearest-rank percentile of an ascending slice.
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[index])
}

fn scale(value: f64, min: f64, span: f64) -> f64 {
    if span > 0.0 {
        (value - min) / span
    } else {
        0.0
    }
}

/// Rewrites every edge cost and cell risk in place. Positive scaled risks
/// below the `clip_percentile` of positive scaled risks are raised to it;
/// zero risk stays zero. A uniform positive risk scales to 1.
pub fn normalize(grid: &mut Grid, clip_percentile: f64) -> Normalization {
    let (min_cost, max_cost) = grid.cost_bounds();
    let cost_span = max_cost - min_cost;

    let (min_risk, max_risk) = grid
        .cells()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), cell| {
            (lo.min(cell.risk), hi.max(cell.risk))
        });
    let risk_span = max_risk - min_risk;

    for cell in grid.cells_mut() {
        for edge in cell.edges.iter_mut().flatten() {
            *edge = scale(*edge, min_cost, cost_span);
        }
        cell.risk = if risk_span > 0.0 {
            (cell.risk - min_risk) / risk_span
        } else if cell.risk > 0.0 {
            1.0
        } else {
            0.0
        };
    }

    let mut positive: Vec<f64> = grid
        .cells()
        .iter()
        .map(|cell| cell.risk)
        .filter(|risk| *risk > 0.0)
        .collect();
    positive.sort_by(|a, b| a.total_cmp(b));
    let risk_floor = percentile(&positive, clip_percentile);

    if let Some(floor) = risk_floor {
        let mut clipped = 0usize;
        for cell in grid.cells_mut() {
            if cell.risk > 0.0 && cell.risk < floor {
                cell.risk = floor;
                clipped += 1;
            }
        }
        debug!(floor, clipped, "clipped low positive risk");
    }

    Normalization {
        min_cost,
        max_cost,
        min_risk,
        max_risk,
        risk_floor,
    }
}
