//! Tunable engine constants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Seconds-per-metre style penalty applied to absolute height change.
    pub naismith_constant: f64,
    /// Ground length of one orthogonal step, in metres.
    pub cell_size_m: f64,
    /// Reject requests whose mean raw extent (cells) exceeds this.
    pub max_mean_extent: usize,
    /// Reject requests whose smaller raw extent (cells) is below this.
    pub min_extent: usize,
    /// Downsample each axis until it is at most this many cells.
    pub target_extent: usize,
    /// Positive risks below this percentile of positive risks are raised to it.
    pub risk_clip_percentile: f64,
    /// Time budgets must be strictly greater than this many seconds.
    pub min_time_budget_s: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            naismith_constant: 7.92,
            cell_size_m: 5.0,
            max_mean_extent: 4000,
            min_extent: 2,
            target_extent: 400,
            risk_clip_percentile: 5.0,
            min_time_budget_s: 1.0,
        }
    }
}

impl PlannerConfig {
    /// Ground length of one diagonal step, in metres.
    pub fn diagonal_size_m(&self) -> f64 {
        self.cell_size_m * std::f64::consts::SQRT_2
    }
}
