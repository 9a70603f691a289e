//! A* over a normalised [`Grid`].

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::config::PlannerConfig;
use crate::error::{PathError, PathResult};
use crate::grid::Grid;

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Frontier entry. Orders by `f`, then `g`, then row-major cell index, so
/// equal-priority pops are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f_score: FloatOrd,
    g_score: FloatOrd,
    index: usize,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Everything a search needs beyond the grid.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub start: (usize, usize),
    pub goal: (usize, usize),
    pub risk_weight: f64,
    pub time_budget: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Predecessor of each reached cell, by row-major index.
    pub came_from: Vec<Option<usize>>,
    pub start: usize,
    pub goal: usize,
    pub cost: f64,
    pub expanded: usize,
}

/// Remaining-cost estimate from a cell to the goal, in normalised units.
///
/// Every step of a path is at least as long as an orthogonal step, so an
/// edge scales to at least `naismith * |climb| / span` when the cheapest
/// edge on the grid is a flat orthogonal one. Summed over any path that
/// is at least the Naismith term for the net height change, which makes
/// the estimate a lower bound on the remaining normalised terrain cost
/// and consistent across edges. When the cheapest edge already climbs,
/// small climbs normalise to zero and no positive bound holds, so the
/// estimate is zero. The result is scaled by `1 - risk_weight`, the
/// terrain share of each weighted edge, so the search stays optimal for
/// every weight.
pub fn heuristic(grid: &Grid, index: usize, goal: usize, risk_weight: f64, config: &PlannerConfig) -> f64 {
    let (min_cost, max_cost) = grid.cost_bounds();
    let span = max_cost - min_cost;
    if span <= 0.0 || risk_weight >= 1.0 || min_cost > config.cell_size_m {
        return 0.0;
    }

    let climb = (grid.cell(index).height - grid.cell(goal).height).abs();
    config.naismith_constant * climb / span * (1.0 - risk_weight)
}

/// Runs A* from `params.start` to `params.goal`. Elapsed time is checked
/// after each relaxation pass; running past the budget abandons the search.
pub fn search(grid: &Grid, params: &SearchParams, config: &PlannerConfig) -> PathResult<SearchOutcome> {
    let started = Instant::now();
    let start = grid.index(params.start.0, params.start.1);
    let goal = grid.index(params.goal.0, params.goal.1);
    let weight = params.risk_weight;

    let mut g_score = vec![f64::INFINITY; grid.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
    let mut closed = vec![false; grid.len()];
    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();

    g_score[start] = 0.0;
    open_set.push(Reverse(OpenNode {
        f_score: FloatOrd(heuristic(grid, start, goal, weight, config)),
        g_score: FloatOrd(0.0),
        index: start,
    }));

    let mut expanded = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        let index = current.index;
        if closed[index] || current.g_score.0 > g_score[index] {
            continue;
        }
        expanded += 1;

        if index == goal {
            debug!(
                expanded,
                cost = g_score[goal],
                elapsed_ms = started.elapsed().as_millis() as u64,
                "search reached goal"
            );
            return Ok(SearchOutcome {
                came_from,
                start,
                goal,
                cost: g_score[goal],
                expanded,
            });
        }
        closed[index] = true;

        for (next, terrain) in grid.neighbors(index) {
            if closed[next] {
                continue;
            }
            let edge_cost = terrain * (1.0 - weight) + grid.cell(next).risk * weight;
            let tentative = g_score[index] + edge_cost;
            if tentative < g_score[next] {
                g_score[next] = tentative;
                came_from[next] = Some(index);
                let h = heuristic(grid, next, goal, weight, config);
                trace!(from = index, to = next, g = tentative, h, "relaxed");
                open_set.push(Reverse(OpenNode {
                    f_score: FloatOrd(tentative + h),
                    g_score: FloatOrd(tentative),
                    index: next,
                }));
            }
        }

        let elapsed = started.elapsed();
        if elapsed > params.time_budget {
            warn!(
                expanded,
                elapsed_ms = elapsed.as_millis() as u64,
                "search deadline exceeded"
            );
            return Err(PathError::DeadlineExceeded {
                elapsed_ms: elapsed.as_millis(),
                expanded,
            });
        }
    }

    warn!(expanded, "search frontier exhausted before reaching goal");
    Err(PathError::Exhausted { expanded })
}
