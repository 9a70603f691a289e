//! Turning search results into geodetic waypoints.

use crate::downsample::Reduction;
use crate::error::{PathError, PathResult};
use crate::grid::Grid;
use crate::models::{Coord, Waypoint};
use crate::sources::RasterSource;

/// Follows predecessor links from `goal` back to `start` and returns the
/// cells in start-to-goal order.
pub fn backtrace(came_from: &[Option<usize>], start: usize, goal: usize) -> Vec<usize> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from[current] {
            Some(prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Straight-line route used when nothing on the grid carries risk:
/// diagonal steps until one axis is aligned with the goal, then straight.
pub fn direct_path(start: (usize, usize), goal: (usize, usize)) -> Vec<(usize, usize)> {
    let step = |from: usize, to: usize| -> i64 {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        }
    };
    let sx = step(start.0, goal.0);
    let sy = step(start.1, goal.1);
    let (mut x, mut y) = (start.0 as i64, start.1 as i64);
    let (gx, gy) = (goal.0 as i64, goal.1 as i64);

    let mut path = vec![start];
    while (x, y) != (gx, gy) {
        if x != gx {
            x += sx;
        }
        if y != gy {
            y += sy;
        }
        path.push((x as usize, y as usize));
    }
    path
}

/// Maps grid cells back to coordinates at the source's native resolution,
/// paired with the height the search saw for that cell.
pub fn to_waypoints(
    cells: &[(usize, usize)],
    grid: &Grid,
    reduction: Reduction,
    origin: Coord,
    source: &dyn RasterSource,
) -> PathResult<Vec<Waypoint>> {
    cells
        .iter()
        .map(|&(x, y)| {
            let coord = source
                .displacement_to_coordinate(origin, x * reduction.factor_x, y * reduction.factor_y)
                .map_err(|source| PathError::Waypoint { x, y, source })?;
            Ok(Waypoint {
                lon: coord.lon,
                lat: coord.lat,
                height_m: grid.cell(grid.index(x, y)).height,
            })
        })
        .collect()
}
