//! Bounding-box lookup of forecast regions.

use serde::{Deserialize, Serialize};

use crate::models::Coord;
use crate::sources::LocationResolver;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    /// South-west corner.
    pub start: Coord,
    /// North-east corner.
    pub end: Coord,
}

impl Region {
    pub fn new(name: impl Into<String>, start: Coord, end: Coord) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Strict containment; points on the boundary are outside.
    pub fn contains(&self, coord: Coord) -> bool {
        coord.lon > self.start.lon
            && coord.lon < self.end.lon
            && coord.lat > self.start.lat
            && coord.lat < self.end.lat
    }
}

/// Resolves a coordinate to the first region, in insertion order, that
/// contains it. Several forecast regions overlap, so order matters.
#[derive(Debug, Clone, Default)]
pub struct RegionResolver {
    regions: Vec<Region>,
}

impl RegionResolver {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// The six Scottish avalanche forecast regions.
    pub fn scottish_regions() -> Self {
        let region = |name: &str, start: (f64, f64), end: (f64, f64)| {
            Region::new(name, Coord::new(start.0, start.1), Coord::new(end.0, end.1))
        };
        Self::new(vec![
            region(
                "Torridon",
                (-5.90874227918, 57.310592299),
                (-5.11817626423, 57.7821005754),
            ),
            region(
                "Creag Meagaidh",
                (-4.99675917528, 56.7327671068),
                (-4.20660165144, 57.1985659148),
            ),
            region(
                "Lochaber",
                (-5.39304342471, 56.5796588786),
                (-4.6110949438, 57.0479096187),
            ),
            region(
                "Glencoe",
                (-5.30671228924, 56.3790416259),
                (-4.52777017063, 56.8467419929),
            ),
            region(
                "Southern Cairngorms",
                (-3.78318124708, 56.6893284359),
                (-2.97874558556, 57.1474411178),
            ),
            region(
                "Northern Cairngorms",
                (-4.06469864678, 56.9024363754),
                (-3.25917673638, 57.3623462403),
            ),
        ])
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl LocationResolver for RegionResolver {
    fn location_for_coordinate(&self, coord: Coord) -> Option<String> {
        self.regions
            .iter()
            .find(|region| region.contains(coord))
            .map(|region| region.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_peaks() {
        let resolver = RegionResolver::scottish_regions();
        // Ben Macdui
        assert_eq!(
            resolver.location_for_coordinate(Coord::new(-3.669, 57.070)),
            Some("Southern Cairngorms".to_string())
        );
        // Liathach
        assert_eq!(
            resolver.location_for_coordinate(Coord::new(-5.48, 57.55)),
            Some("Torridon".to_string())
        );
    }

    #[test]
    fn overlapping_regions_resolve_in_order() {
        // Inside both Creag Meagaidh and Lochaber.
        let coord = Coord::new(-4.8, 56.9);
        let resolver = RegionResolver::scottish_regions();
        assert_eq!(
            resolver.location_for_coordinate(coord),
            Some("Creag Meagaidh".to_string())
        );
    }

    #[test]
    fn outside_every_region_is_none() {
        let resolver = RegionResolver::scottish_regions();
        assert_eq!(resolver.location_for_coordinate(Coord::new(-0.12, 51.5)), None);
    }

    #[test]
    fn boundary_is_exclusive() {
        let region = Region::new("box", Coord::new(0.0, 0.0), Coord::new(1.0, 1.0));
        assert!(region.contains(Coord::new(0.5, 0.5)));
        assert!(!region.contains(Coord::new(0.0, 0.5)));
        assert!(!region.contains(Coord::new(0.5, 1.0)));
    }
}
