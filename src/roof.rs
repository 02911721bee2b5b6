//! Buildings and roof segments as delivered by the building-data service.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{GeoPoint, Polygon};

/// Suitability classes run from 1 (best) to 5 (worst).
pub const SUITABILITY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Compass direction of a roof facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinal {
    /// North.
    North,
    /// North-east.
    NorthEast,
    /// East.
    East,
    /// South-east.
    SouthEast,
    /// South.
    South,
    /// South-west.
    SouthWest,
    /// West.
    West,
    /// North-west.
    NorthWest,
}

impl Cardinal {
    /// Maps a compass bearing (0° = north, clockwise) to the nearest direction.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // index is 0..8
    pub fn from_bearing(bearing_deg: f64) -> Self {
        const ORDER: [Cardinal; 8] = [
            Cardinal::North,
            Cardinal::NorthEast,
            Cardinal::East,
            Cardinal::SouthEast,
            Cardinal::South,
            Cardinal::SouthWest,
            Cardinal::West,
            Cardinal::NorthWest,
        ];
        let normalised = bearing_deg.rem_euclid(360.0);
        let index = ((normalised + 22.5) / 45.0).floor() as usize % 8;
        ORDER[index]
    }

    /// Short label (N, NE, E, ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One planar facet of a building roof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofSegment {
    /// Identifier from the building-data service.
    pub id: String,

    /// Outline in geographic coordinates.
    pub polygon: Polygon,

    /// Tilt from horizontal (degrees).
    pub tilt_deg: f64,

    /// Compass bearing the facet faces (degrees, 0 = north).
    pub azimuth_deg: f64,

    /// Facet area as reported by the service (m²).
    pub area_m2: f64,

    /// Solar suitability, 1 (best) to 5 (worst).
    pub suitability: u8,

    /// Precomputed annual yield if the whole facet were covered (kWh/yr).
    pub electricity_yield_kwh: f64,
}

impl RoofSegment {
    /// Returns the cardinal direction the facet faces.
    #[must_use]
    pub fn cardinal(&self) -> Cardinal {
        Cardinal::from_bearing(self.azimuth_deg)
    }

    /// Returns `true` if the suitability class is within 1..=5.
    #[must_use]
    pub fn has_valid_suitability(&self) -> bool {
        SUITABILITY_RANGE.contains(&self.suitability)
    }
}

/// A building with its roof facets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Map centre for the building.
    pub center: GeoPoint,

    /// Roof facets (at least one).
    pub roof_segments: Vec<RoofSegment>,
}

impl Building {
    /// Looks up a segment by id.
    #[must_use]
    pub fn segment(&self, id: &str) -> Option<&RoofSegment> {
        self.roof_segments.iter().find(|s| s.id == id)
    }

    /// Returns segments whose suitability class is at least as good as `worst`.
    pub fn suitable_segments(&self, worst: u8) -> impl Iterator<Item = &RoofSegment> {
        self.roof_segments
            .iter()
            .filter(move |s| s.has_valid_suitability() && s.suitability <= worst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_from_bearing() {
        assert_eq!(Cardinal::from_bearing(0.0), Cardinal::North);
        assert_eq!(Cardinal::from_bearing(359.0), Cardinal::North);
        assert_eq!(Cardinal::from_bearing(180.0), Cardinal::South);
        assert_eq!(Cardinal::from_bearing(200.0), Cardinal::South);
        assert_eq!(Cardinal::from_bearing(225.0), Cardinal::SouthWest);
        assert_eq!(Cardinal::from_bearing(-90.0), Cardinal::West);
    }

    #[test]
    fn cardinal_labels() {
        assert_eq!(Cardinal::SouthEast.to_string(), "SE");
        assert_eq!(Cardinal::North.label(), "N");
    }

    #[test]
    fn suitability_filter() {
        let seg = |id: &str, suitability| RoofSegment {
            id: id.to_string(),
            polygon: Polygon::default(),
            tilt_deg: 30.0,
            azimuth_deg: 180.0,
            area_m2: 40.0,
            suitability,
            electricity_yield_kwh: 6000.0,
        };
        let building = Building {
            center: GeoPoint::new(46.95, 7.44),
            roof_segments: vec![seg("a", 1), seg("b", 4), seg("c", 0)],
        };
        let ids: Vec<_> = building.suitable_segments(3).map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert!(building.segment("b").is_some());
        assert!(building.segment("z").is_none());
    }
}
