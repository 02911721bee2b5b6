//! Roof geometry: coordinate systems, polygon metrics and restricted areas.
//!
//! Every function in this module is pure. Inputs are passed explicitly and
//! nothing reaches into session state, so the same implementation backs the
//! layout engine, the wizard and the MCP tools.
//!
//! # Coordinate Conventions
//!
//! - [`GeoPoint`] is WGS84 latitude/longitude in degrees.
//! - [`Lv95`] is the Swiss projected grid (easting/northing in metres).
//! - [`PlanarPoint`] is a local east/north frame in metres, built around an
//!   origin by [`transform::LocalFrame`].
//!
//! # Modules
//!
//! - [`transform`] - LV95 ↔ WGS84 and metres-per-degree scale factors
//! - [`metrics`] - Area, perimeter, centroid, containment, self-intersection
//! - [`restricted`] - User-drawn "no panel" zones

pub mod metrics;
pub mod restricted;
pub mod transform;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use metrics::{
    area, centroid, contains_point, distance, perimeter, planar_area, self_intersects,
    validate_for_save,
};
pub use restricted::{is_excluded, overlaps_non_selected_segments, RestrictedArea};
pub use transform::{lv95_to_wgs84, meters_per_degree, wgs84_to_lv95, LocalFrame};

/// Mean Earth radius used for Haversine distances (metres).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default tolerance for comparing geographic points (degrees, ~1 cm).
pub const POINT_TOLERANCE_DEG: f64 = 1e-7;

/// A WGS84 geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (north positive).
    pub lat: f64,
    /// Longitude in degrees (east positive).
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new geographic point.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both coordinates differ by at most `tolerance` degrees.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() <= tolerance && (self.lng - other.lng).abs() <= tolerance
    }

    /// Returns `true` if both coordinates are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A point in a local planar frame, in metres east (`x`) and north (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanarPoint {
    /// Metres east of the frame origin.
    pub x: f64,
    /// Metres north of the frame origin.
    pub y: f64,
}

impl PlanarPoint {
    /// Creates a new planar point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotates the point counter-clockwise about the origin.
    #[must_use]
    pub fn rotated(self, cos: f64, sin: f64) -> Self {
        Self {
            x: self.x.mul_add(cos, -(self.y * sin)),
            y: self.x.mul_add(sin, self.y * cos),
        }
    }

    /// Euclidean length of the vector from the origin.
    #[must_use]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// A Swiss LV95 projected coordinate in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Lv95 {
    /// Easting (E), around 2 600 000 at Bern.
    pub easting: f64,
    /// Northing (N), around 1 200 000 at Bern.
    pub northing: f64,
}

impl Lv95 {
    /// Creates a new LV95 coordinate.
    #[must_use]
    pub const fn new(easting: f64, northing: f64) -> Self {
        Self { easting, northing }
    }
}

/// A closed ring of geographic points.
///
/// The first and last points are implicitly connected; callers should not
/// repeat the first point at the end. A ring with fewer than three points is
/// representable (it is what a drawing in progress looks like) but has zero
/// area and contains nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<GeoPoint>,
}

impl Polygon {
    /// Creates a polygon from its vertices.
    ///
    /// A trailing vertex equal to the first one (an explicitly closed ring)
    /// is dropped.
    #[must_use]
    pub fn new(mut points: Vec<GeoPoint>) -> Self {
        if points.len() > 1 {
            let first = points[0];
            if points
                .last()
                .is_some_and(|last| last.approx_eq(&first, POINT_TOLERANCE_DEG))
            {
                points.pop();
            }
        }
        Self { points }
    }

    /// Creates a polygon from LV95 vertices.
    #[must_use]
    pub fn from_lv95(points: &[Lv95]) -> Self {
        Self::new(
            points
                .iter()
                .map(|p| lv95_to_wgs84(p.easting, p.northing))
                .collect(),
        )
    }

    /// Returns the vertices.
    #[must_use]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Returns the number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over the edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Returns the (min, max) corners of the bounding box, or `None` if empty.
    #[must_use]
    pub fn bounds(&self) -> Option<(GeoPoint, GeoPoint)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(min, max), p| {
            (
                GeoPoint::new(min.lat.min(p.lat), min.lng.min(p.lng)),
                GeoPoint::new(max.lat.max(p.lat), max.lng.max(p.lng)),
            )
        }))
    }

    /// Returns a copy scaled by `factor` about the vertex centroid.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let c = centroid(self);
        Self {
            points: self
                .points
                .iter()
                .map(|p| {
                    GeoPoint::new(
                        (p.lat - c.lat).mul_add(factor, c.lat),
                        (p.lng - c.lng).mul_add(factor, c.lng),
                    )
                })
                .collect(),
        }
    }
}

impl From<Vec<GeoPoint>> for Polygon {
    fn from(points: Vec<GeoPoint>) -> Self {
        Self::new(points)
    }
}

/// Errors raised when geometry input is invalid rather than merely degenerate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Not enough vertices to form a polygon.
    #[error("polygon needs at least 3 points, got {count}")]
    TooFewPoints {
        /// Number of vertices supplied.
        count: usize,
    },

    /// Polygon edges cross each other.
    #[error("polygon edges intersect each other")]
    SelfIntersecting,

    /// Polygon encloses no area (collinear or repeated vertices).
    #[error("polygon has zero area")]
    ZeroArea,

    /// A coordinate is NaN or infinite.
    #[error("coordinate is not a finite number")]
    NonFiniteCoordinate,

    /// Panel footprint dimensions are not usable.
    #[error("invalid panel footprint: {message}")]
    InvalidFootprint {
        /// Description of what's wrong.
        message: String,
    },
}

impl GeometryError {
    /// Creates an invalid footprint error.
    pub fn invalid_footprint(message: impl Into<String>) -> Self {
        Self::InvalidFootprint {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_ring_drops_duplicate_vertex() {
        let p = Polygon::new(vec![
            GeoPoint::new(47.0, 8.0),
            GeoPoint::new(47.0, 8.001),
            GeoPoint::new(47.001, 8.001),
            GeoPoint::new(47.0, 8.0),
        ]);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn edges_include_closing_edge() {
        let p = Polygon::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
        ]);
        let edges: Vec<_> = p.edges().collect();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2], (GeoPoint::new(1.0, 1.0), GeoPoint::new(0.0, 0.0)));
    }

    #[test]
    fn bounds_of_empty_polygon() {
        assert!(Polygon::default().bounds().is_none());
    }

    #[test]
    fn planar_rotation_quarter_turn() {
        let p = PlanarPoint::new(1.0, 0.0).rotated(0.0, 1.0);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn footprint_error_display() {
        let err = GeometryError::invalid_footprint("width must be positive");
        assert_eq!(
            err.to_string(),
            "invalid panel footprint: width must be positive"
        );
    }
}
