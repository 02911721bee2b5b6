//! Coordinate system conversions.
//!
//! The LV95 ↔ WGS84 conversions use the approximate polynomials published by
//! swisstopo. They are accurate to about a metre inside Switzerland and must
//! not be applied elsewhere.
//!
//! Planar maths uses a local east/north frame whose scale factors come from
//! the WGS84-ellipsoid series in [`meters_per_degree`]. This is the only
//! convention used for area and distance conversion in the crate.

use crate::geometry::{GeoPoint, Lv95, PlanarPoint};

/// Converts an LV95 coordinate to WGS84.
///
/// Returns a [`GeoPoint`] (latitude, longitude in degrees).
#[must_use]
pub fn lv95_to_wgs84(easting: f64, northing: f64) -> GeoPoint {
    // Auxiliary values relative to Bern, in 1000 km
    let y = (easting - 2_600_000.0) / 1_000_000.0;
    let x = (northing - 1_200_000.0) / 1_000_000.0;

    // Results in 10000" units
    let lng = 0.0436f64.mul_add(
        -y.powi(3),
        0.1306f64.mul_add(
            y * x * x,
            0.791_484f64.mul_add(y * x, 4.728_982f64.mul_add(y, 2.677_909_4)),
        ),
    );
    let lat = 0.0140f64.mul_add(
        -x.powi(3),
        0.0447f64.mul_add(
            -(y * y * x),
            0.002_528f64.mul_add(
                -(x * x),
                0.270_978f64.mul_add(-(y * y), 3.238_272f64.mul_add(x, 16.902_389_2)),
            ),
        ),
    );

    GeoPoint::new(lat * 100.0 / 36.0, lng * 100.0 / 36.0)
}

/// Converts a WGS84 coordinate to LV95.
#[must_use]
pub fn wgs84_to_lv95(point: GeoPoint) -> Lv95 {
    // Auxiliary values in 10000" relative to Bern
    let phi = point.lat.mul_add(3600.0, -169_028.66) / 10_000.0;
    let lambda = point.lng.mul_add(3600.0, -26_782.5) / 10_000.0;

    let easting = 44.54f64.mul_add(
        -lambda.powi(3),
        0.36f64.mul_add(
            -(lambda * phi * phi),
            10_938.51f64.mul_add(
                -(lambda * phi),
                211_455.93f64.mul_add(lambda, 2_600_072.37),
            ),
        ),
    );
    let northing = 119.79f64.mul_add(
        phi.powi(3),
        194.56f64.mul_add(
            -(lambda * lambda * phi),
            76.63f64.mul_add(
                phi * phi,
                3745.25f64.mul_add(lambda * lambda, 308_807.95f64.mul_add(phi, 1_200_147.07)),
            ),
        ),
    );

    Lv95::new(easting, northing)
}

/// Returns `(metres per degree latitude, metres per degree longitude)` at
/// the given latitude on the WGS84 ellipsoid.
#[must_use]
pub fn meters_per_degree(lat: f64) -> (f64, f64) {
    let phi = lat.to_radians();
    let per_lat = 0.0023f64.mul_add(
        -(6.0 * phi).cos(),
        1.175f64.mul_add((4.0 * phi).cos(), 559.82f64.mul_add(-(2.0 * phi).cos(), 111_132.92)),
    );
    let per_lng = 0.118f64.mul_add(
        (5.0 * phi).cos(),
        93.5f64.mul_add(-(3.0 * phi).cos(), 111_412.84 * phi.cos()),
    );
    (per_lat, per_lng)
}

/// Spherical flat-earth scale factors (`111320 · cos φ` for longitude).
///
/// Kept for comparison only; use [`meters_per_degree`] for real work.
#[must_use]
pub fn spherical_meters_per_degree(lat: f64) -> (f64, f64) {
    (111_320.0, 111_320.0 * lat.to_radians().cos())
}

/// A local tangent-plane frame centred on a geographic origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: GeoPoint,
    per_deg_lat: f64,
    per_deg_lng: f64,
}

impl LocalFrame {
    /// Creates a frame centred on `origin` using ellipsoid scale factors.
    #[must_use]
    pub fn new(origin: GeoPoint) -> Self {
        let (per_deg_lat, per_deg_lng) = meters_per_degree(origin.lat);
        Self {
            origin,
            per_deg_lat,
            per_deg_lng,
        }
    }

    /// Returns the frame origin.
    #[must_use]
    pub const fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Returns `(metres per degree latitude, metres per degree longitude)`.
    #[must_use]
    pub const fn scale(&self) -> (f64, f64) {
        (self.per_deg_lat, self.per_deg_lng)
    }

    /// Projects a geographic point into the frame.
    #[must_use]
    pub fn to_local(&self, point: GeoPoint) -> PlanarPoint {
        PlanarPoint::new(
            (point.lng - self.origin.lng) * self.per_deg_lng,
            (point.lat - self.origin.lat) * self.per_deg_lat,
        )
    }

    /// Converts a frame point back to geographic coordinates.
    #[must_use]
    pub fn to_geo(&self, point: PlanarPoint) -> GeoPoint {
        GeoPoint::new(
            self.origin.lat + point.y / self.per_deg_lat,
            self.origin.lng + point.x / self.per_deg_lng,
        )
    }
}
