//! Polygon metrics over geographic rings.
//!
//! Area is computed geodesically on the WGS84 ellipsoid; [`planar_area`]
//! gives the shoelace area in the local frame for comparison and for
//! rotated-frame checks. Distances use the Haversine formula with
//! [`EARTH_RADIUS_M`].

use geo::GeodesicArea;

use crate::geometry::transform::LocalFrame;
use crate::geometry::{GeoPoint, GeometryError, PlanarPoint, Polygon, EARTH_RADIUS_M};

/// Smallest area (m²) a polygon must enclose to be saved.
pub const MIN_SAVE_AREA_M2: f64 = 0.01;

/// Geodesic area of the polygon in square metres.
///
/// Returns 0 for fewer than three points.
#[must_use]
pub fn area(polygon: &Polygon) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }

    let ring: geo::LineString<f64> = polygon
        .points()
        .iter()
        .map(|p| geo::Coord { x: p.lng, y: p.lat })
        .collect();
    geo::Polygon::new(ring, Vec::new()).geodesic_area_unsigned()
}

/// Shoelace area of the polygon in the local frame at its centroid (m²).
///
/// Returns 0 for fewer than three points.
#[must_use]
pub fn planar_area(polygon: &Polygon) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let frame = LocalFrame::new(centroid(polygon));
    let local: Vec<PlanarPoint> = polygon.points().iter().map(|p| frame.to_local(*p)).collect();
    shoelace(&local).abs()
}

/// Signed shoelace area of a planar ring (positive when counter-clockwise).
#[must_use]
pub fn shoelace(points: &[PlanarPoint]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x.mul_add(points[j].y, -(points[j].x * points[i].y));
    }
    sum * 0.5
}

/// Perimeter of the closed ring in metres (Haversine, closing edge included).
///
/// Returns 0 for fewer than three points; use [`path_length`] to measure an
/// open drawing.
#[must_use]
pub fn perimeter(polygon: &Polygon) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    polygon.edges().map(|(a, b)| distance(a, b)).sum()
}

/// Length of an open path in metres, summing whatever edges exist.
#[must_use]
pub fn path_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Great-circle (Haversine) distance between two points in metres.
#[must_use]
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (phi1.cos() * phi2.cos())
        .mul_add((d_lambda / 2.0).sin().powi(2), (d_phi / 2.0).sin().powi(2));
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Arithmetic mean of the vertices.
///
/// Not area-weighted; adequate for small, roughly convex roof facets.
/// Returns the origin for an empty polygon.
#[must_use]
#[allow(clippy::cast_precision_loss)] // vertex counts are tiny
pub fn centroid(polygon: &Polygon) -> GeoPoint {
    let points = polygon.points();
    if points.is_empty() {
        return GeoPoint::default();
    }
    let n = points.len() as f64;
    let (lat, lng) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    GeoPoint::new(lat / n, lng / n)
}

/// Even-odd ray-casting containment test.
///
/// Points exactly on an edge may fall either way.
#[must_use]
pub fn contains_point(polygon: &Polygon, point: GeoPoint) -> bool {
    let pts = polygon.points();
    let n = pts.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (pts[i], pts[j]);
        if (pi.lat > point.lat) != (pj.lat > point.lat) {
            let cross_lng = (pj.lng - pi.lng) * (point.lat - pi.lat) / (pj.lat - pi.lat) + pi.lng;
            if point.lng < cross_lng {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Returns `true` if any two non-adjacent edges intersect.
///
/// A triangle cannot self-intersect, so fewer than four points is `false`.
#[must_use]
pub fn self_intersects(polygon: &Polygon) -> bool {
    let pts = polygon.points();
    let n = pts.len();
    if n < 4 {
        return false;
    }

    for i in 0..n {
        let (a, b) = (pts[i], pts[(i + 1) % n]);
        for j in (i + 2)..n {
            // Edge n-1 wraps around to vertex 0, which edge 0 shares
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (pts[j], pts[(j + 1) % n]);
            if segments_intersect(a, b, c, d) {
                return true;
            }
        }
    }
    false
}

/// Returns `true` if segment `ab` intersects segment `cd` (touching counts).
#[must_use]
#[allow(clippy::float_cmp)] // exact zero means exactly collinear
pub fn segments_intersect(a: GeoPoint, b: GeoPoint, c: GeoPoint, d: GeoPoint) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 * o2 < 0.0 && o3 * o4 < 0.0 {
        return true;
    }

    (o1 == 0.0 && on_segment(a, c, b))
        || (o2 == 0.0 && on_segment(a, d, b))
        || (o3 == 0.0 && on_segment(c, a, d))
        || (o4 == 0.0 && on_segment(c, b, d))
}

/// Cross product of `ab × ac`: positive for a counter-clockwise turn.
fn orientation(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> f64 {
    (b.lng - a.lng).mul_add(c.lat - a.lat, -((b.lat - a.lat) * (c.lng - a.lng)))
}

/// Returns `true` if collinear point `q` lies within the bounding box of `pr`.
fn on_segment(p: GeoPoint, q: GeoPoint, r: GeoPoint) -> bool {
    q.lng <= p.lng.max(r.lng)
        && q.lng >= p.lng.min(r.lng)
        && q.lat <= p.lat.max(r.lat)
        && q.lat >= p.lat.min(r.lat)
}

/// Checks that a polygon may be saved as a roof outline or restricted area.
///
/// # Errors
///
/// Returns a [`GeometryError`] if the polygon has fewer than three points,
/// a non-finite coordinate, crossing edges, or no enclosed area.
pub fn validate_for_save(polygon: &Polygon) -> Result<(), GeometryError> {
    if polygon.len() < 3 {
        return Err(GeometryError::TooFewPoints {
            count: polygon.len(),
        });
    }
    if !polygon.points().iter().all(GeoPoint::is_finite) {
        return Err(GeometryError::NonFiniteCoordinate);
    }
    if self_intersects(polygon) {
        return Err(GeometryError::SelfIntersecting);
    }
    if planar_area(polygon) < MIN_SAVE_AREA_M2 {
        return Err(GeometryError::ZeroArea);
    }
    Ok(())
}
