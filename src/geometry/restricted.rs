//! Restricted areas: user-drawn zones that must not receive panels.
//!
//! Exclusion is corner-based. A panel is dropped when one of its four
//! corners lies inside a restricted polygon; a restriction that sits
//! entirely inside a panel without covering a corner does not exclude it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::metrics::{area, contains_point, segments_intersect};
use crate::geometry::{GeoPoint, Polygon};

/// A "no panel" zone drawn on a roof (chimney, vent, skylight).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedArea {
    /// Unique identifier.
    pub id: String,

    /// Outline of the zone.
    pub polygon: Polygon,

    /// Enclosed area (m²), computed when the zone is created.
    pub area_m2: f64,
}

impl RestrictedArea {
    /// Creates a restricted area with a fresh id and computed area.
    #[must_use]
    pub fn new(polygon: Polygon) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), polygon)
    }

    /// Creates a restricted area with the given id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, polygon: Polygon) -> Self {
        let area_m2 = area(&polygon);
        Self {
            id: id.into(),
            polygon,
            area_m2,
        }
    }

    /// Returns `true` if this zone's outline overlaps `other`.
    ///
    /// Overlap means a vertex of either ring lies inside the other, or two
    /// edges cross.
    #[must_use]
    pub fn overlaps(&self, other: &Polygon) -> bool {
        polygons_overlap(&self.polygon, other)
    }
}

/// Returns `true` if any corner of the candidate lies in any restricted area.
#[must_use]
pub fn is_excluded(corners: &[GeoPoint; 4], restricted: &[RestrictedArea]) -> bool {
    restricted
        .iter()
        .any(|zone| corners.iter().any(|c| contains_point(&zone.polygon, *c)))
}

/// Returns the restricted areas drawn over roof segments that are not selected.
///
/// The result is informational: such zones have no effect on the layout and
/// are surfaced to the user as a warning.
#[must_use]
pub fn overlaps_non_selected_segments<'a>(
    restricted: &'a [RestrictedArea],
    non_selected: &[&Polygon],
) -> Vec<&'a RestrictedArea> {
    restricted
        .iter()
        .filter(|zone| non_selected.iter().any(|segment| zone.overlaps(segment)))
        .collect()
}

/// Returns `true` if two polygons share any interior or boundary point.
#[must_use]
pub fn polygons_overlap(a: &Polygon, b: &Polygon) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }

    if a.points().iter().any(|p| contains_point(b, *p))
        || b.points().iter().any(|p| contains_point(a, *p))
    {
        return true;
    }

    a.edges()
        .any(|(p1, p2)| b.edges().any(|(q1, q2)| segments_intersect(p1, p2, q1, q2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::transform::LocalFrame;
    use crate::geometry::PlanarPoint;

    fn frame() -> LocalFrame {
        LocalFrame::new(GeoPoint::new(46.95, 7.44))
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        let f = frame();
        Polygon::new(vec![
            f.to_geo(PlanarPoint::new(x0, y0)),
            f.to_geo(PlanarPoint::new(x1, y0)),
            f.to_geo(PlanarPoint::new(x1, y1)),
            f.to_geo(PlanarPoint::new(x0, y1)),
        ])
    }

    fn corners(x0: f64, y0: f64, x1: f64, y1: f64) -> [GeoPoint; 4] {
        let f = frame();
        [
            f.to_geo(PlanarPoint::new(x0, y0)),
            f.to_geo(PlanarPoint::new(x1, y0)),
            f.to_geo(PlanarPoint::new(x1, y1)),
            f.to_geo(PlanarPoint::new(x0, y1)),
        ]
    }

    #[test]
    fn corner_inside_zone_excludes() {
        let zones = vec![RestrictedArea::with_id("chimney", rect(0.5, 0.5, 2.0, 2.0))];
        assert!(is_excluded(&corners(0.0, 0.0, 1.0, 1.0), &zones));
        assert!(!is_excluded(&corners(3.0, 3.0, 4.0, 4.0), &zones));
    }

    #[test]
    fn zone_strictly_inside_panel_is_not_detected() {
        // Corner-only test: a small vent inside a panel leaves all corners free
        let zones = vec![RestrictedArea::with_id("vent", rect(0.4, 0.4, 0.6, 0.6))];
        assert!(!is_excluded(&corners(0.0, 0.0, 1.0, 1.0), &zones));
    }

    #[test]
    fn no_zones_excludes_nothing() {
        assert!(!is_excluded(&corners(0.0, 0.0, 1.0, 1.0), &[]));
    }

    #[test]
    fn new_zone_gets_unique_id_and_area() {
        let a = RestrictedArea::new(rect(0.0, 0.0, 2.0, 3.0));
        let b = RestrictedArea::new(rect(0.0, 0.0, 2.0, 3.0));
        assert_ne!(a.id, b.id);
        assert!((a.area_m2 - 6.0).abs() < 0.05, "{}", a.area_m2);
    }

    #[test]
    fn warns_about_zones_on_unselected_segments() {
        let unselected = rect(10.0, 0.0, 20.0, 10.0);
        let zones = vec![
            RestrictedArea::with_id("on-selected", rect(1.0, 1.0, 2.0, 2.0)),
            RestrictedArea::with_id("on-unselected", rect(12.0, 2.0, 14.0, 4.0)),
            RestrictedArea::with_id("straddling", rect(8.0, 2.0, 12.0, 4.0)),
        ];
        let warnings = overlaps_non_selected_segments(&zones, &[&unselected]);
        let ids: Vec<&str> = warnings.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["on-unselected", "straddling"]);
    }

    #[test]
    fn crossing_rectangles_overlap_without_contained_vertices() {
        // A plus sign: neither ring has a vertex inside the other
        let horizontal = rect(0.0, 4.0, 10.0, 6.0);
        let vertical = rect(4.0, 0.0, 6.0, 10.0);
        assert!(polygons_overlap(&horizontal, &vertical));
    }
}
