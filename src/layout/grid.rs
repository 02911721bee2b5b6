//! Rotated-grid search for the maximum panel count on a roof segment.

use crate::geometry::metrics::{centroid, contains_point};
use crate::geometry::restricted::{is_excluded, RestrictedArea};
use crate::geometry::transform::LocalFrame;
use crate::geometry::{GeoPoint, PlanarPoint, Polygon};
use crate::layout::rotation::{resolve_rotation, RotationMode};
use crate::layout::{
    LayoutOptions, LayoutResult, PanelFootprint, PanelPlacement, SegmentLayout,
    GRID_EXTENT_FACTOR, GRID_PADDING_STEPS, MAX_GRID_STEPS,
};
use crate::roof::RoofSegment;

/// Grid phase offsets, as fractions of the spacing on each axis.
const PHASES: [(f64, f64); 4] = [(0.0, 0.0), (0.5, 0.0), (0.0, 0.5), (0.5, 0.5)];

/// Computes the maximal panel layout for one roof polygon.
///
/// `rotation_deg` turns the panel grid counter-clockwise from east about the
/// polygon centroid. Placements are sorted closest-to-centroid first.
/// Returns an empty vector for degenerate polygons or when every candidate
/// is blocked.
#[must_use]
pub fn layout_segment(
    segment_id: &str,
    polygon: &Polygon,
    footprint: PanelFootprint,
    rotation_deg: f64,
    restricted: &[RestrictedArea],
    options: &LayoutOptions,
) -> Vec<PanelPlacement> {
    let Some(grid) = Grid::new(polygon, footprint, rotation_deg, options) else {
        return Vec::new();
    };

    let phases: &[(f64, f64)] = if options.phase_search {
        &PHASES
    } else {
        &PHASES[..1]
    };

    let mut best: Vec<PanelPlacement> = Vec::new();
    for &phase in phases {
        let candidate = grid.fit(segment_id, polygon, restricted, phase);
        if candidate.len() > best.len() {
            best = candidate;
        }
    }

    tracing::debug!(
        segment = segment_id,
        rotation = rotation_deg,
        count = best.len(),
        "Computed segment layout"
    );

    best
}

/// Lays out every selected segment independently and concatenates the results.
///
/// Segments are independent bins: there is no packing across segment
/// boundaries.
#[must_use]
pub fn layout_segments(
    segments: &[&RoofSegment],
    footprint: PanelFootprint,
    rotation: RotationMode,
    restricted: &[RestrictedArea],
    options: &LayoutOptions,
) -> LayoutResult {
    let segments = segments
        .iter()
        .map(|segment| {
            let (rotation_deg, placements) =
                resolve_rotation(segment, footprint, rotation, restricted, options);
            SegmentLayout {
                segment_id: segment.id.clone(),
                rotation_deg,
                placements,
                truncated: grid_is_truncated(&segment.polygon, footprint, options),
            }
        })
        .collect();

    let result = LayoutResult { segments };
    tracing::debug!(max = result.max_count(), "Computed multi-segment layout");
    result
}

/// Returns `true` if the candidate grid for `polygon` is clamped to
/// [`MAX_GRID_STEPS`]. The grid extent does not depend on rotation.
#[must_use]
pub fn grid_is_truncated(
    polygon: &Polygon,
    footprint: PanelFootprint,
    options: &LayoutOptions,
) -> bool {
    Grid::new(polygon, footprint, 0.0, options).is_some_and(|grid| grid.truncated)
}

/// Precomputed grid parameters for one polygon and rotation.
struct Grid {
    frame: LocalFrame,
    spacing: PlanarPoint,
    half: PlanarPoint,
    steps_x: i64,
    steps_y: i64,
    truncated: bool,
    cos: f64,
    sin: f64,
}

impl Grid {
    #[allow(clippy::cast_possible_truncation)] // extent is finite and positive
    fn new(
        polygon: &Polygon,
        footprint: PanelFootprint,
        rotation_deg: f64,
        options: &LayoutOptions,
    ) -> Option<Self> {
        if polygon.len() < 3 || !rotation_deg.is_finite() {
            return None;
        }

        let frame = LocalFrame::new(centroid(polygon));
        let (min, max) = polygon.bounds()?;
        let (per_lat, per_lng) = frame.scale();
        let lat_span = (max.lat - min.lat) * per_lat;
        let lng_span = (max.lng - min.lng) * per_lng;
        let max_extent = lat_span.max(lng_span) * GRID_EXTENT_FACTOR;
        if !(max_extent.is_finite() && max_extent > 0.0) {
            return None;
        }

        let gap = options.gap_m.max(0.0);
        let spacing = PlanarPoint::new(footprint.width_m + gap, footprint.height_m + gap);
        let raw_steps = |spacing: f64| (max_extent / spacing).ceil() as i64 + GRID_PADDING_STEPS;
        let (raw_x, raw_y) = (raw_steps(spacing.x), raw_steps(spacing.y));
        let truncated = raw_x > MAX_GRID_STEPS || raw_y > MAX_GRID_STEPS;
        if truncated {
            tracing::warn!(
                steps_x = raw_x,
                steps_y = raw_y,
                max = MAX_GRID_STEPS,
                "Grid too large, clamping"
            );
        }

        let (sin, cos) = rotation_deg.to_radians().sin_cos();
        Some(Self {
            frame,
            spacing,
            half: PlanarPoint::new(footprint.width_m / 2.0, footprint.height_m / 2.0),
            steps_x: raw_x.min(MAX_GRID_STEPS),
            steps_y: raw_y.min(MAX_GRID_STEPS),
            truncated,
            cos,
            sin,
        })
    }

    /// Runs one grid pass at the given phase offset.
    #[allow(clippy::cast_precision_loss)] // grid indices are small
    fn fit(
        &self,
        segment_id: &str,
        polygon: &Polygon,
        restricted: &[RestrictedArea],
        phase: (f64, f64),
    ) -> Vec<PanelPlacement> {
        let mut placements = Vec::new();

        for j in -self.steps_y..=self.steps_y {
            let cy = (j as f64 + phase.1) * self.spacing.y;
            for i in -self.steps_x..=self.steps_x {
                let cx = (i as f64 + phase.0) * self.spacing.x;
                if let Some(p) = self.candidate(segment_id, polygon, restricted, cx, cy) {
                    placements.push(p);
                }
            }
        }

        // Stable sort keeps grid order for equidistant panels
        placements.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        placements
    }

    fn candidate(
        &self,
        segment_id: &str,
        polygon: &Polygon,
        restricted: &[RestrictedArea],
        cx: f64,
        cy: f64,
    ) -> Option<PanelPlacement> {
        let (hw, hh) = (self.half.x, self.half.y);
        let local = [
            PlanarPoint::new(cx - hw, cy - hh),
            PlanarPoint::new(cx + hw, cy - hh),
            PlanarPoint::new(cx + hw, cy + hh),
            PlanarPoint::new(cx - hw, cy + hh),
        ];

        let mut corners = [GeoPoint::default(); 4];
        for (corner, p) in corners.iter_mut().zip(local) {
            *corner = self.frame.to_geo(p.rotated(self.cos, self.sin));
            if !contains_point(polygon, *corner) {
                return None;
            }
        }
        if is_excluded(&corners, restricted) {
            return None;
        }

        let center = PlanarPoint::new(cx, cy).rotated(self.cos, self.sin);
        Some(PanelPlacement {
            segment_id: segment_id.to_string(),
            center: self.frame.to_geo(center),
            corners,
            distance_m: center.norm(),
        })
    }
}
