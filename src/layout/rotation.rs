//! Layout rotation: longest-edge default and count-maximising search.

use serde::{Deserialize, Serialize};

use crate::geometry::metrics::centroid;
use crate::geometry::restricted::RestrictedArea;
use crate::geometry::transform::LocalFrame;
use crate::geometry::Polygon;
use crate::layout::grid::layout_segment;
use crate::layout::{LayoutOptions, PanelFootprint, PanelPlacement};
use crate::roof::RoofSegment;

/// How the panel grid rotation is chosen for each segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "degrees", rename_all = "snake_case")]
pub enum RotationMode {
    /// Align with the segment's longest edge.
    #[default]
    LongestEdge,
    /// Use a fixed angle (degrees, counter-clockwise from east).
    Fixed(f64),
    /// Search for the angle that fits the most panels.
    Optimize,
}

/// Outcome of a rotation search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationSearch {
    /// Best angle found (degrees in `[0, 180)`).
    pub rotation_deg: f64,
    /// Panel count at that angle.
    pub count: usize,
}

/// Returns the angle of the polygon's longest edge in degrees, in `[0, 180)`.
///
/// Edge lengths are measured in the local metre frame so that longitude
/// compression at higher latitudes does not skew the choice. Returns 0 for
/// polygons with fewer than two points.
#[must_use]
pub fn longest_edge_rotation(polygon: &Polygon) -> f64 {
    if polygon.len() < 2 {
        return 0.0;
    }
    let frame = LocalFrame::new(centroid(polygon));

    let mut best_len = 0.0;
    let mut best_angle = 0.0;
    for (a, b) in polygon.edges() {
        let (pa, pb) = (frame.to_local(a), frame.to_local(b));
        let (dx, dy) = (pb.x - pa.x, pb.y - pa.y);
        let len = dx.hypot(dy);
        if len > best_len {
            best_len = len;
            best_angle = dy.atan2(dx).to_degrees();
        }
    }
    normalise(best_angle)
}

/// Scans rotations to maximise the panel count.
///
/// A coarse pass covers `[0, 180)` in `coarse_step_deg` steps, then a 1°
/// pass refines within `refine_window_deg` of the best coarse angle. Ties
/// keep the earlier angle.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // small positive step counts
pub fn optimize_rotation(
    polygon: &Polygon,
    footprint: PanelFootprint,
    restricted: &[RestrictedArea],
    options: &LayoutOptions,
) -> RotationSearch {
    let count_at = |deg: f64| layout_segment("", polygon, footprint, deg, restricted, options).len();

    let step = if options.coarse_step_deg > 0.0 {
        options.coarse_step_deg
    } else {
        5.0
    };
    let coarse_steps = (180.0 / step).ceil() as u32;

    let mut best = RotationSearch {
        rotation_deg: 0.0,
        count: count_at(0.0),
    };
    for k in 1..coarse_steps {
        let deg = f64::from(k) * step;
        let count = count_at(deg);
        if count > best.count {
            best = RotationSearch {
                rotation_deg: deg,
                count,
            };
        }
    }

    let window = options.refine_window_deg.max(0.0).floor() as i32;
    let centre = best.rotation_deg;
    for offset in -window..=window {
        if offset == 0 {
            continue;
        }
        let deg = normalise(centre + f64::from(offset));
        let count = count_at(deg);
        if count > best.count {
            best = RotationSearch {
                rotation_deg: deg,
                count,
            };
        }
    }

    tracing::debug!(
        rotation = best.rotation_deg,
        count = best.count,
        "Rotation search finished"
    );
    best
}

/// Resolves the rotation for a segment and returns it with the layout.
pub(crate) fn resolve_rotation(
    segment: &RoofSegment,
    footprint: PanelFootprint,
    mode: RotationMode,
    restricted: &[RestrictedArea],
    options: &LayoutOptions,
) -> (f64, Vec<PanelPlacement>) {
    let rotation_deg = match mode {
        RotationMode::LongestEdge => longest_edge_rotation(&segment.polygon),
        RotationMode::Fixed(deg) => deg,
        RotationMode::Optimize => {
            optimize_rotation(&segment.polygon, footprint, restricted, options).rotation_deg
        }
    };
    let placements = layout_segment(
        &segment.id,
        &segment.polygon,
        footprint,
        rotation_deg,
        restricted,
        options,
    );
    (rotation_deg, placements)
}

/// Maps an angle into `[0, 180)`; the panel grid is symmetric under 180°.
fn normalise(deg: f64) -> f64 {
    let d = deg.rem_euclid(180.0);
    // rem_euclid can round up to exactly 180 for tiny negative inputs
    if d >= 180.0 {
        0.0
    } else {
        d
    }
}
