//! Panel layout engine.
//!
//! Tiles roof segments with rotated panel rectangles. For each segment a
//! regular grid of candidate panel centres is laid out in a local metre
//! frame centred on the segment centroid, rotated by the layout angle, and
//! filtered so that every kept panel has all four corners inside the roof
//! and none inside a restricted area.
//!
//! # Contract
//!
//! Layouts are pure functions of (polygon, footprint, rotation, restricted
//! areas). They are recomputed on demand, never mutate their inputs, and
//! return an empty layout rather than an error for degenerate roofs.
//!
//! Placements are ordered by distance from the segment centroid, closest
//! first, so reducing the requested panel count removes panels from the
//! outside in.
//!
//! The candidate grid is limited to [`MAX_GRID_STEPS`] steps per axis and
//! side. A segment whose grid would need more is tiled only within that
//! window around its centroid, and its [`SegmentLayout::truncated`] flag is
//! set. With 1 m panels this starts at roughly 200 m from the centroid.
//!
//! # Modules
//!
//! - [`grid`] - Single- and multi-segment grid search
//! - [`rotation`] - Longest-edge default and angle optimisation
//! - [`selection`] - Requested count vs. maximum (clamp and snap-to-max)

pub mod grid;
pub mod rotation;
pub mod selection;

use serde::{Deserialize, Serialize};

use crate::geometry::{GeoPoint, GeometryError};

pub use grid::{grid_is_truncated, layout_segment, layout_segments};
pub use rotation::{longest_edge_rotation, optimize_rotation, RotationMode, RotationSearch};
pub use selection::PanelSelection;

/// Spacing added to both panel axes (m).
pub const DEFAULT_PANEL_GAP_M: f64 = 0.05;

/// The grid half-extent is the larger bounding-box span times this factor,
/// so the rotated grid still covers the whole polygon.
pub const GRID_EXTENT_FACTOR: f64 = 1.5;

/// Extra grid steps on each side to absorb rounding.
pub const GRID_PADDING_STEPS: i64 = 2;

/// Upper bound on grid steps per axis and side. Layouts that hit it are
/// flagged [`SegmentLayout::truncated`].
pub const MAX_GRID_STEPS: i64 = 400;

/// Physical panel size used for tiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelFootprint {
    /// Width along the layout axis (m).
    pub width_m: f64,
    /// Height across the layout axis (m).
    pub height_m: f64,
}

impl PanelFootprint {
    /// Creates a footprint.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidFootprint`] if either dimension is not
    /// a positive finite number.
    pub fn new(width_m: f64, height_m: f64) -> Result<Self, GeometryError> {
        for (name, value) in [("width", width_m), ("height", height_m)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::invalid_footprint(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(Self { width_m, height_m })
    }

    /// Returns the footprint turned by 90° (portrait ↔ landscape).
    #[must_use]
    pub const fn turned(self) -> Self {
        Self {
            width_m: self.height_m,
            height_m: self.width_m,
        }
    }
}

/// Tuning knobs for the grid search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Gap added to both panel axes (m).
    pub gap_m: f64,

    /// Also try grids shifted by half a step on each axis.
    pub phase_search: bool,

    /// Coarse angle step for rotation optimisation (degrees).
    pub coarse_step_deg: f64,

    /// Half-width of the 1° refinement window (degrees).
    pub refine_window_deg: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            gap_m: DEFAULT_PANEL_GAP_M,
            phase_search: true,
            coarse_step_deg: 5.0,
            refine_window_deg: 5.0,
        }
    }
}

/// A computed panel position. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelPlacement {
    /// Roof segment this panel belongs to.
    pub segment_id: String,

    /// Panel centre.
    pub center: GeoPoint,

    /// Corners in ring order.
    pub corners: [GeoPoint; 4],

    /// Distance from the segment centroid (m).
    pub distance_m: f64,
}

/// Layout of a single roof segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentLayout {
    /// Roof segment id.
    pub segment_id: String,

    /// Rotation used (degrees, counter-clockwise from east).
    pub rotation_deg: f64,

    /// Placements, closest to the centroid first.
    pub placements: Vec<PanelPlacement>,

    /// The grid was clamped to [`MAX_GRID_STEPS`], so panels far from the
    /// centroid were not considered and `placements` may be below the true
    /// maximum.
    #[serde(default)]
    pub truncated: bool,
}

impl SegmentLayout {
    /// Maximum number of panels on this segment.
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.placements.len()
    }
}

/// Layout across all selected segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Per-segment layouts in selection order.
    pub segments: Vec<SegmentLayout>,
}

impl LayoutResult {
    /// Total maximum panel count across segments.
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.segments.iter().map(SegmentLayout::max_count).sum()
    }

    /// Returns `true` if no panel fits anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max_count() == 0
    }

    /// Returns the first `count` placements, filling segments in order.
    #[must_use]
    pub fn active(&self, count: usize) -> Vec<&PanelPlacement> {
        self.segments
            .iter()
            .flat_map(|s| s.placements.iter())
            .take(count)
            .collect()
    }

    /// Returns `(segment id, used, max)` for each segment when `count`
    /// panels are active.
    #[must_use]
    pub fn usage(&self, count: usize) -> Vec<(&str, usize, usize)> {
        let mut remaining = count;
        self.segments
            .iter()
            .map(|s| {
                let used = remaining.min(s.max_count());
                remaining -= used;
                (s.segment_id.as_str(), used, s.max_count())
            })
            .collect()
    }
}
