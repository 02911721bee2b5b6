//! Interactive polygon drawing as an explicit state machine.
//!
//! ```text
//! Idle --start--> Drawing --finish / auto-close--> Committed
//!                  |  ^                                |
//!                  +--+ add_point, undo                |
//!  any --cancel--> Idle        Committed --take--> Idle
//! ```
//!
//! Only one drawing is active at a time; `start` discards whatever was in
//! progress.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{distance, validate_for_save, GeoPoint, GeometryError, Polygon};

/// Default snap distance to the first vertex (m).
pub const DEFAULT_AUTO_CLOSE_M: f64 = 5.0;

/// What the polygon being drawn will become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingTarget {
    /// A custom roof outline.
    Roof,
    /// A restricted area.
    Restriction,
}

/// Drawing session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DrawingState {
    /// Nothing is being drawn.
    #[default]
    Idle,
    /// Vertices are being placed.
    Drawing {
        /// Target of the drawing.
        target: DrawingTarget,
        /// Vertices so far.
        points: Vec<GeoPoint>,
    },
    /// A validated polygon waits to be taken by the session.
    Committed {
        /// Target of the drawing.
        target: DrawingTarget,
        /// Finished outline.
        polygon: Polygon,
    },
}

/// Result of placing a vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum PointOutcome {
    /// The vertex was added; carries the new vertex count.
    Added(usize),
    /// The vertex snapped to the first one and the polygon was committed.
    Closed(Polygon),
}

/// Invalid drawing actions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrawingError {
    /// No drawing is in progress.
    #[error("no drawing in progress")]
    NotDrawing,

    /// The vertex has a non-finite coordinate.
    #[error("point is not a finite coordinate")]
    InvalidPoint,

    /// The outline cannot be saved.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl DrawingState {
    /// Starts a new drawing, discarding any in-progress or uncollected one.
    pub fn start(&mut self, target: DrawingTarget) {
        if !matches!(self, Self::Idle) {
            tracing::debug!("Discarding previous drawing");
        }
        *self = Self::Drawing {
            target,
            points: Vec::new(),
        };
    }

    /// Adds a vertex.
    ///
    /// Once at least three vertices exist, a point within `auto_close_m` of
    /// the first vertex closes the polygon instead of being added.
    ///
    /// # Errors
    ///
    /// Returns an error when not drawing, for non-finite points, or when an
    /// auto-close produces an unsavable polygon (the state stays `Drawing`).
    pub fn add_point(
        &mut self,
        point: GeoPoint,
        auto_close_m: f64,
    ) -> Result<PointOutcome, DrawingError> {
        let Self::Drawing { points, .. } = self else {
            return Err(DrawingError::NotDrawing);
        };
        if !point.is_finite() {
            return Err(DrawingError::InvalidPoint);
        }
        if points.len() >= 3 && distance(points[0], point) <= auto_close_m {
            return self.finish().map(PointOutcome::Closed);
        }
        points.push(point);
        Ok(PointOutcome::Added(points.len()))
    }

    /// Removes the last vertex, if any.
    pub fn undo(&mut self) -> Option<GeoPoint> {
        match self {
            Self::Drawing { points, .. } => points.pop(),
            _ => None,
        }
    }

    /// Validates and commits the current outline.
    ///
    /// # Errors
    ///
    /// Returns an error when not drawing or when the outline has fewer than
    /// three points, crosses itself, or has zero area. The vertices are kept
    /// so the user can fix them.
    pub fn finish(&mut self) -> Result<Polygon, DrawingError> {
        let Self::Drawing { target, points } = self else {
            return Err(DrawingError::NotDrawing);
        };
        let polygon = Polygon::new(points.clone());
        validate_for_save(&polygon)?;
        *self = Self::Committed {
            target: *target,
            polygon: polygon.clone(),
        };
        Ok(polygon)
    }

    /// Abandons the drawing.
    pub fn cancel(&mut self) {
        *self = Self::Idle;
    }

    /// Takes a committed polygon and returns to `Idle`.
    pub fn take_committed(&mut self) -> Option<(DrawingTarget, Polygon)> {
        match std::mem::take(self) {
            Self::Committed { target, polygon } => Some((target, polygon)),
            other => {
                *self = other;
                None
            }
        }
    }

    /// Vertices placed so far (empty unless drawing).
    #[must_use]
    pub fn points(&self) -> &[GeoPoint] {
        match self {
            Self::Drawing { points, .. } => points,
            _ => &[],
        }
    }

    /// Returns `true` while vertices are being placed.
    #[must_use]
    pub const fn is_drawing(&self) -> bool {
        matches!(self, Self::Drawing { .. })
    }
}
