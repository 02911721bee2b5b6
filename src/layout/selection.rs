//! Requested panel count versus the layout maximum.

use serde::{Deserialize, Serialize};

/// The user's panel count and the current layout maximum.
///
/// `requested` never exceeds `max`. When the maximum grows (for example after
/// selecting another roof segment) the selection snaps up to the new maximum;
/// when it shrinks the selection is clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSelection {
    requested: usize,
    max: usize,
}

impl PanelSelection {
    /// Creates a selection at the maximum.
    #[must_use]
    pub const fn at_max(max: usize) -> Self {
        Self {
            requested: max,
            max,
        }
    }

    /// Current requested count.
    #[must_use]
    pub const fn requested(&self) -> usize {
        self.requested
    }

    /// Current maximum.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Sets the requested count, clamped to the maximum. Returns the value kept.
    pub fn set_requested(&mut self, count: usize) -> usize {
        self.requested = count.min(self.max);
        self.requested
    }

    /// Applies a recomputed layout maximum.
    pub fn update_max(&mut self, max: usize) {
        let grew = max > self.max;
        self.max = max;
        if grew {
            self.requested = max;
        } else {
            self.requested = self.requested.min(max);
        }
    }

    /// Applies the maximum for a newly chosen panel model: always snaps to it.
    pub fn change_panel_type(&mut self, max: usize) {
        *self = Self::at_max(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_requested_clamps() {
        let mut s = PanelSelection::at_max(20);
        assert_eq!(s.set_requested(12), 12);
        assert_eq!(s.set_requested(50), 20);
        assert_eq!(s.requested(), 20);
    }

    #[test]
    fn shrinking_max_clamps() {
        let mut s = PanelSelection::at_max(20);
        s.set_requested(15);
        s.update_max(10);
        assert_eq!(s.requested(), 10);
        s.update_max(10);
        assert_eq!(s.requested(), 10);
    }

    #[test]
    fn shrinking_max_keeps_smaller_request() {
        let mut s = PanelSelection::at_max(20);
        s.set_requested(5);
        s.update_max(10);
        assert_eq!(s.requested(), 5);
    }

    #[test]
    fn growing_max_snaps_up() {
        let mut s = PanelSelection::at_max(10);
        s.set_requested(4);
        s.update_max(25);
        assert_eq!(s.requested(), 25);
    }

    #[test]
    fn panel_change_snaps_to_max() {
        let mut s = PanelSelection::at_max(30);
        s.set_requested(3);
        s.change_panel_type(22);
        assert_eq!((s.requested(), s.max()), (22, 22));
    }

    #[test]
    fn never_exceeds_max_over_any_sequence() {
        let mut s = PanelSelection::default();
        let ops: [(u8, usize); 10] = [
            (0, 7),
            (1, 12),
            (0, 40),
            (1, 3),
            (2, 18),
            (0, 19),
            (1, 0),
            (0, 5),
            (2, 9),
            (1, 9),
        ];
        for (op, n) in ops {
            match op {
                0 => {
                    s.set_requested(n);
                }
                1 => s.update_max(n),
                _ => s.change_panel_type(n),
            }
            assert!(s.requested() <= s.max(), "{s:?}");
        }
    }
}
