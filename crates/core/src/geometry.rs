//! Axis-aligned rectangle geometry for region planning.
//!
//! All rectangles are closed 2D intervals in the file's projected
//! coordinate system. The partitioner only ever produces grid-aligned
//! rectangles, so plain f64 comparisons are exact here (every boundary
//! is `origin + k * cell`).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The 2D footprint of a point-cloud file or a claimed region.
///
/// Invariant: `x_min <= x_max` and `y_min <= y_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Create a bounding box, validating the min/max ordering.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self, CoreError> {
        if x_min > x_max || y_min > y_max {
            return Err(CoreError::Validation(format!(
                "Degenerate bounding box: x=[{x_min}, {x_max}] y=[{y_min}, {y_max}]"
            )));
        }
        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True when the rectangles share interior area. Shared edges do
    /// not count as an intersection.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x_min < other.x_max
            && self.x_max > other.x_min
            && self.y_min < other.y_max
            && self.y_max > other.y_min
    }

    /// True when `other` lies entirely inside `self` (edges allowed).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.x_min <= other.x_min
            && self.x_max >= other.x_max
            && self.y_min <= other.y_min
            && self.y_max >= other.y_max
    }

    /// Snap this box outward onto the grid lattice.
    ///
    /// The minimum edges round down, the maximum edges round up, so the
    /// snapped box always covers the original footprint. A snapped
    /// extent that collapses to zero width or height is promoted to a
    /// single cell.
    pub fn snap_to_grid(&self, grid: &GridSpec) -> BoundingBox {
        let mut x_min =
            grid.origin_x + ((self.x_min - grid.origin_x) / grid.cell_width).floor() * grid.cell_width;
        let mut x_max =
            grid.origin_x + ((self.x_max - grid.origin_x) / grid.cell_width).ceil() * grid.cell_width;
        let mut y_min = grid.origin_y
            + ((self.y_min - grid.origin_y) / grid.cell_height).floor() * grid.cell_height;
        let mut y_max = grid.origin_y
            + ((self.y_max - grid.origin_y) / grid.cell_height).ceil() * grid.cell_height;

        if x_max <= x_min {
            x_max = x_min + grid.cell_width;
        }
        if y_max <= y_min {
            y_max = y_min + grid.cell_height;
        }

        BoundingBox {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Subtract `obstacle` from this box, returning the surviving
    /// fragments.
    ///
    /// A rectangle minus one overlapping rectangle decomposes into at
    /// most four disjoint strips: top and bottom at full width, left
    /// and right clamped to the overlap band. Zero-area strips are
    /// omitted. If the boxes do not overlap, `self` survives whole.
    pub fn subtract(&self, obstacle: &BoundingBox) -> Vec<BoundingBox> {
        if !self.intersects(obstacle) {
            return vec![*self];
        }

        let inter_x_min = self.x_min.max(obstacle.x_min);
        let inter_x_max = self.x_max.min(obstacle.x_max);
        let inter_y_min = self.y_min.max(obstacle.y_min);
        let inter_y_max = self.y_max.min(obstacle.y_max);

        let mut parts = Vec::with_capacity(4);
        if self.y_max > inter_y_max {
            parts.push(BoundingBox {
                x_min: self.x_min,
                x_max: self.x_max,
                y_min: inter_y_max,
                y_max: self.y_max,
            });
        }
        if self.y_min < inter_y_min {
            parts.push(BoundingBox {
                x_min: self.x_min,
                x_max: self.x_max,
                y_min: self.y_min,
                y_max: inter_y_min,
            });
        }
        if self.x_min < inter_x_min {
            parts.push(BoundingBox {
                x_min: self.x_min,
                x_max: inter_x_min,
                y_min: inter_y_min,
                y_max: inter_y_max,
            });
        }
        if self.x_max > inter_x_max {
            parts.push(BoundingBox {
                x_min: inter_x_max,
                x_max: self.x_max,
                y_min: inter_y_min,
                y_max: inter_y_max,
            });
        }
        parts
    }
}

/// The snapping lattice for region planning.
///
/// Every region boundary emitted by the partitioner lies on
/// `origin + k * cell` for integer `k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub cell_width: f64,
    pub cell_height: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl GridSpec {
    /// Validate the grid parameters: cell sizes must be positive and
    /// finite.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.cell_width.is_finite() && self.cell_width > 0.0) {
            return Err(CoreError::Validation(format!(
                "Grid cell width must be positive, got {}",
                self.cell_width
            )));
        }
        if !(self.cell_height.is_finite() && self.cell_height > 0.0) {
            return Err(CoreError::Validation(format!(
                "Grid cell height must be positive, got {}",
                self.cell_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> BoundingBox {
        BoundingBox::new(x_min, x_max, y_min, y_max).unwrap()
    }

    fn unit_grid() -> GridSpec {
        GridSpec {
            cell_width: 1.0,
            cell_height: 1.0,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }

    #[test]
    fn rejects_inverted_extents() {
        assert!(BoundingBox::new(10.0, 0.0, 0.0, 10.0).is_err());
        assert!(BoundingBox::new(0.0, 10.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn snap_rounds_outward_only() {
        let snapped = bbox(0.3, 9.7, 1.1, 8.9).snap_to_grid(&unit_grid());
        assert_eq!(snapped, bbox(0.0, 10.0, 1.0, 9.0));
        assert!(snapped.contains(&bbox(0.3, 9.7, 1.1, 8.9)));
    }

    #[test]
    fn snap_is_identity_for_aligned_box() {
        let aligned = bbox(2.0, 5.0, 3.0, 7.0);
        assert_eq!(aligned.snap_to_grid(&unit_grid()), aligned);
    }

    #[test]
    fn snap_respects_grid_origin() {
        let grid = GridSpec {
            cell_width: 2.0,
            cell_height: 2.0,
            origin_x: 0.5,
            origin_y: 0.5,
        };
        let snapped = bbox(1.0, 3.0, 1.0, 3.0).snap_to_grid(&grid);
        assert_eq!(snapped, bbox(0.5, 4.5, 0.5, 4.5));
    }

    #[test]
    fn degenerate_snap_promotes_to_one_cell() {
        // A point footprint sitting exactly on a lattice node.
        let snapped = bbox(3.0, 3.0, 4.0, 4.0).snap_to_grid(&unit_grid());
        assert_eq!(snapped, bbox(3.0, 4.0, 4.0, 5.0));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        assert!(!bbox(0.0, 1.0, 0.0, 1.0).intersects(&bbox(1.0, 2.0, 0.0, 1.0)));
        assert!(bbox(0.0, 2.0, 0.0, 2.0).intersects(&bbox(1.0, 3.0, 1.0, 3.0)));
    }

    #[test]
    fn subtract_disjoint_keeps_whole_box() {
        let a = bbox(0.0, 10.0, 0.0, 10.0);
        let parts = a.subtract(&bbox(20.0, 30.0, 0.0, 10.0));
        assert_eq!(parts, vec![a]);
    }

    #[test]
    fn subtract_contained_obstacle_yields_four_strips() {
        let outer = bbox(0.0, 100.0, 0.0, 100.0);
        let hole = bbox(40.0, 60.0, 40.0, 60.0);
        let parts = outer.subtract(&hole);
        assert_eq!(parts.len(), 4);

        let total: f64 = parts.iter().map(BoundingBox::area).sum();
        assert_eq!(total, outer.area() - hole.area());
        for p in &parts {
            assert!(!p.intersects(&hole));
        }
        // Left/right strips are clamped to the overlap band in Y.
        assert!(parts.contains(&bbox(0.0, 40.0, 40.0, 60.0)));
        assert!(parts.contains(&bbox(60.0, 100.0, 40.0, 60.0)));
    }

    #[test]
    fn subtract_edge_obstacle_yields_three_strips() {
        let outer = bbox(0.0, 100.0, 0.0, 100.0);
        let notch = bbox(0.0, 20.0, 40.0, 60.0);
        let parts = outer.subtract(&notch);
        assert_eq!(parts.len(), 3);
        let total: f64 = parts.iter().map(BoundingBox::area).sum();
        assert_eq!(total, outer.area() - notch.area());
    }

    #[test]
    fn subtract_covering_obstacle_erases_box() {
        let inner = bbox(20.0, 80.0, 20.0, 80.0);
        assert!(inner.subtract(&bbox(0.0, 100.0, 0.0, 100.0)).is_empty());
    }

    #[test]
    fn grid_validation_rejects_non_positive_cells() {
        let mut grid = unit_grid();
        grid.cell_width = 0.0;
        assert!(grid.validate().is_err());
        grid.cell_width = 1.0;
        grid.cell_height = -2.0;
        assert!(grid.validate().is_err());
        assert!(unit_grid().validate().is_ok());
    }
}
