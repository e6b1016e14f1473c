use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in projected (PCRS) or pixel coordinates.
/// Layer extents, projection extents and the current view all use this
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Builds bounds from a `[[x, y], [x, y]]` corner pair, normalizing the
    /// corner order. Tiled-CRS definitions list corners in either order.
    pub fn from_corners(a: [f64; 2], b: [f64; 2]) -> Self {
        Self::new(
            Point::new(a[0].min(b[0]), a[1].min(b[1])),
            Point::new(a[0].max(b[0]), a[1].max(b[1])),
        )
    }

    /// Bounds of `width` by `height` centred on `center`.
    pub fn from_center_and_size(center: Point, width: f64, height: f64) -> Self {
        let half = Point::new(width / 2.0, height / 2.0);
        Self::new(center.subtract(&half), center.add(&half))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// True when the rectangles overlap, shared edges included.
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y)
    }
}
