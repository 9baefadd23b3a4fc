// THEORY:
// The `geometry` module is the Geometry Reducer: the first stage of the per-frame
// pipeline. It turns the raw rectangles of a `Frame` into the two derived shapes the
// adjacency tests need, a center point and an edge tuple.
//
// Key architectural principles:
// 1.  **All Or Nothing**: a rectangle only exists when all four of its components
//     were measured. `Rectangle::from_components` is the single place where partial
//     measurements are collapsed into absence.
// 2.  **Absent Cubes Vanish**: `reduce_frame` returns geometry only for visible
//     cubes. A cube without a rectangle contributes nothing downstream, exactly as if
//     it were not on the table.
// 3.  **Stable Order**: the reduced list is always in `CubeId` order, which is the
//     pair enumeration order of the adjacency detector.

use crate::core_modules::cube::CubeId;
use crate::core_modules::frame::Frame;

/// An axis-aligned bounding rectangle in tracker measurement units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Builds a rectangle only if every component was measured.
    pub fn from_components(components: [Option<f64>; 4]) -> Option<Self> {
        match components {
            [Some(x1), Some(y1), Some(x2), Some(y2)] => Some(Self::new(x1, y1, x2, y2)),
            _ => None,
        }
    }

    pub fn center(&self) -> Center {
        Center {
            x: (self.x1 + self.x2) / 2.0,
            y: (self.y1 + self.y2) / 2.0,
        }
    }

    pub fn edge(&self) -> Edge {
        Edge {
            left: self.x1,
            right: self.x2,
            top: self.y1,
            bottom: self.y2,
        }
    }
}

/// The midpoint of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub x: f64,
    pub y: f64,
}

impl Center {
    pub fn distance_to(&self, other: &Center) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The four edges of a rectangle, named for the overlap tests that use them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// The reduced geometry of one visible cube in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeGeometry {
    pub cube: CubeId,
    pub center: Center,
    pub edge: Edge,
}

impl CubeGeometry {
    pub fn from_rectangle(cube: CubeId, rectangle: &Rectangle) -> Self {
        Self {
            cube,
            center: rectangle.center(),
            edge: rectangle.edge(),
        }
    }
}

/// Reduces a frame to the geometry of its visible cubes, in `CubeId` order.
pub fn reduce_frame(frame: &Frame) -> Vec<CubeGeometry> {
    frame
        .visible()
        .map(|(cube, rectangle)| CubeGeometry::from_rectangle(cube, rectangle))
        .collect()
}
