// THEORY:
// A `Frame` is one timestamped observation from the tracker. It is a "dumb" data
// container: for each of the four cubes it either holds a complete rectangle or
// nothing at all. "Nothing" means the cube was not visible in that frame; it is never
// a zero rectangle and never an error.

use crate::core_modules::cube::CubeId;
use crate::core_modules::geometry::Rectangle;

/// A single timestamped observation of up to four cube rectangles.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The tracker timestamp. Frames are expected in non-decreasing order.
    pub timestamp: f64,
    /// Indexed by `CubeId::index()`.
    rectangles: [Option<Rectangle>; 4],
}

impl Frame {
    /// Creates a frame in which no cube is visible.
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            rectangles: [None; 4],
        }
    }

    /// Builder-style helper that records a rectangle for `cube`.
    pub fn with_rectangle(mut self, cube: CubeId, rectangle: Rectangle) -> Self {
        self.set_rectangle(cube, Some(rectangle));
        self
    }

    pub fn set_rectangle(&mut self, cube: CubeId, rectangle: Option<Rectangle>) {
        self.rectangles[cube.index()] = rectangle;
    }

    pub fn rectangle(&self, cube: CubeId) -> Option<&Rectangle> {
        self.rectangles[cube.index()].as_ref()
    }

    /// Iterates the visible cubes in canonical `CubeId` order.
    pub fn visible(&self) -> impl Iterator<Item = (CubeId, &Rectangle)> {
        CubeId::ALL
            .into_iter()
            .filter_map(|cube| self.rectangle(cube).map(|rect| (cube, rect)))
    }

    pub fn visible_count(&self) -> usize {
        self.rectangles.iter().filter(|r| r.is_some()).count()
    }
}
