// THEORY:
// The `adjacency` module is the Adjacency Detector, the spatial heart of the pipeline.
// Given the reduced geometry of the cubes visible in one frame, it decides which pairs
// are physically joined and along which axis.
//
// Key architectural principles:
// 1.  **Fixed Enumeration**: pairs are visited in `CubeId` order, (W,I), (W,B), (W,S),
//     (I,B), (I,S), (B,S), restricted to the visible cubes. Within a pair, axes are
//     tried in priority order x, y, z and only the first passing axis is recorded.
// 2.  **Per-Axis Exclusivity**: a cube face can only touch one neighbor along a given
//     axis, so once a cube has been joined along an axis in this frame, that axis is
//     closed for every later pair involving the cube.
// 3.  **Hard Cap**: a frame holds at most `MAX_CONNECTIONS` joins. The scan stops the
//     moment the cap is reached, so later pairs are never examined. With four cubes
//     close together this decides which joins are reported.
// 4.  **Coarse Depth**: the tracker only sees rectangles, so the z test falls back to
//     center proximity, with a wider tolerance than the edge tests.

use crate::core_modules::cube::CubeId;
use crate::core_modules::geometry::CubeGeometry;
use crate::error::CreaCubeError;
use crate::pipeline::PipelineConfig;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// The largest number of joins recorded for a single frame.
pub const MAX_CONNECTIONS: usize = 3;

/// A spatial axis along which two cubes can be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    /// Back-to-front adjacency, tested on the horizontal edge gap.
    X,
    /// Left-to-right adjacency, tested on the vertical edge gap.
    Y,
    /// Stacking, approximated by center proximity.
    Z,
}

impl Axis {
    /// Axes in the order they are tried for each pair.
    pub const PRIORITY: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A join between two distinct cubes along one axis.
///
/// Rendered as the 3-character code `<first><axis><second>`, e.g. `WxI`. The detector
/// always puts the cube that comes first in `CubeId` order in `first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Connection {
    pub first: CubeId,
    pub axis: Axis,
    pub second: CubeId,
}

impl Connection {
    pub fn new(first: CubeId, axis: Axis, second: CubeId) -> Self {
        Self {
            first,
            axis,
            second,
        }
    }

    pub fn code(&self) -> String {
        self.to_string()
    }

    pub fn involves(&self, cube: CubeId) -> bool {
        self.first == cube || self.second == cube
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, self.axis, self.second)
    }
}

impl FromStr for Connection {
    type Err = CreaCubeError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let invalid = || CreaCubeError::InvalidConnectionCode(code.to_string());
        let mut chars = code.chars();
        let (Some(first), Some(axis), Some(second), None) =
            (chars.next(), chars.next(), chars.next(), chars.next())
        else {
            return Err(invalid());
        };
        let first = CubeId::from_letter(first).ok_or_else(invalid)?;
        let axis = Axis::from_letter(axis).ok_or_else(invalid)?;
        let second = CubeId::from_letter(second).ok_or_else(invalid)?;
        if first == second {
            return Err(invalid());
        }
        Ok(Connection::new(first, axis, second))
    }
}

/// The joins detected in one frame, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSet {
    connections: Vec<Connection>,
}

impl ConnectionSet {
    /// Builds a set from already-known joins, keeping at most `MAX_CONNECTIONS`.
    /// No exclusivity check is made; use `AdjacencyDetector::detect` for that.
    pub fn from_connections(connections: impl IntoIterator<Item = Connection>) -> Self {
        Self {
            connections: connections.into_iter().take(MAX_CONNECTIONS).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= MAX_CONNECTIONS
    }

    pub fn contains(&self, connection: &Connection) -> bool {
        self.connections.contains(connection)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn as_slice(&self) -> &[Connection] {
        &self.connections
    }

    pub fn codes(&self) -> Vec<String> {
        self.connections.iter().map(Connection::code).collect()
    }

    fn push(&mut self, connection: Connection) {
        self.connections.push(connection);
    }
}

/// Which axes each cube has already used in the current frame.
#[derive(Debug, Default)]
struct AxisClaims([[bool; 3]; 4]);

impl AxisClaims {
    fn is_free(&self, cube: CubeId, axis: Axis) -> bool {
        !self.0[cube.index()][axis.index()]
    }

    fn claim(&mut self, cube: CubeId, axis: Axis) {
        self.0[cube.index()][axis.index()] = true;
    }
}

/// Finds pairwise joins between the cubes visible in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyDetector {
    x_tolerance: f64,
    y_tolerance: f64,
    z_tolerance: f64,
}

impl Default for AdjacencyDetector {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl AdjacencyDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            x_tolerance: config.x_tolerance,
            y_tolerance: config.y_tolerance,
            z_tolerance: config.z_tolerance,
        }
    }

    /// Detects up to `MAX_CONNECTIONS` joins among `cubes`.
    ///
    /// `cubes` must be in `CubeId` order (as produced by `reduce_frame`); that order
    /// is the pair enumeration order.
    pub fn detect(&self, cubes: &[CubeGeometry]) -> ConnectionSet {
        let mut connections = ConnectionSet::default();
        let mut claims = AxisClaims::default();

        for (a, b) in unordered_pairs(cubes) {
            if connections.is_full() {
                break;
            }

            let joining_axis = Axis::PRIORITY.into_iter().find(|&axis| {
                claims.is_free(a.cube, axis)
                    && claims.is_free(b.cube, axis)
                    && self.joined_along(axis, a, b)
            });

            if let Some(axis) = joining_axis {
                claims.claim(a.cube, axis);
                claims.claim(b.cube, axis);
                let connection = Connection::new(a.cube, axis, b.cube);
                trace!(%connection, "cubes joined");
                connections.push(connection);
            }
        }

        connections
    }

    /// The geometric test for a single axis, ignoring exclusivity.
    pub fn joined_along(&self, axis: Axis, a: &CubeGeometry, b: &CubeGeometry) -> bool {
        match axis {
            Axis::X => {
                gap_within(a.edge.right, b.edge.left, self.x_tolerance)
                    || gap_within(b.edge.right, a.edge.left, self.x_tolerance)
            }
            Axis::Y => {
                gap_within(a.edge.bottom, b.edge.top, self.y_tolerance)
                    || gap_within(b.edge.bottom, a.edge.top, self.y_tolerance)
            }
            Axis::Z => a.center.distance_to(&b.center) < self.z_tolerance,
        }
    }
}

fn gap_within(from: f64, to: f64, tolerance: f64) -> bool {
    (from - to).abs() < tolerance
}

fn unordered_pairs(
    cubes: &[CubeGeometry],
) -> impl Iterator<Item = (&CubeGeometry, &CubeGeometry)> {
    cubes
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| cubes[i + 1..].iter().map(move |b| (a, b)))
}
