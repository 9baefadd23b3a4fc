// THEORY:
// The `cube` module names the four physical objects the whole system reasons about.
// The set is closed: a CreaCube kit has exactly one wheels cube, one inverter, one
// battery and one sensor, and nothing at runtime can add a fifth.
//
// Key architectural principles:
// 1.  **Closed Identity**: `CubeId` is a plain enum, so every table indexed by cube
//     (rectangles in a frame, axis claims in the adjacency detector) can be a fixed
//     array instead of a map.
// 2.  **Declaration Order Is Observable**: the order W, I, B, S is the order in which
//     the adjacency detector enumerates pairs and the order in which cubes appear in
//     a connection code. Reordering the variants changes which joins are found when
//     the connection cap is hit, so the derived `Ord` is part of the contract.

use std::fmt;

/// One of the four tracked cubes, identified by its role (and color in the footage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CubeId {
    /// Wheels cube (white).
    W,
    /// Inverter cube (red).
    I,
    /// Battery cube (blue).
    B,
    /// Sensor cube (black).
    S,
}

impl CubeId {
    /// Every cube, in canonical enumeration order.
    pub const ALL: [CubeId; 4] = [CubeId::W, CubeId::I, CubeId::B, CubeId::S];

    /// Position of this cube in `ALL`, used to index per-cube arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The single-letter identifier used in connection codes.
    pub fn letter(self) -> char {
        match self {
            CubeId::W => 'W',
            CubeId::I => 'I',
            CubeId::B => 'B',
            CubeId::S => 'S',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'W' => Some(CubeId::W),
            'I' => Some(CubeId::I),
            'B' => Some(CubeId::B),
            'S' => Some(CubeId::S),
            _ => None,
        }
    }
}

impl fmt::Display for CubeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
