//! Shared fixtures for unit tests.

use crate::core_modules::catalog::{Catalog, Configuration};
use crate::core_modules::cube::CubeId;
use crate::core_modules::frame::Frame;
use crate::core_modules::geometry::Rectangle;

/// A frame whose cubes are laid out so detection yields exactly `WxI`, `IyB`, `BzS`.
pub fn assembled_f001(timestamp: f64) -> Frame {
    Frame::new(timestamp)
        .with_rectangle(CubeId::W, Rectangle::new(0.0, 0.0, 100.0, 100.0))
        // Right edge of W is 5 units from the left edge of I.
        .with_rectangle(CubeId::I, Rectangle::new(105.0, 200.0, 205.0, 300.0))
        // Bottom edge of I is 5 units from the top edge of B.
        .with_rectangle(CubeId::B, Rectangle::new(400.0, 305.0, 500.0, 405.0))
        // Center of S is about 42 units from the center of B.
        .with_rectangle(CubeId::S, Rectangle::new(430.0, 335.0, 530.0, 435.0))
}

pub fn f001_catalog() -> Catalog {
    [Configuration::from_codes("F001", &["WxI", "IyB", "BzS"]).unwrap()]
        .into_iter()
        .collect()
}
