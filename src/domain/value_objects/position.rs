//! Block positions and the sign marker anchoring a plot

use serde::{Deserialize, Serialize};

/// Integer block coordinates inside a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The physical sign a plot is anchored to
///
/// Two markers are equal when they sit on the same block; the world is
/// implied by the plot that owns the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    pub position: BlockPos,
}

impl Marker {
    pub fn at(x: i32, y: i32, z: i32) -> Self {
        Self {
            position: BlockPos::new(x, y, z),
        }
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sign at {}", self.position)
    }
}
