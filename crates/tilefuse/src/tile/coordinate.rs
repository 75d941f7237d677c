//! Tile coordinates in the ZXY (Slippy Map) scheme

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile identifier in ZXY format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    /// Zoom level
    pub z: u32,
    /// Column (X coordinate)
    pub x: u32,
    /// Row (Y coordinate, top to bottom)
    pub y: u32,
}

impl TileId {
    /// Create a new tile identifier
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Get parent tile at the next lower zoom
    pub fn parent(&self) -> Option<Self> {
        if self.z == 0 {
            return None;
        }
        Some(Self::new(self.z - 1, self.x / 2, self.y / 2))
    }

    /// Get the four child tiles at the next higher zoom
    pub fn children(&self) -> [Self; 4] {
        let z = self.z + 1;
        let x = self.x * 2;
        let y = self.y * 2;

        [
            Self::new(z, x, y),
            Self::new(z, x + 1, y),
            Self::new(z, x, y + 1),
            Self::new(z, x + 1, y + 1),
        ]
    }

    /// True iff `target` lies under this tile in the pyramid.
    ///
    /// A tile is within a target when its zoom is at most the target's and
    /// shifting the target column/row down to this zoom lands on this tile.
    pub fn within_target(&self, target: TileId) -> bool {
        if self.z > target.z {
            return false;
        }
        let dz = target.z - self.z;
        let x = target.x.checked_shr(dz).unwrap_or(0);
        let y = target.y.checked_shr(dz).unwrap_or(0);
        x == self.x && y == self.y
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Pixel offset of the target tile's top-left corner inside a coarser source
/// tile, at the resolution where one source tile spans
/// `extent * 2^(target.z - source_z)` units.
pub fn displacement(source_z: u32, extent: u32, target: TileId) -> (i64, i64) {
    let mut half = i64::from(extent) / 2;
    let mut dx = 0i64;
    let mut dy = 0i64;
    let mut x = target.x;
    let mut y = target.y;
    for _ in 0..(target.z - source_z) {
        half <<= 1;
        if x & 1 == 1 {
            dx += half;
        }
        if y & 1 == 1 {
            dy += half;
        }
        x >>= 1;
        y >>= 1;
    }
    (dx, dy)
}
