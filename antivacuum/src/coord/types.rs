//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Horizontal size of a region along X and Z, in cells.
pub const REGION_WIDTH: i32 = 16;

/// `log2(REGION_WIDTH)`, used for floor division of world coordinates.
pub const REGION_SHIFT: u32 = 4;

/// Default lowest cell layer (inclusive).
pub const DEFAULT_MIN_Y: i32 = -64;

/// Default upper bound of the vertical extent (exclusive).
pub const DEFAULT_MAX_Y: i32 = 320;

/// Tallest vertical extent accepted, in cells.
pub const MAX_WORLD_HEIGHT: u32 = 4096;

/// Errors produced when converting positions to coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Position component is not finite: {0}")]
    NonFinite(f64),

    #[error("Position component out of range: {0}")]
    OutOfRange(f64),

    #[error("Invalid vertical extent: min_y {min_y} must be below max_y {max_y}")]
    InvalidExtent { min_y: i32, max_y: i32 },

    #[error("Vertical extent of {height} cells exceeds the maximum of {MAX_WORLD_HEIGHT}")]
    ExtentTooTall { height: u32 },
}

/// Address of a region on the 2-D region grid.
///
/// A region is a 16×16 column of cells spanning the full vertical extent of
/// the world. Ordering is lexicographic on `(rx, rz)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionAddress {
    /// Region X index (east-west)
    pub rx: i32,
    /// Region Z index (north-south)
    pub rz: i32,
}

impl RegionAddress {
    /// Create a region address.
    #[inline]
    pub const fn new(rx: i32, rz: i32) -> Self {
        Self { rx, rz }
    }

    /// Region containing the world cell column `(x, z)`.
    #[inline]
    pub const fn containing(x: i32, z: i32) -> Self {
        Self {
            rx: x >> REGION_SHIFT,
            rz: z >> REGION_SHIFT,
        }
    }

    /// World X of the region's west edge.
    #[inline]
    pub fn start_x(&self) -> i32 {
        self.rx.wrapping_shl(REGION_SHIFT)
    }

    /// World Z of the region's north edge.
    #[inline]
    pub fn start_z(&self) -> i32 {
        self.rz.wrapping_shl(REGION_SHIFT)
    }

    /// Region displaced by `(drx, drz)` on the grid.
    #[inline]
    pub fn offset(&self, drx: i32, drz: i32) -> Self {
        Self {
            rx: self.rx.wrapping_add(drx),
            rz: self.rz.wrapping_add(drz),
        }
    }

    /// Whether `other` touches this region by edge or corner.
    pub fn is_moore_adjacent(&self, other: &RegionAddress) -> bool {
        let dx = self.rx.wrapping_sub(other.rx);
        let dz = self.rz.wrapping_sub(other.rz);
        (dx, dz) != (0, 0) && (-1..=1).contains(&dx) && (-1..=1).contains(&dz)
    }
}

impl fmt::Display for RegionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.rx, self.rz)
    }
}

/// Vertical extent `[min_y, max_y)` of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldExtent {
    min_y: i32,
    max_y: i32,
}

impl WorldExtent {
    /// Create an extent, rejecting empty, inverted or oversized ranges.
    pub fn new(min_y: i32, max_y: i32) -> Result<Self, CoordError> {
        if min_y >= max_y {
            return Err(CoordError::InvalidExtent { min_y, max_y });
        }
        let height = max_y.abs_diff(min_y);
        if height > MAX_WORLD_HEIGHT {
            return Err(CoordError::ExtentTooTall { height });
        }
        Ok(Self { min_y, max_y })
    }

    /// Lowest cell layer (inclusive).
    #[inline]
    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Upper bound (exclusive).
    #[inline]
    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Number of cell layers.
    #[inline]
    pub fn height(&self) -> u32 {
        self.max_y.abs_diff(self.min_y)
    }

    #[inline]
    pub fn contains(&self, y: i32) -> bool {
        (self.min_y..self.max_y).contains(&y)
    }
}

impl Default for WorldExtent {
    fn default() -> Self {
        Self {
            min_y: DEFAULT_MIN_Y,
            max_y: DEFAULT_MAX_Y,
        }
    }
}

/// A region together with the vertical extent it spans.
///
/// This fully determines the region's cell coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionBounds {
    pub region: RegionAddress,
    pub extent: WorldExtent,
}

impl RegionBounds {
    #[inline]
    pub fn new(region: RegionAddress, extent: WorldExtent) -> Self {
        Self { region, extent }
    }

    /// Number of cells in the region (`16 × 16 × height`).
    #[inline]
    pub fn cell_count(&self) -> u64 {
        (REGION_WIDTH as u64) * (REGION_WIDTH as u64) * self.extent.height() as u64
    }

    /// World coordinate of local offset `(lx, ly, lz)`, where `ly` counts up
    /// from `min_y`.
    #[inline]
    pub fn cell_at(&self, lx: i32, ly: i32, lz: i32) -> CellCoordinate {
        CellCoordinate::new(
            self.region.start_x().wrapping_add(lx),
            self.extent.min_y().wrapping_add(ly),
            self.region.start_z().wrapping_add(lz),
        )
    }

    /// Whether the cell lies inside this region's bounding box.
    pub fn contains(&self, cell: &CellCoordinate) -> bool {
        cell.region() == self.region && self.extent.contains(cell.y)
    }
}

/// World coordinates of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellCoordinate {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Region whose column contains this cell.
    #[inline]
    pub const fn region(&self) -> RegionAddress {
        RegionAddress::containing(self.x, self.z)
    }

    /// Cell displaced by `(dx, dy, dz)`.
    #[inline]
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
            z: self.z.wrapping_add(dz),
        }
    }
}

impl fmt::Display for CellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
