//! Strided lattice walk over a region.

use crate::coord::{CellCoordinate, RegionBounds, REGION_WIDTH};

/// Iterator over a strided lattice of a region's cells.
///
/// Lattice points start at the region's lowest corner and step by
/// `stride_xz` horizontally and `stride_y` vertically. Cells are yielded
/// column by column: X outermost, then Z, then Y from bottom to top.
#[derive(Debug, Clone)]
pub struct LatticeIter {
    bounds: RegionBounds,
    stride_xz: i32,
    stride_y: i32,
    columns_z: u64,
    layers: u64,
    current: u64,
    total: u64,
}

impl LatticeIter {
    /// Create a lattice walk. Strides below 1 are treated as 1.
    pub fn new(bounds: RegionBounds, stride_xz: i32, stride_y: i32) -> Self {
        let stride_xz = stride_xz.max(1);
        let stride_y = stride_y.max(1);
        let columns = Self::steps(REGION_WIDTH as u64, stride_xz);
        let layers = Self::steps(bounds.extent.height() as u64, stride_y);
        Self {
            bounds,
            stride_xz,
            stride_y,
            columns_z: columns,
            layers,
            current: 0,
            total: columns * columns * layers,
        }
    }

    /// Every cell of the region.
    pub fn dense(bounds: RegionBounds) -> Self {
        Self::new(bounds, 1, 1)
    }

    /// Number of lattice points in the walk.
    pub fn len_for(bounds: RegionBounds, stride_xz: i32, stride_y: i32) -> u64 {
        Self::new(bounds, stride_xz, stride_y).total
    }

    fn steps(span: u64, stride: i32) -> u64 {
        span.div_ceil(stride as u64)
    }
}

impl Iterator for LatticeIter {
    type Item = CellCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.total {
            return None;
        }

        let iy = self.current % self.layers;
        let iz = (self.current / self.layers) % self.columns_z;
        let ix = self.current / (self.layers * self.columns_z);
        self.current += 1;

        Some(self.bounds.cell_at(
            ix as i32 * self.stride_xz,
            iy as i32 * self.stride_y,
            iz as i32 * self.stride_xz,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LatticeIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{RegionAddress, WorldExtent, MAX_WORLD_HEIGHT};

    fn bounds(height: i32) -> RegionBounds {
        RegionBounds::new(RegionAddress::new(0, 0), WorldExtent::new(0, height).unwrap())
    }

    #[test]
    fn test_dense_order_is_column_major_bottom_up() {
        let mut cells = LatticeIter::dense(bounds(3));
        assert_eq!(cells.next(), Some(CellCoordinate::new(0, 0, 0)));
        assert_eq!(cells.next(), Some(CellCoordinate::new(0, 1, 0)));
        assert_eq!(cells.next(), Some(CellCoordinate::new(0, 2, 0)));
        assert_eq!(cells.next(), Some(CellCoordinate::new(0, 0, 1)));
    }

    #[test]
    fn test_strided_counts_round_up() {
        // 16 / 2 = 8 columns per axis, ceil(10 / 4) = 3 layers
        assert_eq!(LatticeIter::len_for(bounds(10), 2, 4), 8 * 8 * 3);
        let last = LatticeIter::new(bounds(10), 2, 4).last().unwrap();
        assert_eq!(last, CellCoordinate::new(14, 8, 14));
    }

    #[test]
    fn test_tallest_extent_at_top_of_range() {
        let extent = WorldExtent::new(i32::MAX - MAX_WORLD_HEIGHT as i32, i32::MAX).unwrap();
        let bounds = RegionBounds::new(RegionAddress::new(0, 0), extent);
        let cells = LatticeIter::new(bounds, 2, 4);
        assert_eq!(cells.len() as u64, 8 * 8 * 1024);
        assert!(cells.clone().all(|c| bounds.contains(&c)));
        assert_eq!(cells.last().unwrap().y, i32::MAX - 4);
    }

    #[test]
    fn test_exact_size() {
        let cells = LatticeIter::dense(bounds(4));
        assert_eq!(cells.len(), 16 * 16 * 4);
    }
}
