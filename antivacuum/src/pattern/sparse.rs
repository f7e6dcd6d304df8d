//! Sparse lattice walk that also touches each sample's axis neighbors.

use crate::coord::{CellCoordinate, RegionBounds};

use super::lattice::LatticeIter;

/// Vertical stride of the sparse lattice.
pub const SPARSE_STRIDE_Y: i32 = 8;

/// Horizontal stride of the sparse lattice.
pub const SPARSE_STRIDE_XZ: i32 = 4;

/// Offsets of the 6 axis-adjacent neighbors, in emission order.
const AXIS_NEIGHBORS: [(i32, i32, i32); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

/// Iterator yielding each sparse sample followed by its axis neighbors.
///
/// Neighbors outside the vertical extent are skipped. Horizontal neighbors
/// on the region edge fall into the adjacent region and are kept.
#[derive(Debug, Clone)]
pub struct SparseIter {
    bounds: RegionBounds,
    samples: LatticeIter,
    sample: Option<CellCoordinate>,
    neighbor: usize,
}

impl SparseIter {
    pub fn new(bounds: RegionBounds) -> Self {
        Self {
            bounds,
            samples: LatticeIter::new(bounds, SPARSE_STRIDE_XZ, SPARSE_STRIDE_Y),
            sample: None,
            neighbor: 0,
        }
    }

    /// Number of probes the walk emits.
    pub fn len_for(bounds: RegionBounds) -> u64 {
        let samples = LatticeIter::len_for(bounds, SPARSE_STRIDE_XZ, SPARSE_STRIDE_Y);
        let columns = LatticeIter::len_for(bounds, SPARSE_STRIDE_XZ, i32::MAX);
        // Bottom samples always lose the neighbor below; the top layer loses
        // the one above when it sits on the last cell layer.
        let top_clipped = (bounds.extent.height() - 1) % SPARSE_STRIDE_Y as u32 == 0;
        samples * 7 - columns - if top_clipped { columns } else { 0 }
    }
}

impl Iterator for SparseIter {
    type Item = CellCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.sample {
                None => {
                    let sample = self.samples.next()?;
                    self.sample = Some(sample);
                    self.neighbor = 0;
                    return Some(sample);
                }
                Some(sample) => {
                    if self.neighbor >= AXIS_NEIGHBORS.len() {
                        self.sample = None;
                        continue;
                    }
                    let (dx, dy, dz) = AXIS_NEIGHBORS[self.neighbor];
                    self.neighbor += 1;
                    let cell = sample.offset(dx, dy, dz);
                    if self.bounds.extent.contains(cell.y) {
                        return Some(cell);
                    }
                }
            }
        }
    }
}
