//! Access patterns: which cells a pass probes, and in what order.
//!
//! Each pattern is a pure function of the region bounds. `enumerate` returns a
//! lazy, finite iterator, and calling it again on the same bounds yields the
//! same sequence.
//!
//! ```text
//! Standard    [Dense]
//! Aggressive  [CoarseThenFill, Sectioned, NeighborSparse]
//! ```

mod lattice;
mod sectioned;
mod sparse;

pub use lattice::LatticeIter;
pub use sectioned::{SectionIter, SECTION_HEIGHT, SECTION_REPEAT_PROBES};
pub use sparse::{SparseIter, SPARSE_STRIDE_XZ, SPARSE_STRIDE_Y};

use std::fmt;
use std::iter::Chain;

use crate::coord::{CellCoordinate, RegionBounds};

/// Vertical stride of the coarse lattice in `CoarseThenFill`.
pub const COARSE_STRIDE_Y: i32 = 4;

/// Horizontal stride of the coarse lattice in `CoarseThenFill`.
pub const COARSE_STRIDE_XZ: i32 = 2;

/// Pass sequence for aggressive warming, indexed by pass number.
pub const AGGRESSIVE_PASSES: [AccessPattern; 3] = [
    AccessPattern::CoarseThenFill,
    AccessPattern::Sectioned,
    AccessPattern::NeighborSparse,
];

/// Strategy for one pass over a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPattern {
    /// Every cell, column by column, bottom to top.
    Dense,
    /// A coarse lattice first, then every cell.
    CoarseThenFill,
    /// Repeated presence probes of each vertical section's marker.
    Sectioned,
    /// A sparse lattice, each sample followed by its 6 axis neighbors.
    NeighborSparse,
}

impl AccessPattern {
    /// Enumerate the cells this pattern probes within `bounds`.
    pub fn enumerate(&self, bounds: RegionBounds) -> PatternCells {
        match self {
            AccessPattern::Dense => PatternCells::Dense(LatticeIter::dense(bounds)),
            AccessPattern::CoarseThenFill => PatternCells::CoarseThenFill(
                LatticeIter::new(bounds, COARSE_STRIDE_XZ, COARSE_STRIDE_Y)
                    .chain(LatticeIter::dense(bounds)),
            ),
            AccessPattern::Sectioned => PatternCells::Sectioned(SectionIter::new(bounds)),
            AccessPattern::NeighborSparse => PatternCells::NeighborSparse(SparseIter::new(bounds)),
        }
    }

    /// Exact number of probes `enumerate` yields for `bounds`.
    pub fn expected_len(&self, bounds: RegionBounds) -> u64 {
        match self {
            AccessPattern::Dense => bounds.cell_count(),
            AccessPattern::CoarseThenFill => {
                LatticeIter::len_for(bounds, COARSE_STRIDE_XZ, COARSE_STRIDE_Y)
                    + bounds.cell_count()
            }
            AccessPattern::Sectioned => SectionIter::len_for(bounds),
            AccessPattern::NeighborSparse => SparseIter::len_for(bounds),
        }
    }

    /// Whether cells read by this pattern get an ancillary follow-up probe.
    pub fn probes_ancillary(&self) -> bool {
        matches!(self, AccessPattern::Dense | AccessPattern::CoarseThenFill)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccessPattern::Dense => "dense",
            AccessPattern::CoarseThenFill => "coarse-then-fill",
            AccessPattern::Sectioned => "sectioned",
            AccessPattern::NeighborSparse => "neighbor-sparse",
        }
    }
}

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cell sequence produced by [`AccessPattern::enumerate`].
#[derive(Debug, Clone)]
pub enum PatternCells {
    Dense(LatticeIter),
    CoarseThenFill(Chain<LatticeIter, LatticeIter>),
    Sectioned(SectionIter),
    NeighborSparse(SparseIter),
}

impl Iterator for PatternCells {
    type Item = CellCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            PatternCells::Dense(cells) => cells.next(),
            PatternCells::CoarseThenFill(cells) => cells.next(),
            PatternCells::Sectioned(cells) => cells.next(),
            PatternCells::NeighborSparse(cells) => cells.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            PatternCells::Dense(cells) => cells.size_hint(),
            PatternCells::CoarseThenFill(cells) => cells.size_hint(),
            PatternCells::Sectioned(cells) => cells.size_hint(),
            PatternCells::NeighborSparse(cells) => cells.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::coord::{RegionAddress, WorldExtent};

    fn default_bounds() -> RegionBounds {
        RegionBounds::new(RegionAddress::new(0, 0), WorldExtent::default())
    }

    #[test]
    fn test_dense_covers_region_exactly_once() {
        let bounds = default_bounds();
        let cells: Vec<_> = AccessPattern::Dense.enumerate(bounds).collect();
        let unique: HashSet<_> = cells.iter().copied().collect();

        assert_eq!(cells.len(), 16 * 16 * 384);
        assert_eq!(unique.len(), cells.len());
        assert!(cells.iter().all(|c| bounds.contains(c)));
    }

    #[test]
    fn test_coarse_then_fill_starts_coarse() {
        let bounds = default_bounds();
        let cells: Vec<_> = AccessPattern::CoarseThenFill.enumerate(bounds).take(2).collect();
        assert_eq!(cells[0], CellCoordinate::new(0, -64, 0));
        assert_eq!(cells[1], CellCoordinate::new(0, -60, 0));
    }

    #[test]
    fn test_expected_len_matches_enumeration() {
        let bounds = default_bounds();
        for pattern in [AccessPattern::Dense]
            .iter()
            .chain(AGGRESSIVE_PASSES.iter())
        {
            assert_eq!(
                pattern.enumerate(bounds).count() as u64,
                pattern.expected_len(bounds),
                "{}",
                pattern
            );
        }
    }

    #[test]
    fn test_enumeration_is_restartable() {
        let bounds = RegionBounds::new(RegionAddress::new(-3, 7), WorldExtent::new(0, 40).unwrap());
        for pattern in AGGRESSIVE_PASSES {
            let first: Vec<_> = pattern.enumerate(bounds).collect();
            let second: Vec<_> = pattern.enumerate(bounds).collect();
            assert_eq!(first, second, "{}", pattern);
        }
    }

    #[test]
    fn test_ancillary_patterns() {
        assert!(AccessPattern::Dense.probes_ancillary());
        assert!(AccessPattern::CoarseThenFill.probes_ancillary());
        assert!(!AccessPattern::Sectioned.probes_ancillary());
        assert!(!AccessPattern::NeighborSparse.probes_ancillary());
    }

    fn arb_bounds() -> impl Strategy<Value = RegionBounds> {
        (-1000i32..1000, -1000i32..1000, -100i32..100, 1i32..48).prop_map(
            |(rx, rz, min_y, height)| {
                RegionBounds::new(
                    RegionAddress::new(rx, rz),
                    WorldExtent::new(min_y, min_y + height).unwrap(),
                )
            },
        )
    }

    proptest! {
        #[test]
        fn prop_dense_count_and_coverage(bounds in arb_bounds()) {
            let cells: Vec<_> = AccessPattern::Dense.enumerate(bounds).collect();
            let unique: HashSet<_> = cells.iter().copied().collect();
            prop_assert_eq!(cells.len() as u64, bounds.cell_count());
            prop_assert_eq!(unique.len(), cells.len());
            prop_assert!(cells.iter().all(|c| bounds.contains(c)));
        }

        #[test]
        fn prop_coarse_then_fill_dedups_to_dense(bounds in arb_bounds()) {
            let dense: HashSet<_> = AccessPattern::Dense.enumerate(bounds).collect();
            let coarse: HashSet<_> = AccessPattern::CoarseThenFill.enumerate(bounds).collect();
            prop_assert_eq!(dense, coarse);
        }

        #[test]
        fn prop_sparse_stays_in_extent(bounds in arb_bounds()) {
            prop_assert!(AccessPattern::NeighborSparse
                .enumerate(bounds)
                .all(|c| bounds.extent.contains(c.y)));
        }
    }
}
