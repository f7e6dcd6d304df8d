//! Moore-neighborhood expansion of a region.

use crate::coord::RegionAddress;

/// Grid offsets of the 8 surrounding regions, row by row.
const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// The 8 regions touching `region` by edge or corner, excluding `region`.
///
/// Total over the whole address space: coordinates wrap at the integer limits.
pub fn expand(region: RegionAddress) -> [RegionAddress; 8] {
    MOORE_OFFSETS.map(|(drx, drz)| region.offset(drx, drz))
}
