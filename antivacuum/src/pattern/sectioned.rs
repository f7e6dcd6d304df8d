//! Section marker walk with repeated presence probes.

use crate::coord::{CellCoordinate, RegionBounds, REGION_WIDTH};

/// Height of one vertical section, in cells.
pub const SECTION_HEIGHT: i32 = 16;

/// How many times each section marker is probed.
pub const SECTION_REPEAT_PROBES: u32 = 5;

/// Iterator yielding each section's marker cell `SECTION_REPEAT_PROBES` times.
///
/// The marker is the section's center cell. A trailing section shorter than
/// `SECTION_HEIGHT` still gets a marker, clamped into the extent.
#[derive(Debug, Clone)]
pub struct SectionIter {
    bounds: RegionBounds,
    sections: u32,
    section: u32,
    repeat: u32,
}

impl SectionIter {
    pub fn new(bounds: RegionBounds) -> Self {
        Self {
            bounds,
            sections: Self::section_count(bounds),
            section: 0,
            repeat: 0,
        }
    }

    /// Number of sections covering the region's vertical extent.
    pub fn section_count(bounds: RegionBounds) -> u32 {
        bounds.extent.height().div_ceil(SECTION_HEIGHT as u32)
    }

    /// Number of probes the walk emits.
    pub fn len_for(bounds: RegionBounds) -> u64 {
        Self::section_count(bounds) as u64 * SECTION_REPEAT_PROBES as u64
    }

    fn marker(&self, section: u32) -> CellCoordinate {
        let height = self.bounds.extent.height() as i64;
        let local_y = (section as i64 * SECTION_HEIGHT as i64 + (SECTION_HEIGHT / 2) as i64)
            .min(height - 1);
        let center = REGION_WIDTH / 2;
        self.bounds.cell_at(center, local_y as i32, center)
    }
}

impl Iterator for SectionIter {
    type Item = CellCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.section >= self.sections {
            return None;
        }

        let cell = self.marker(self.section);
        self.repeat += 1;
        if self.repeat >= SECTION_REPEAT_PROBES {
            self.repeat = 0;
            self.section += 1;
        }
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.sections - self.section) as usize * SECTION_REPEAT_PROBES as usize
            - self.repeat as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SectionIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{RegionAddress, WorldExtent, MAX_WORLD_HEIGHT};

    #[test]
    fn test_default_world_has_24_sections() {
        let bounds = RegionBounds::new(RegionAddress::new(0, 0), WorldExtent::default());
        assert_eq!(SectionIter::section_count(bounds), 24);
        assert_eq!(SectionIter::new(bounds).count(), 120);
    }

    #[test]
    fn test_markers_repeat_then_advance() {
        let bounds = RegionBounds::new(RegionAddress::new(1, 0), WorldExtent::new(0, 32).unwrap());
        let cells: Vec<_> = SectionIter::new(bounds).collect();
        assert_eq!(cells.len(), 10);
        assert!(cells[..5].iter().all(|c| *c == CellCoordinate::new(24, 8, 8)));
        assert!(cells[5..].iter().all(|c| *c == CellCoordinate::new(24, 24, 8)));
    }

    #[test]
    fn test_partial_section_marker_clamped() {
        let bounds = RegionBounds::new(RegionAddress::new(0, 0), WorldExtent::new(0, 20).unwrap());
        let cells: Vec<_> = SectionIter::new(bounds).collect();
        assert_eq!(cells.len(), 10);
        assert!(cells.iter().all(|c| bounds.contains(c)));
        assert_eq!(cells[9].y, 19);
    }

    #[test]
    fn test_tallest_extent_markers_stay_inside() {
        let extent = WorldExtent::new(i32::MIN, i32::MIN + MAX_WORLD_HEIGHT as i32).unwrap();
        let bounds = RegionBounds::new(RegionAddress::new(0, 0), extent);
        let cells: Vec<_> = SectionIter::new(bounds).collect();
        assert_eq!(cells.len(), 256 * 5);
        assert!(cells.iter().all(|c| bounds.contains(c)));
        assert_eq!(cells[0].y, i32::MIN + 8);
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let bounds = RegionBounds::new(RegionAddress::new(0, 0), WorldExtent::new(0, 16).unwrap());
        let mut cells = SectionIter::new(bounds);
        assert_eq!(cells.len(), 5);
        cells.next();
        assert_eq!(cells.len(), 4);
    }
}
