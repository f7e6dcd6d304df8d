//! Region and cell coordinate module
//!
//! Provides the addressing model for the warmer: 16×16 cell regions laid out
//! on a 2-D grid, each spanning the world's vertical extent, and the world
//! cell coordinates derived from them.

mod types;

pub use types::{
    CellCoordinate, CoordError, RegionAddress, RegionBounds, WorldExtent, DEFAULT_MAX_Y,
    DEFAULT_MIN_Y, MAX_WORLD_HEIGHT, REGION_SHIFT, REGION_WIDTH,
};

/// Converts a world position (as reported by a session) to the cell it lies in.
///
/// Components are floored, so `-0.5` lands in cell `-1`.
///
/// # Arguments
///
/// * `x`, `y`, `z` - World position in cell units
///
/// # Returns
///
/// A `Result` containing the cell or an error if a component is not finite
/// or does not fit the cell coordinate range.
#[inline]
pub fn to_cell_coords(x: f64, y: f64, z: f64) -> Result<CellCoordinate, CoordError> {
    Ok(CellCoordinate::new(floor_component(x)?, floor_component(y)?, floor_component(z)?))
}

/// Converts a world position to the region containing it.
#[inline]
pub fn to_region_address(x: f64, y: f64, z: f64) -> Result<RegionAddress, CoordError> {
    to_cell_coords(x, y, z).map(|cell| cell.region())
}

fn floor_component(value: f64) -> Result<i32, CoordError> {
    if !value.is_finite() {
        return Err(CoordError::NonFinite(value));
    }
    let floored = value.floor();
    if floored < i32::MIN as f64 || floored > i32::MAX as f64 {
        return Err(CoordError::OutOfRange(value));
    }
    Ok(floored as i32)
}
