//! Remote cell source abstraction.
//!
//! The `CellSource` trait is the only view the warmer has of the host's
//! world. It is a capability, not a data structure: the host's object graph
//! (world, region, cell, ancillary records) stays behind it, and every read
//! may have the side effect of materializing data that was only lazily
//! represented before.
//!
//! # Dyn Compatibility
//!
//! Async methods return `BoxFuture` so sources can be shared as
//! `Arc<dyn CellSource>` across warm tasks.

mod simulated;

pub use simulated::SimulatedSource;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::coord::{CellCoordinate, RegionAddress};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Snapshot of one cell as reported by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellState {
    /// The source has no resident data for the cell.
    Unloaded,
    /// Resident and intentionally void.
    Empty,
    /// Resident with content. `ancillary` marks an associated record that is
    /// materialized separately from the primary state.
    Occupied { ancillary: bool },
}

impl CellState {
    /// Whether the read counts as processed. Only the `Unloaded` sentinel does not.
    #[inline]
    pub fn is_processed(&self) -> bool {
        !matches!(self, CellState::Unloaded)
    }

    /// Whether an ancillary read should follow this state.
    #[inline]
    pub fn wants_ancillary(&self) -> bool {
        matches!(
            self,
            CellState::Empty | CellState::Occupied { ancillary: true }
        )
    }
}

/// Opaque handle to an ancillary record attached to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AncillaryRef(pub u64);

/// Whether a region can be read at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionStatus {
    /// Region can be probed.
    Ready,
    /// Region is being prepared by the source; asking again later may succeed.
    Pending,
    /// Region cannot be joined. Retrying is pointless.
    NotJoinable,
}

/// Errors raised by a source for a single read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source could not serve the read right now.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The source returned data that could not be interpreted.
    #[error("Invalid cell data at {0}")]
    InvalidData(CellCoordinate),

    /// The read did not complete within the probe timeout.
    #[error("Read timed out after {0}ms")]
    Timeout(u64),

    /// Backend-specific failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Lazily materialized grid of cells owned by the host.
///
/// Implementations must be `Send + Sync`; the source is shared,
/// externally synchronized infrastructure and concurrent warms read it
/// without coordination.
pub trait CellSource: Send + Sync {
    /// Report whether `region` can be probed.
    fn region_status(&self, region: RegionAddress) -> BoxFuture<'_, RegionStatus>;

    /// Read the primary state of one cell, materializing it if needed.
    fn read_state(&self, cell: CellCoordinate) -> BoxFuture<'_, Result<CellState, SourceError>>;

    /// Look up the ancillary record of one cell, materializing it if needed.
    fn read_ancillary(
        &self,
        cell: CellCoordinate,
    ) -> BoxFuture<'_, Result<Option<AncillaryRef>, SourceError>>;
}
