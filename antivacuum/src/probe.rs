//! Single-cell probe against a `CellSource`.
//!
//! A probe never fails: source errors, timeouts and coordinates outside the
//! world's vertical extent all collapse to the `Unloaded` sentinel (or no
//! ancillary record). The failure is still reported alongside the state so
//! the scheduler can keep aggregate diagnostics.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::coord::{CellCoordinate, WorldExtent};
use crate::source::{AncillaryRef, CellSource, CellState, SourceError};

/// Default upper bound on a single source read.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one primary read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReading {
    /// State reported by the source, or `Unloaded` when the read failed.
    pub state: CellState,
    /// Why the read failed, if it did.
    pub failure: Option<SourceError>,
}

impl ProbeReading {
    fn ok(state: CellState) -> Self {
        Self {
            state,
            failure: None,
        }
    }

    fn failed(failure: SourceError) -> Self {
        Self {
            state: CellState::Unloaded,
            failure: Some(failure),
        }
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Reads single cells from a shared source.
#[derive(Clone)]
pub struct CellProbe {
    source: Arc<dyn CellSource>,
    extent: WorldExtent,
    timeout: Duration,
}

impl CellProbe {
    /// Create a probe with the default timeout.
    pub fn new(source: Arc<dyn CellSource>, extent: WorldExtent) -> Self {
        Self::with_timeout(source, extent, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn CellSource>, extent: WorldExtent, timeout: Duration) -> Self {
        Self {
            source,
            extent,
            timeout,
        }
    }

    /// Read the primary state of `cell`.
    pub async fn read(&self, cell: CellCoordinate) -> CellState {
        self.probe(cell).await.state
    }

    /// Read the primary state of `cell`, keeping the failure reason.
    pub async fn probe(&self, cell: CellCoordinate) -> ProbeReading {
        if !self.extent.contains(cell.y) {
            return ProbeReading::ok(CellState::Unloaded);
        }

        match tokio::time::timeout(self.timeout, self.source.read_state(cell)).await {
            Ok(Ok(state)) => ProbeReading::ok(state),
            Ok(Err(e)) => {
                trace!(cell = %cell, error = %e, "Probe failed");
                ProbeReading::failed(e)
            }
            Err(_) => {
                trace!(cell = %cell, timeout_ms = self.timeout_ms(), "Probe timed out");
                ProbeReading::failed(SourceError::Timeout(self.timeout_ms()))
            }
        }
    }

    /// Look up the ancillary record of `cell`.
    pub async fn read_ancillary(&self, cell: CellCoordinate) -> Option<AncillaryRef> {
        if !self.extent.contains(cell.y) {
            return None;
        }

        match tokio::time::timeout(self.timeout, self.source.read_ancillary(cell)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                trace!(cell = %cell, error = %e, "Ancillary probe failed");
                None
            }
            Err(_) => {
                trace!(cell = %cell, "Ancillary probe timed out");
                None
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis().min(u64::MAX as u128) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SimulatedSource;

    fn probe_over(source: SimulatedSource) -> CellProbe {
        CellProbe::new(Arc::new(source), WorldExtent::default())
    }

    #[tokio::test]
    async fn test_read_in_range() {
        let probe = probe_over(SimulatedSource::new(WorldExtent::default()));
        assert_eq!(
            probe.read(CellCoordinate::new(3, 0, 3)).await,
            CellState::Occupied { ancillary: false }
        );
    }

    #[tokio::test]
    async fn test_out_of_range_is_unloaded_without_touching_source() {
        let source = Arc::new(SimulatedSource::new(WorldExtent::default()));
        let probe = CellProbe::new(source.clone(), WorldExtent::default());

        assert_eq!(probe.read(CellCoordinate::new(0, -65, 0)).await, CellState::Unloaded);
        assert_eq!(probe.read(CellCoordinate::new(0, 320, 0)).await, CellState::Unloaded);
        assert!(probe.read_ancillary(CellCoordinate::new(0, 400, 0)).await.is_none());
        assert_eq!(source.reads(), 0);
        assert_eq!(source.ancillary_reads(), 0);
    }

    #[tokio::test]
    async fn test_source_error_becomes_unloaded() {
        let probe = probe_over(SimulatedSource::new(WorldExtent::default()).with_fail_every(1));
        let reading = probe.probe(CellCoordinate::new(0, 0, 0)).await;
        assert_eq!(reading.state, CellState::Unloaded);
        assert!(reading.is_failure());
    }

    #[tokio::test]
    async fn test_timeout_becomes_unloaded() {
        let source = SimulatedSource::new(WorldExtent::default())
            .with_latency(Duration::from_millis(200));
        let probe = CellProbe::with_timeout(
            Arc::new(source),
            WorldExtent::default(),
            Duration::from_millis(5),
        );
        let reading = probe.probe(CellCoordinate::new(0, 0, 0)).await;
        assert_eq!(reading.state, CellState::Unloaded);
        assert_eq!(reading.failure, Some(SourceError::Timeout(5)));
    }
}
