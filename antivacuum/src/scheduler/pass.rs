//! One pass of an access pattern over a region.
//!
//! Probes are issued through a sliding window:
//! 1. Start up to `window` probes
//! 2. As each completes, record it and start the next cell (if any)
//! 3. Finish when the pattern is exhausted and nothing is in flight
//!
//! A window of 1 issues probes strictly in pattern order.

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use crate::coord::{CellCoordinate, RegionBounds};
use crate::pattern::AccessPattern;
use crate::probe::{CellProbe, ProbeReading};

use super::result::WarmCounts;

/// Result of probing one cell.
struct CellOutcome {
    reading: ProbeReading,
    ancillary_probed: bool,
}

/// Runs passes against a probe with a bounded probe window.
pub(crate) struct PassRunner<'a> {
    probe: &'a CellProbe,
    window: usize,
}

impl<'a> PassRunner<'a> {
    pub(crate) fn new(probe: &'a CellProbe, window: usize) -> Self {
        Self {
            probe,
            window: window.max(1),
        }
    }

    /// Probe every cell `pattern` yields for `bounds` and tally the results.
    ///
    /// Per-cell failures are counted, never propagated.
    pub(crate) async fn run(&self, bounds: RegionBounds, pattern: AccessPattern) -> WarmCounts {
        let with_ancillary = pattern.probes_ancillary();
        let mut cells = pattern.enumerate(bounds);
        let mut in_flight = FuturesUnordered::new();
        let mut counts = WarmCounts::default();

        for cell in cells.by_ref().take(self.window) {
            in_flight.push(self.probe_cell(cell, with_ancillary));
        }

        while let Some(outcome) = in_flight.next().await {
            if outcome.reading.is_failure() {
                counts.failed += 1;
            } else if outcome.reading.state.is_processed() {
                counts.processed += 1;
            }
            if outcome.ancillary_probed {
                counts.ancillary_probes += 1;
            }

            if let Some(cell) = cells.next() {
                in_flight.push(self.probe_cell(cell, with_ancillary));
            }
        }

        debug!(
            region = %bounds.region,
            pattern = %pattern,
            processed = counts.processed,
            failed = counts.failed,
            ancillary = counts.ancillary_probes,
            "Pass complete"
        );

        counts
    }

    async fn probe_cell(&self, cell: CellCoordinate, with_ancillary: bool) -> CellOutcome {
        let reading = self.probe.probe(cell).await;
        let ancillary_probed = with_ancillary && reading.state.wants_ancillary();
        if ancillary_probed {
            // The lookup itself forces the record; its value is not needed.
            let _ = self.probe.read_ancillary(cell).await;
        }
        CellOutcome {
            reading,
            ancillary_probed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::coord::{RegionAddress, WorldExtent};
    use crate::source::{CellState, SimulatedSource};

    fn bounds() -> RegionBounds {
        RegionBounds::new(RegionAddress::new(0, 0), WorldExtent::new(0, 8).unwrap())
    }

    #[tokio::test]
    async fn test_dense_pass_counts_every_cell() {
        let source = Arc::new(
            SimulatedSource::new(bounds().extent)
                .with_uniform_state(CellState::Occupied { ancillary: false }),
        );
        let probe = CellProbe::new(source.clone(), bounds().extent);
        let counts = PassRunner::new(&probe, 1).run(bounds(), AccessPattern::Dense).await;

        assert_eq!(counts.processed, 16 * 16 * 8);
        assert_eq!(counts.failed, 0);
        assert_eq!(counts.ancillary_probes, 0);
        assert_eq!(source.reads(), 16 * 16 * 8);
    }

    #[tokio::test]
    async fn test_window_does_not_change_totals() {
        let source = Arc::new(SimulatedSource::new(bounds().extent).with_fail_every(10));
        let probe = CellProbe::new(source.clone(), bounds().extent);
        let counts = PassRunner::new(&probe, 16).run(bounds(), AccessPattern::Dense).await;

        assert_eq!(counts.processed + counts.failed, 16 * 16 * 8);
        assert_eq!(counts.failed, source.failures());
    }

    #[tokio::test]
    async fn test_empty_cells_get_ancillary_probe() {
        let source =
            Arc::new(SimulatedSource::new(bounds().extent).with_uniform_state(CellState::Empty));
        let probe = CellProbe::new(source.clone(), bounds().extent);

        let dense = PassRunner::new(&probe, 1).run(bounds(), AccessPattern::Dense).await;
        assert_eq!(dense.processed, 16 * 16 * 8);
        assert_eq!(dense.ancillary_probes, 16 * 16 * 8);

        let sectioned = PassRunner::new(&probe, 1).run(bounds(), AccessPattern::Sectioned).await;
        assert_eq!(sectioned.ancillary_probes, 0);
    }
}
