//! In-process lazy cell source.
//!
//! `SimulatedSource` stands in for a host world. It produces deterministic
//! terrain (occupied below a surface layer, void above), materializes a
//! region the first time any of its cells is read, and can be configured to
//! misbehave: per-read latency, periodic read failures, regions that never
//! join, and regions that report `Pending` for a number of polls.
//!
//! All state is interior (`dashmap` + atomics) so one source can be shared by
//! concurrent warms through `Arc<dyn CellSource>`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::{DashMap, DashSet};

use crate::coord::{CellCoordinate, RegionAddress, WorldExtent};

use super::{AncillaryRef, BoxFuture, CellSource, CellState, RegionStatus, SourceError};

/// Default surface layer: cells below are occupied, cells at or above are void.
pub const DEFAULT_SURFACE_Y: i32 = 64;

/// Default spacing of cells that carry an ancillary record.
pub const DEFAULT_ANCILLARY_SPACING: i32 = 7;

/// Simulated lazy source with deterministic terrain.
pub struct SimulatedSource {
    extent: WorldExtent,
    surface_y: i32,
    ancillary_spacing: i32,
    uniform: Option<CellState>,
    latency: Option<Duration>,
    fail_every: Option<u64>,
    unjoinable: DashSet<RegionAddress>,
    pending_polls: DashMap<RegionAddress, u32>,
    materialized: DashSet<RegionAddress>,
    reads: AtomicU64,
    ancillary_reads: AtomicU64,
    failures: AtomicU64,
}

impl SimulatedSource {
    /// Create a source over the given world extent with default terrain.
    pub fn new(extent: WorldExtent) -> Self {
        Self {
            extent,
            surface_y: DEFAULT_SURFACE_Y,
            ancillary_spacing: DEFAULT_ANCILLARY_SPACING,
            uniform: None,
            latency: None,
            fail_every: None,
            unjoinable: DashSet::new(),
            pending_polls: DashMap::new(),
            materialized: DashSet::new(),
            reads: AtomicU64::new(0),
            ancillary_reads: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Report `state` for every in-range cell instead of generated terrain.
    pub fn with_uniform_state(mut self, state: CellState) -> Self {
        self.uniform = Some(state);
        self
    }

    /// Set the surface layer of the generated terrain.
    pub fn with_surface_y(mut self, surface_y: i32) -> Self {
        self.surface_y = surface_y;
        self
    }

    /// Delay every read by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every `n`th primary read (1-based). `0` disables failures.
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Make `region` permanently unjoinable.
    pub fn with_unjoinable(self, region: RegionAddress) -> Self {
        self.unjoinable.insert(region);
        self
    }

    /// Report `Pending` for the first `polls` status checks of `region`.
    pub fn with_pending(self, region: RegionAddress, polls: u32) -> Self {
        self.pending_polls.insert(region, polls);
        self
    }

    /// Total primary reads served, including failed ones.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total ancillary lookups served.
    pub fn ancillary_reads(&self) -> u64 {
        self.ancillary_reads.load(Ordering::Relaxed)
    }

    /// Total reads that returned an error.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Whether any cell of `region` has been read.
    pub fn is_materialized(&self, region: RegionAddress) -> bool {
        self.materialized.contains(&region)
    }

    /// Number of regions materialized so far.
    pub fn materialized_regions(&self) -> usize {
        self.materialized.len()
    }

    fn terrain_at(&self, cell: CellCoordinate) -> CellState {
        if let Some(state) = self.uniform {
            return state;
        }
        if cell.y >= self.surface_y {
            return CellState::Empty;
        }
        let spacing = self.ancillary_spacing.max(1);
        let ancillary = cell.x.rem_euclid(spacing) == 0
            && cell.z.rem_euclid(spacing) == 0
            && cell.y.rem_euclid(spacing) == 0;
        CellState::Occupied { ancillary }
    }

    fn ancillary_id(cell: CellCoordinate) -> u64 {
        let x = cell.x as u32 as u64;
        let z = cell.z as u32 as u64;
        let y = (cell.y as u16) as u64;
        (x << 32 | z) ^ (y << 48)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl CellSource for SimulatedSource {
    fn region_status(&self, region: RegionAddress) -> BoxFuture<'_, RegionStatus> {
        Box::pin(async move {
            if self.unjoinable.contains(&region) {
                return RegionStatus::NotJoinable;
            }
            if let Some(mut remaining) = self.pending_polls.get_mut(&region) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return RegionStatus::Pending;
                }
            }
            RegionStatus::Ready
        })
    }

    fn read_state(&self, cell: CellCoordinate) -> BoxFuture<'_, Result<CellState, SourceError>> {
        Box::pin(async move {
            self.simulate_latency().await;
            let n = self.reads.fetch_add(1, Ordering::Relaxed) + 1;

            if let Some(every) = self.fail_every {
                if n % every == 0 {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    return Err(SourceError::Backend(format!("injected failure on read {}", n)));
                }
            }

            let region = cell.region();
            if self.unjoinable.contains(&region) || !self.extent.contains(cell.y) {
                return Ok(CellState::Unloaded);
            }

            self.materialized.insert(region);
            Ok(self.terrain_at(cell))
        })
    }

    fn read_ancillary(
        &self,
        cell: CellCoordinate,
    ) -> BoxFuture<'_, Result<Option<AncillaryRef>, SourceError>> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.ancillary_reads.fetch_add(1, Ordering::Relaxed);

            if self.unjoinable.contains(&cell.region()) || !self.extent.contains(cell.y) {
                return Ok(None);
            }
            match self.terrain_at(cell) {
                CellState::Occupied { ancillary: true } => {
                    Ok(Some(AncillaryRef(Self::ancillary_id(cell))))
                }
                _ => Ok(None),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SimulatedSource {
        SimulatedSource::new(WorldExtent::default())
    }

    #[tokio::test]
    async fn test_terrain_layers() {
        let source = source();
        assert_eq!(
            source.read_state(CellCoordinate::new(1, 0, 1)).await,
            Ok(CellState::Occupied { ancillary: false })
        );
        assert_eq!(
            source.read_state(CellCoordinate::new(1, 100, 1)).await,
            Ok(CellState::Empty)
        );
        assert_eq!(
            source.read_state(CellCoordinate::new(0, 0, 0)).await,
            Ok(CellState::Occupied { ancillary: true })
        );
    }

    #[tokio::test]
    async fn test_out_of_range_reads_unloaded() {
        let source = source();
        assert_eq!(
            source.read_state(CellCoordinate::new(0, 320, 0)).await,
            Ok(CellState::Unloaded)
        );
        assert!(!source.is_materialized(RegionAddress::new(0, 0)));
    }

    #[tokio::test]
    async fn test_read_materializes_region() {
        let source = source();
        assert!(!source.is_materialized(RegionAddress::new(-1, 0)));
        source.read_state(CellCoordinate::new(-1, 0, 3)).await.unwrap();
        assert!(source.is_materialized(RegionAddress::new(-1, 0)));
        assert_eq!(source.materialized_regions(), 1);
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_fail_every() {
        let source = source().with_fail_every(3);
        let cell = CellCoordinate::new(0, 0, 0);
        assert!(source.read_state(cell).await.is_ok());
        assert!(source.read_state(cell).await.is_ok());
        assert!(source.read_state(cell).await.is_err());
        assert_eq!(source.failures(), 1);
    }

    #[tokio::test]
    async fn test_pending_then_ready() {
        let region = RegionAddress::new(2, 2);
        let source = source().with_pending(region, 2);
        assert_eq!(source.region_status(region).await, RegionStatus::Pending);
        assert_eq!(source.region_status(region).await, RegionStatus::Pending);
        assert_eq!(source.region_status(region).await, RegionStatus::Ready);
    }

    #[tokio::test]
    async fn test_unjoinable_region() {
        let region = RegionAddress::new(5, 5);
        let source = source().with_unjoinable(region);
        assert_eq!(source.region_status(region).await, RegionStatus::NotJoinable);
        assert_eq!(
            source.read_state(CellCoordinate::new(80, 0, 80)).await,
            Ok(CellState::Unloaded)
        );
    }

    #[tokio::test]
    async fn test_ancillary_lookup() {
        let source = source();
        assert!(source
            .read_ancillary(CellCoordinate::new(0, 0, 0))
            .await
            .unwrap()
            .is_some());
        assert!(source
            .read_ancillary(CellCoordinate::new(1, 0, 0))
            .await
            .unwrap()
            .is_none());
        assert_eq!(source.ancillary_reads(), 2);
    }
}
