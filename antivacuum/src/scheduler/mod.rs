//! Warm scheduler: runs access-pattern passes over regions.
//!
//! # Modes
//!
//! ```text
//! Standard    target ─► Dense
//!
//! Aggressive  target ─► CoarseThenFill ─settle─► Sectioned ─settle─► NeighborSparse
//!             8 neighbors, each ─► CoarseThenFill ─► Sectioned ─► NeighborSparse
//! ```
//!
//! # Failure policy
//!
//! - A region that is not joinable yields a zero-count result, no retries.
//! - A pending region is re-polled with exponential backoff.
//! - A failed probe is counted and skipped; the pass continues.
//! - Cancellation is observed during settle and backoff sleeps (and between
//!   regions) and yields the partial result accumulated so far.
//!
//! Nothing is remembered between invocations: every warm re-probes from scratch.

mod config;
mod pass;
mod result;

pub use config::{
    SchedulerConfig, WarmProgress, DEFAULT_PROBE_CONCURRENCY, DEFAULT_RESOLVE_BACKOFF,
    DEFAULT_RESOLVE_RETRIES, DEFAULT_SETTLE_DELAY,
};
pub use result::{ParseWarmModeError, WarmCounts, WarmMode, WarmOutcome, WarmResult};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::{RegionAddress, RegionBounds};
use crate::neighbor;
use crate::pattern::{AccessPattern, AGGRESSIVE_PASSES};
use crate::probe::CellProbe;
use crate::source::{BoxFuture, CellSource, RegionStatus};

use pass::PassRunner;

/// Anything that can warm a region.
///
/// The event gate depends on this trait rather than on `WarmScheduler`
/// directly, so it can be driven by test doubles.
pub trait RegionWarmer: Send + Sync {
    /// Warm `region` in `mode`. Never fails; see [`WarmOutcome`].
    fn warm(
        &self,
        region: RegionAddress,
        mode: WarmMode,
        cancellation: CancellationToken,
    ) -> BoxFuture<'_, WarmResult>;
}

/// Result of resolving a region before probing it.
enum Resolution {
    Ready,
    Unavailable,
    Cancelled,
}

/// Marker for a pass sequence interrupted by cancellation.
struct Interrupted;

/// Runs warm passes against a shared cell source.
pub struct WarmScheduler {
    source: Arc<dyn CellSource>,
    probe: CellProbe,
    config: SchedulerConfig,
    progress_tx: Option<mpsc::Sender<WarmProgress>>,
}

impl WarmScheduler {
    /// Create a scheduler over `source`.
    pub fn new(source: Arc<dyn CellSource>, config: SchedulerConfig) -> Self {
        let probe = CellProbe::with_timeout(source.clone(), config.extent, config.probe_timeout);
        Self {
            source,
            probe,
            config,
            progress_tx: None,
        }
    }

    /// Report progress on `progress_tx`. Sends never block the warm; events
    /// are dropped when the channel is full.
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<WarmProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Warm `region` in `mode`.
    ///
    /// # Arguments
    ///
    /// * `region` - Target region
    /// * `mode` - Standard (one dense pass) or Aggressive (three passes over
    ///   the target and its neighbors)
    /// * `cancellation` - Token observed at settle and backoff points
    ///
    /// # Returns
    ///
    /// The counts accumulated, with an outcome describing how the warm ended.
    pub async fn run(
        &self,
        region: RegionAddress,
        mode: WarmMode,
        cancellation: CancellationToken,
    ) -> WarmResult {
        let started = Instant::now();
        let mut counts = WarmCounts::default();

        info!(region = %region, mode = %mode, "Starting warm");

        match self.resolve(region, &cancellation).await {
            Resolution::Ready => {}
            Resolution::Unavailable => {
                warn!(region = %region, mode = %mode, "Region unavailable, nothing warmed");
                return WarmResult::unavailable(region, mode, started.elapsed());
            }
            Resolution::Cancelled => {
                return self.finish(region, mode, WarmOutcome::Cancelled, counts, started);
            }
        }

        let outcome = match mode {
            WarmMode::Standard => {
                self.run_pass(region, AccessPattern::Dense, 0, &mut counts).await;
                counts.regions_warmed += 1;
                WarmOutcome::Completed
            }
            WarmMode::Aggressive => {
                match self.warm_aggressive(region, &mut counts, &cancellation).await {
                    Ok(()) => WarmOutcome::Completed,
                    Err(Interrupted) => WarmOutcome::Cancelled,
                }
            }
        };

        self.finish(region, mode, outcome, counts, started)
    }

    async fn warm_aggressive(
        &self,
        center: RegionAddress,
        counts: &mut WarmCounts,
        cancellation: &CancellationToken,
    ) -> Result<(), Interrupted> {
        self.run_pass_sequence(center, true, counts, cancellation).await?;

        for neighbor in neighbor::expand(center) {
            if cancellation.is_cancelled() {
                return Err(Interrupted);
            }
            match self.resolve(neighbor, cancellation).await {
                Resolution::Ready => {
                    self.run_pass_sequence(neighbor, false, counts, cancellation)
                        .await?;
                }
                Resolution::Unavailable => {
                    warn!(center = %center, neighbor = %neighbor, "Neighbor unavailable, skipping");
                }
                Resolution::Cancelled => return Err(Interrupted),
            }
        }

        Ok(())
    }

    /// Run the aggressive passes over one region, settling between passes
    /// when `settle` is set.
    async fn run_pass_sequence(
        &self,
        region: RegionAddress,
        settle: bool,
        counts: &mut WarmCounts,
        cancellation: &CancellationToken,
    ) -> Result<(), Interrupted> {
        for (pass, pattern) in AGGRESSIVE_PASSES.iter().enumerate() {
            if pass > 0 && settle && !self.settle(region, cancellation).await {
                debug!(region = %region, pass, "Cancelled while settling");
                return Err(Interrupted);
            }
            self.run_pass(region, *pattern, pass, counts).await;
        }
        counts.regions_warmed += 1;
        Ok(())
    }

    async fn run_pass(
        &self,
        region: RegionAddress,
        pattern: AccessPattern,
        pass: usize,
        counts: &mut WarmCounts,
    ) {
        let bounds = RegionBounds::new(region, self.config.extent);
        self.report(WarmProgress::PassStarted {
            region,
            pattern,
            pass,
            expected_probes: pattern.expected_len(bounds),
        });

        let pass_counts = PassRunner::new(&self.probe, self.config.probe_concurrency)
            .run(bounds, pattern)
            .await;
        counts.add_pass(&pass_counts);

        self.report(WarmProgress::PassCompleted {
            region,
            pattern,
            pass,
            processed: pass_counts.processed,
            failed: pass_counts.failed,
        });
    }

    /// Wait out the settle delay. Returns `false` if cancelled first.
    async fn settle(&self, region: RegionAddress, cancellation: &CancellationToken) -> bool {
        self.report(WarmProgress::Settling {
            region,
            delay: self.config.settle_delay,
        });
        sleep_unless_cancelled(self.config.settle_delay, cancellation).await
    }

    async fn resolve(&self, region: RegionAddress, cancellation: &CancellationToken) -> Resolution {
        let mut backoff = self.config.resolve_backoff;

        for attempt in 0..=self.config.resolve_retries {
            match self.source.region_status(region).await {
                RegionStatus::Ready => return Resolution::Ready,
                RegionStatus::NotJoinable => return Resolution::Unavailable,
                RegionStatus::Pending => {
                    if attempt == self.config.resolve_retries {
                        break;
                    }
                    debug!(
                        region = %region,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "Region pending, retrying"
                    );
                    if !sleep_unless_cancelled(backoff, cancellation).await {
                        return Resolution::Cancelled;
                    }
                    backoff = backoff.saturating_mul(2);
                }
            }
        }

        debug!(
            region = %region,
            retries = self.config.resolve_retries,
            "Region still pending after retries"
        );
        Resolution::Unavailable
    }

    fn finish(
        &self,
        region: RegionAddress,
        mode: WarmMode,
        outcome: WarmOutcome,
        counts: WarmCounts,
        started: Instant,
    ) -> WarmResult {
        let result = WarmResult::new(region, mode, outcome, counts, started.elapsed());
        info!(
            region = %region,
            mode = %mode,
            outcome = ?outcome,
            processed = counts.processed,
            failed = counts.failed,
            ancillary = counts.ancillary_probes,
            passes = counts.passes_run,
            regions = counts.regions_warmed,
            elapsed_ms = result.elapsed().as_millis() as u64,
            "Warm finished"
        );
        result
    }

    fn report(&self, progress: WarmProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.try_send(progress);
        }
    }
}

impl RegionWarmer for WarmScheduler {
    fn warm(
        &self,
        region: RegionAddress,
        mode: WarmMode,
        cancellation: CancellationToken,
    ) -> BoxFuture<'_, WarmResult> {
        Box::pin(self.run(region, mode, cancellation))
    }
}

/// Sleep for `delay`. Returns `false` if `cancellation` fires first.
async fn sleep_unless_cancelled(delay: Duration, cancellation: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
