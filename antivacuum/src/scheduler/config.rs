//! Scheduler configuration and progress events.

use std::time::Duration;

use crate::coord::{RegionAddress, WorldExtent};
use crate::pattern::AccessPattern;
use crate::probe::DEFAULT_PROBE_TIMEOUT;

/// Default pause between aggressive passes on the center region.
///
/// Gives the source time to finish materialization started by the previous
/// pass before the next pattern runs.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Default number of probes in flight within a pass.
///
/// At 1 the pattern order is preserved exactly.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 1;

/// Default number of re-polls for a region reported as pending.
pub const DEFAULT_RESOLVE_RETRIES: u32 = 3;

/// Default initial backoff between pending re-polls (doubles each retry).
pub const DEFAULT_RESOLVE_BACKOFF: Duration = Duration::from_millis(25);

/// Configuration for [`WarmScheduler`](super::WarmScheduler).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Vertical extent of every region.
    pub extent: WorldExtent,
    /// Pause between aggressive passes on the center region.
    pub settle_delay: Duration,
    /// Probes in flight within one pass.
    pub probe_concurrency: usize,
    /// Upper bound on a single source read.
    pub probe_timeout: Duration,
    /// Re-polls of a pending region before giving up.
    pub resolve_retries: u32,
    /// Initial backoff between re-polls.
    pub resolve_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            extent: WorldExtent::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            resolve_retries: DEFAULT_RESOLVE_RETRIES,
            resolve_backoff: DEFAULT_RESOLVE_BACKOFF,
        }
    }
}

impl SchedulerConfig {
    pub fn with_extent(mut self, extent: WorldExtent) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the probe window. Values below 1 are raised to 1.
    pub fn with_probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = concurrency.max(1);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_resolve_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.resolve_retries = retries;
        self.resolve_backoff = backoff;
        self
    }
}

/// Progress events emitted while a warm runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmProgress {
    /// A pass is about to probe `expected_probes` cells.
    PassStarted {
        region: RegionAddress,
        pattern: AccessPattern,
        pass: usize,
        expected_probes: u64,
    },
    /// A pass finished.
    PassCompleted {
        region: RegionAddress,
        pattern: AccessPattern,
        pass: usize,
        processed: u64,
        failed: u64,
    },
    /// Waiting for the source to settle before the next pass.
    Settling {
        region: RegionAddress,
        delay: Duration,
    },
}
