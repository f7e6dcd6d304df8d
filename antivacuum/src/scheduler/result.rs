//! Warm modes, counts and results.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::coord::RegionAddress;

/// How hard to warm a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarmMode {
    /// One dense pass over the target region.
    Standard,
    /// Three passes over the target region and each of its 8 neighbors.
    Aggressive,
}

impl WarmMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarmMode::Standard => "standard",
            WarmMode::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for WarmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a warm mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown warm mode '{0}' (expected 'standard' or 'aggressive')")]
pub struct ParseWarmModeError(pub String);

impl FromStr for WarmMode {
    type Err = ParseWarmModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(WarmMode::Standard),
            "aggressive" => Ok(WarmMode::Aggressive),
            _ => Err(ParseWarmModeError(s.to_string())),
        }
    }
}

/// How a warm ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmOutcome {
    /// Every pass ran.
    Completed,
    /// Cancellation was observed; counts are partial.
    Cancelled,
    /// The target region could not be joined; counts are zero.
    RegionUnavailable,
}

/// Running counts of a warm.
///
/// Duplicate probes of the same cell across passes are counted each time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmCounts {
    /// Reads that returned anything other than `Unloaded`.
    pub processed: u64,
    /// Reads that failed at the source or timed out.
    pub failed: u64,
    /// Ancillary follow-up reads issued.
    pub ancillary_probes: u64,
    /// Passes that ran to completion.
    pub passes_run: u32,
    /// Regions whose pass sequence ran to completion.
    pub regions_warmed: u32,
}

impl WarmCounts {
    /// Fold the counts of one pass into the running total.
    pub fn add_pass(&mut self, pass: &WarmCounts) {
        self.processed += pass.processed;
        self.failed += pass.failed;
        self.ancillary_probes += pass.ancillary_probes;
        self.passes_run += 1;
    }
}

/// Final report of one warm invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmResult {
    region: RegionAddress,
    mode: WarmMode,
    outcome: WarmOutcome,
    counts: WarmCounts,
    elapsed: Duration,
}

impl WarmResult {
    pub fn new(
        region: RegionAddress,
        mode: WarmMode,
        outcome: WarmOutcome,
        counts: WarmCounts,
        elapsed: Duration,
    ) -> Self {
        Self {
            region,
            mode,
            outcome,
            counts,
            elapsed,
        }
    }

    /// Zero-count result for a region that could not be joined.
    pub fn unavailable(region: RegionAddress, mode: WarmMode, elapsed: Duration) -> Self {
        Self::new(
            region,
            mode,
            WarmOutcome::RegionUnavailable,
            WarmCounts::default(),
            elapsed,
        )
    }

    pub fn region(&self) -> RegionAddress {
        self.region
    }

    pub fn mode(&self) -> WarmMode {
        self.mode
    }

    pub fn outcome(&self) -> WarmOutcome {
        self.outcome
    }

    pub fn counts(&self) -> &WarmCounts {
        &self.counts
    }

    pub fn processed(&self) -> u64 {
        self.counts.processed
    }

    pub fn failed(&self) -> u64 {
        self.counts.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == WarmOutcome::Cancelled
    }
}

impl fmt::Display for WarmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} warm of region {}: {:?}, {} processed, {} failed, {} passes in {}ms",
            self.mode,
            self.region,
            self.outcome,
            self.counts.processed,
            self.counts.failed,
            self.counts.passes_run,
            self.elapsed.as_millis()
        )
    }
}
