//! Event gate: turns host triggers into background warms.
//!
//! The gate sits between the host's input surface and the scheduler:
//!
//! ```text
//! key level ─► EdgeDetector ─┐
//!                            ├─► EventGate::trigger ─► spawn ─► RegionWarmer::warm
//! command ───────────────────┘          │                              │
//!                                       └─ "started"      "completed"/"cancelled"/"error"
//! ```
//!
//! # Rules
//!
//! - A held key fires once per press (rising edge).
//! - The same mode fires at most once per tick; `tick()` starts a new one.
//! - No active session: the trigger is dropped silently.
//! - Command triggers need a privileged session.
//! - Every started warm ends with exactly one terminal message carrying the
//!   invocation id and region, so concurrent warms are never conflated.
//! - At most `max_concurrent_warms` warms run at once; the rest queue.
//! - `end_session()` cancels every in-flight warm of the session.

mod feedback;
mod session;
mod trigger;

pub use feedback::{
    ChannelFeedback, FeedbackKind, FeedbackMessage, FeedbackSink, LogFeedback, MESSAGE_PREFIX,
};
pub use session::{ActorPosition, SessionAccessor, SharedSession};
pub use trigger::{
    EdgeDetector, KeyBinding, Trigger, TriggerKind, DEFAULT_AGGRESSIVE_KEY, DEFAULT_STANDARD_KEY,
};

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::{to_region_address, RegionAddress};
use crate::scheduler::{RegionWarmer, WarmCounts, WarmMode, WarmOutcome, WarmResult};

/// Default limit on warms running at once.
pub const DEFAULT_MAX_CONCURRENT_WARMS: usize = 4;

/// Configuration for [`EventGate`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Warms allowed to run at once. Values below 1 are raised to 1.
    pub max_concurrent_warms: usize,
    /// Key bindings the gate listens for.
    pub bindings: Vec<KeyBinding>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_concurrent_warms: DEFAULT_MAX_CONCURRENT_WARMS,
            bindings: KeyBinding::defaults(),
        }
    }
}

/// Handle to one background warm.
pub struct WarmHandle {
    id: u64,
    region: RegionAddress,
    mode: WarmMode,
    cancellation: CancellationToken,
    task: JoinHandle<WarmResult>,
}

impl WarmHandle {
    /// Invocation id, as carried by this warm's feedback messages.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn region(&self) -> RegionAddress {
        self.region
    }

    pub fn mode(&self) -> WarmMode {
        self.mode
    }

    /// Cancel this warm only.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Token that cancels this warm, for use outside the handle's owner.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the warm to finish. `None` if the task panicked or was aborted.
    pub async fn join(mut self) -> Option<WarmResult> {
        let joined = (&mut self.task).await;
        self.finish(joined)
    }

    /// Wait for the warm, cancelling it once `interrupt` fires.
    ///
    /// A cancelled warm gets `grace` to report its partial result. A warm
    /// still inside a pass after that is aborted without a terminal message,
    /// and `None` is returned.
    pub async fn join_until(
        mut self,
        interrupt: &CancellationToken,
        grace: Duration,
    ) -> Option<WarmResult> {
        tokio::select! {
            biased;
            joined = &mut self.task => return self.finish(joined),
            _ = interrupt.cancelled() => {}
        }

        self.cancellation.cancel();
        let joined = tokio::time::timeout(grace, &mut self.task).await;
        match joined {
            Ok(joined) => self.finish(joined),
            Err(_) => {
                warn!(
                    invocation = self.id,
                    grace_ms = grace.as_millis() as u64,
                    "Warm did not stop after cancellation, aborting"
                );
                self.task.abort();
                None
            }
        }
    }

    fn finish(&self, joined: Result<WarmResult, JoinError>) -> Option<WarmResult> {
        match joined {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(invocation = self.id, error = %e, "Warm task did not finish");
                None
            }
        }
    }
}

/// Binding with its edge state.
struct BindingState {
    binding: KeyBinding,
    edge: EdgeDetector,
}

/// Maps host triggers to warms.
pub struct EventGate {
    warmer: Arc<dyn RegionWarmer>,
    session: Arc<dyn SessionAccessor>,
    feedback: Arc<dyn FeedbackSink>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    session_token: Mutex<CancellationToken>,
    bindings: Vec<BindingState>,
    fired_this_tick: HashSet<WarmMode>,
    tick: u64,
    next_invocation: AtomicU64,
}

impl EventGate {
    /// Create a gate.
    ///
    /// # Arguments
    ///
    /// * `warmer` - Runs the warms
    /// * `session` - Host session view
    /// * `feedback` - Where notifications go
    /// * `config` - Concurrency limit and key bindings
    /// * `runtime` - Runtime the warms are spawned on
    pub fn new(
        warmer: Arc<dyn RegionWarmer>,
        session: Arc<dyn SessionAccessor>,
        feedback: Arc<dyn FeedbackSink>,
        config: GateConfig,
        runtime: Handle,
    ) -> Self {
        let bindings = config
            .bindings
            .into_iter()
            .map(|binding| BindingState {
                binding,
                edge: EdgeDetector::new(),
            })
            .collect();

        Self {
            warmer,
            session,
            feedback,
            runtime,
            permits: Arc::new(Semaphore::new(config.max_concurrent_warms.max(1))),
            session_token: Mutex::new(CancellationToken::new()),
            bindings,
            fired_this_tick: HashSet::new(),
            tick: 0,
            next_invocation: AtomicU64::new(1),
        }
    }

    /// Bindings the gate listens for.
    pub fn bindings(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.iter().map(|state| &state.binding)
    }

    /// Current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Start a new tick, clearing per-tick de-duplication.
    pub fn tick(&mut self) {
        self.tick += 1;
        self.fired_this_tick.clear();
    }

    /// Feed the level of `key` for this tick.
    ///
    /// Fires the bound warm on the press edge only. Unknown keys are ignored.
    pub fn update_key(&mut self, key: &str, pressed: bool) -> Option<WarmHandle> {
        let state = self.bindings.iter_mut().find(|s| s.binding.matches(key))?;
        if !state.edge.update(pressed) {
            return None;
        }
        let mode = state.binding.mode;
        self.trigger(Trigger::key(mode))
    }

    /// Handle one discrete trigger.
    ///
    /// Returns a handle when a warm was started.
    pub fn trigger(&mut self, trigger: Trigger) -> Option<WarmHandle> {
        if !self.session.is_active() {
            debug!(kind = ?trigger.kind, mode = %trigger.mode, "No active session, trigger ignored");
            return None;
        }

        if !self.fired_this_tick.insert(trigger.mode) {
            debug!(tick = self.tick, mode = %trigger.mode, "Duplicate trigger within tick ignored");
            return None;
        }

        if trigger.kind == TriggerKind::Command && !self.session.is_privileged() {
            info!(mode = %trigger.mode, "Command trigger without privilege rejected");
            self.feedback.deliver(FeedbackMessage::error(
                0,
                trigger.region,
                "insufficient permission to warm regions",
            ));
            return None;
        }

        let region = match trigger.region.map(Ok).or_else(|| self.actor_region()) {
            Some(Ok(region)) => region,
            Some(Err(reason)) => {
                warn!(reason = %reason, "Could not resolve actor region");
                self.feedback.deliver(FeedbackMessage::error(0, None, reason));
                return None;
            }
            // Session ended between the checks.
            None => return None,
        };

        Some(self.spawn_warm(region, trigger.mode))
    }

    /// Cancel every warm of the current session and arm a fresh session.
    ///
    /// Cancelled warms still report their partial counts.
    pub fn end_session(&self) {
        let mut token = self.session_token.lock();
        token.cancel();
        *token = CancellationToken::new();
        info!("Session ended, in-flight warms cancelled");
    }

    fn actor_region(&self) -> Option<Result<RegionAddress, String>> {
        let position = self.session.actor_position()?;
        Some(
            to_region_address(position.x, position.y, position.z)
                .map_err(|e| format!("invalid actor position: {}", e)),
        )
    }

    fn spawn_warm(&self, region: RegionAddress, mode: WarmMode) -> WarmHandle {
        let id = self.next_invocation.fetch_add(1, Ordering::Relaxed);
        let cancellation = self.session_token.lock().child_token();

        info!(invocation = id, region = %region, mode = %mode, "Warm triggered");
        self.feedback.deliver(FeedbackMessage::started(id, region, mode));

        let warmer = Arc::clone(&self.warmer);
        let feedback = Arc::clone(&self.feedback);
        let permits = Arc::clone(&self.permits);
        let token = cancellation.clone();

        let task = self.runtime.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                permit = permits.acquire_owned() => Some(permit),
            };

            let result = match permit {
                Some(permit) => {
                    let result = warmer.warm(region, mode, token).await;
                    drop(permit);
                    result
                }
                None => {
                    debug!(invocation = id, "Warm cancelled while queued");
                    WarmResult::new(
                        region,
                        mode,
                        WarmOutcome::Cancelled,
                        WarmCounts::default(),
                        Duration::ZERO,
                    )
                }
            };

            feedback.deliver(FeedbackMessage::finished(id, &result));
            result
        });

        WarmHandle {
            id,
            region,
            mode,
            cancellation,
            task,
        }
    }
}
